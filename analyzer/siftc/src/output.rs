//! Result rendering.
//!
//! One table, four flavours: an aligned text table for the terminal,
//! CSV, SQL inserts, and the Visual Studio line format
//! (`file(row,col): pattern: line`) that IDEs turn into clickable
//! locations. The output file extension picks the flavour (`.csv`,
//! `.sql`); everything else renders the aligned table.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use sift_table::{Aggregates, Table};

use crate::options::Options;

/// Aligned text table sized by the longest line in each column.
pub fn render_cli(table: &Table, limit: Option<usize>) -> String {
    let rows = limit.unwrap_or(table.row_count()).min(table.row_count());
    let cell_widths = table.max_text_lengths(..);
    let widths: Vec<usize> = table
        .columns()
        .iter()
        .zip(&cell_widths)
        .map(|(column, cells)| column.name().len().max(*cells))
        .collect();

    let mut out = String::new();
    for (index, column) in table.columns().iter().enumerate() {
        if index > 0 {
            out.push_str("  ");
        }
        let _ = write!(out, "{:<width$}", column.name(), width = widths[index]);
    }
    out.push('\n');
    for (index, width) in widths.iter().enumerate() {
        if index > 0 {
            out.push_str("  ");
        }
        out.push_str(&"-".repeat(*width));
    }
    out.push('\n');

    for row in 0..rows {
        for (index, width) in widths.iter().enumerate() {
            if index > 0 {
                out.push_str("  ");
            }
            let text = table.cell_get(row, index).as_string();
            let text = text.split('\n').next().unwrap_or("");
            if table.columns()[index].ctype().is_numeric() {
                let _ = write!(out, "{text:>width$}");
            } else {
                let _ = write!(out, "{text:<width$}");
            }
        }
        out.push('\n');
    }
    out
}

/// RFC-ish CSV: header row, quoted where needed.
pub fn render_csv(table: &Table, limit: Option<usize>) -> String {
    let rows = limit.unwrap_or(table.row_count()).min(table.row_count());
    let mut out = String::new();
    let header: Vec<String> = table
        .columns()
        .iter()
        .map(|column| csv_field(column.name()))
        .collect();
    out.push_str(&header.join(","));
    out.push('\n');
    for row in 0..rows {
        let fields: Vec<String> = (0..table.column_count())
            .map(|column| csv_field(&table.cell_get(row, column).as_string()))
            .collect();
        out.push_str(&fields.join(","));
        out.push('\n');
    }
    out
}

fn csv_field(text: &str) -> String {
    if text.contains(',') || text.contains('"') || text.contains('\n') {
        format!("\"{}\"", text.replace('"', "\"\""))
    } else {
        text.to_string()
    }
}

/// One INSERT statement per row.
pub fn render_sql(table: &Table, name: &str, limit: Option<usize>) -> String {
    let rows = limit.unwrap_or(table.row_count()).min(table.row_count());
    let columns: Vec<String> = table
        .columns()
        .iter()
        .map(|column| format!("\"{}\"", column.name()))
        .collect();
    let columns = columns.join(", ");

    let mut out = String::new();
    for row in 0..rows {
        let values: Vec<String> = (0..table.column_count())
            .map(|column| {
                let value = table.cell_get(row, column);
                if value.is_null() {
                    "NULL".to_string()
                } else if table.columns()[column].ctype().is_numeric() {
                    value.as_string()
                } else {
                    format!("'{}'", value.as_string().replace('\'', "''"))
                }
            })
            .collect();
        let _ = writeln!(
            out,
            "INSERT INTO {name} ({columns}) VALUES ({});",
            values.join(", ")
        );
    }
    out
}

/// Visual Studio flavour for line lists: `file(row,col): pattern: line`.
pub fn render_vs(table: &Table, limit: Option<usize>) -> String {
    let rows = limit.unwrap_or(table.row_count()).min(table.row_count());
    let mut out = String::new();
    for row in 0..rows {
        let _ = writeln!(
            out,
            "{}({},{}): {}: {}",
            table.cell_get(row, "filename").as_string(),
            table.cell_get(row, "row").as_integer(),
            table.cell_get(row, "column").as_integer(),
            table.cell_get(row, "pattern").as_string(),
            table.cell_get(row, "line").as_string(),
        );
    }
    out
}

/// Render per the options and write to the output file and/or stdout.
pub fn emit(table: &Table, options: &Options) -> Result<(), String> {
    let rendered = if options.visual_studio && table.column_index("row").is_some() {
        render_vs(table, options.max)
    } else {
        match options.output.as_deref().map(format_of) {
            Some(Format::Csv) => render_csv(table, options.max),
            Some(Format::Sql) => render_sql(table, &options.table_name, options.max),
            _ => render_cli(table, options.max),
        }
    };

    match &options.output {
        Some(path) => {
            fs::write(path, &rendered)
                .map_err(|error| format!("cannot write {}: {error}", path.display()))?;
            if options.print {
                print!("{rendered}");
            }
        }
        None => print!("{rendered}"),
    }
    Ok(())
}

enum Format {
    Cli,
    Csv,
    Sql,
}

fn format_of(path: &Path) -> Format {
    match path
        .extension()
        .and_then(|extension| extension.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("csv") => Format::Csv,
        Some("sql") => Format::Sql,
        _ => Format::Cli,
    }
}
