//! Table post-processing between the passes and the output.

use sift_table::{Aggregates, Column, ColumnRef, ColumnType, Table, TableError, TableOptions};
use sift_value::Value;

/// Sort rows by a column: descending for numeric columns (biggest
/// counts first), ascending for text.
pub fn sort_table(table: &Table, column: &str) -> Result<Table, String> {
    let index = table
        .column_index(column)
        .ok_or_else(|| format!("unknown sort column `{column}`"))?;
    let numeric = table.columns()[index].ctype().is_numeric();

    let mut order: Vec<usize> = (0..table.row_count()).collect();
    if numeric {
        order.sort_by(|&a, &b| {
            let left = table.cell_get(a, index).as_double();
            let right = table.cell_get(b, index).as_double();
            right.total_cmp(&left)
        });
    } else {
        order.sort_by_key(|&row| table.cell_get(row, index).as_string());
    }

    let mut sorted = Table::with_options(
        table.columns().to_vec(),
        TableOptions {
            null_bitmap: true,
            ..TableOptions::default()
        },
    );
    for row in order {
        let values = table.row_values(row);
        sorted
            .row_push(&values)
            .map_err(|error| error.to_string())?;
    }
    Ok(sorted)
}

/// Numeric columns that make sense in a sum row (key columns excluded).
fn summable_columns(table: &Table) -> Vec<usize> {
    table
        .columns()
        .iter()
        .enumerate()
        .filter(|(_, column)| {
            column.ctype().is_numeric() && column.name() != "key" && column.name() != "file-key"
        })
        .map(|(index, _)| index)
        .collect()
}

/// Append the terminal sum row over every summable column.
pub fn append_sums(table: &mut Table) -> Result<(), TableError> {
    let selected: Vec<ColumnRef<'static>> = summable_columns(table)
        .into_iter()
        .map(ColumnRef::Index)
        .collect();
    if selected.is_empty() {
        return Ok(());
    }
    table.append_sum_row(&selected)?;
    Ok(())
}

/// Add a `percent` column relating `column` to its total.
pub fn apply_relation(table: &Table, column: &str) -> Result<Table, String> {
    let index = table
        .column_index(column)
        .ok_or_else(|| format!("unknown relation column `{column}`"))?;
    let total = table.sum(index, ..).as_double();

    let mut columns = table.columns().to_vec();
    columns.push(Column::new("percent", ColumnType::F64));
    let mut related = Table::with_options(
        columns,
        TableOptions {
            null_bitmap: true,
            ..TableOptions::default()
        },
    );
    for row in 0..table.row_count() {
        let mut values = table.row_values(row);
        let share = if total == 0.0 {
            0.0
        } else {
            table.cell_get(row, index).as_double() * 100.0 / total
        };
        values.push(Value::Float((share * 100.0).round() / 100.0));
        related
            .row_push(&values)
            .map_err(|error| error.to_string())?;
    }
    Ok(related)
}
