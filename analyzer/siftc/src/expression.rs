//! Expression glue: row filters and snippet transformations.
//!
//! Filters run in keyword mode (`count > 100 and comment == 0`) once
//! per row with the row's columns bound as variables; rows whose result
//! is truthy survive. Snippet transformations run in formula mode per
//! line-list row with a `source::` method namespace exposing the active
//! row, and append their result to the snippet table.

use std::sync::Arc;

use parking_lot::RwLock;

use sift_expr::{
    compile, interpret_one, tokenize, LexMode, MethodDescriptor, Runtime,
};
use sift_table::{Table, TableError};
use sift_value::Value;

/// Bind every column of `row` as a variable named after the column.
fn bind_row(runtime: &mut Runtime, table: &Table, row: usize) {
    runtime.clear_variables();
    for (index, column) in table.columns().iter().enumerate() {
        runtime.set_variable(column.name(), table.cell_get(row, index));
    }
}

/// Keep the rows for which the keyword-mode predicate is truthy.
///
/// Compile failures abort the command; evaluation failures are recorded
/// and drop the row.
pub fn filter_table(table: &Table, expression: &str) -> Result<(Table, Vec<String>), String> {
    let tokens = tokenize(expression, LexMode::Keyword).map_err(|error| error.to_string())?;
    let program = compile(&tokens).map_err(|error| error.to_string())?;

    let mut kept = Table::with_options(table.columns().to_vec(), sift_table::TableOptions {
        null_bitmap: true,
        ..sift_table::TableOptions::default()
    });
    let mut messages = Vec::new();
    let mut runtime = Runtime::with_standard_methods();

    for row in 0..table.row_count() {
        bind_row(&mut runtime, table, row);
        match interpret_one(&program, &mut runtime) {
            Ok(value) => {
                if value.as_bool() {
                    push_row(&mut kept, table, row).map_err(|error| error.to_string())?;
                }
            }
            Err(error) => messages.push(format!("row {row}: {error}")),
        }
        for message in runtime.take_errors() {
            messages.push(format!("row {row}: {message}"));
        }
    }
    Ok((kept, messages))
}

fn push_row(target: &mut Table, source: &Table, row: usize) -> Result<(), TableError> {
    let values = source.row_values(row);
    target.row_push(&values)?;
    Ok(())
}

/// Active line-list row exposed to `source::` methods.
#[derive(Debug, Default)]
pub struct SourceRow {
    pub filename: String,
    pub line: String,
    pub row: u64,
    pub column: u64,
    pub pattern: String,
    pub line_count: u64,
}

type SharedSourceRow = RwLock<SourceRow>;

fn source_context(runtime: &Runtime) -> Result<Arc<SharedSourceRow>, String> {
    runtime
        .global::<SharedSourceRow>("source")
        .ok_or_else(|| "source context missing".to_string())
}

fn source_line_m(runtime: &mut Runtime, _args: &[Value]) -> Result<Value, String> {
    Ok(Value::Str(source_context(runtime)?.read().line.clone()))
}

fn source_row_m(runtime: &mut Runtime, _args: &[Value]) -> Result<Value, String> {
    Ok(Value::from(source_context(runtime)?.read().row))
}

fn source_column_m(runtime: &mut Runtime, _args: &[Value]) -> Result<Value, String> {
    Ok(Value::from(source_context(runtime)?.read().column))
}

fn source_filename_m(runtime: &mut Runtime, _args: &[Value]) -> Result<Value, String> {
    Ok(Value::Str(source_context(runtime)?.read().filename.clone()))
}

fn source_pattern_m(runtime: &mut Runtime, _args: &[Value]) -> Result<Value, String> {
    Ok(Value::Str(source_context(runtime)?.read().pattern.clone()))
}

fn source_line_count_m(runtime: &mut Runtime, _args: &[Value]) -> Result<Value, String> {
    Ok(Value::from(source_context(runtime)?.read().line_count))
}

/// `source::` namespace descriptors.
pub fn source_methods() -> Vec<MethodDescriptor> {
    vec![
        MethodDescriptor::with_runtime("line", 0, source_line_m),
        MethodDescriptor::with_runtime("row", 0, source_row_m),
        MethodDescriptor::with_runtime("column", 0, source_column_m),
        MethodDescriptor::with_runtime("filename", 0, source_filename_m),
        MethodDescriptor::with_runtime("pattern", 0, source_pattern_m),
        MethodDescriptor::with_runtime("line_count", 0, source_line_count_m),
    ]
}

/// Evaluate a formula-mode expression once per line-list row, appending
/// each non-null result to the snippet table.
///
/// Statement separators split sub-programs; the last value on the stack
/// is the row's result.
pub fn run_snippet_pass(
    line_list: &Table,
    snippets: &mut Table,
    expression: &str,
) -> Result<Vec<String>, String> {
    let tokens = tokenize(expression, LexMode::Formula).map_err(|error| error.to_string())?;
    let program = compile(&tokens).map_err(|error| error.to_string())?;

    let context: Arc<SharedSourceRow> = Arc::new(RwLock::new(SourceRow::default()));
    let mut runtime = Runtime::with_standard_methods();
    runtime.add_methods("source", source_methods());
    runtime.add_global("source", Arc::clone(&context) as Arc<dyn std::any::Any + Send + Sync>);

    let mut messages = Vec::new();
    let line_count = line_list.row_count() as u64;

    for row in 0..line_list.row_count() {
        {
            let mut active = context.write();
            active.filename = line_list.cell_get(row, "filename").as_string();
            active.line = line_list.cell_get(row, "line").as_string();
            #[allow(clippy::cast_sign_loss, reason = "row numbers are written as u64")]
            {
                active.row = line_list.cell_get(row, "row").as_integer() as u64;
                active.column = line_list.cell_get(row, "column").as_integer() as u64;
            }
            active.pattern = line_list.cell_get(row, "pattern").as_string();
            active.line_count = line_count;
        }
        bind_row(&mut runtime, line_list, row);

        match interpret_one(&program, &mut runtime) {
            Ok(Value::Null) => {}
            Ok(value) => {
                let key = snippets.row_count() as u64 + 1;
                let file_key = line_list.cell_get(row, "file-key");
                let _ = snippets.row_push(&[Value::from(key), file_key, Value::Str(value.as_string())]);
            }
            Err(error) => messages.push(format!("row {row}: {error}")),
        }
        for message in runtime.take_errors() {
            messages.push(format!("row {row}: {message}"));
        }
    }
    Ok(messages)
}
