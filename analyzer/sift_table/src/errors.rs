//! Table failure kinds.

use thiserror::Error;

/// Failure while addressing cells or decoding a serialised table.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TableError {
    #[error("unknown column `{0}`")]
    UnknownColumn(String),

    #[error("column index {index} out of range ({columns} columns)")]
    ColumnOutOfRange { index: usize, columns: usize },

    #[error("row {row} out of range ({rows} rows)")]
    RowOutOfRange { row: usize, rows: usize },

    #[error("expected {expected} values, got {got}")]
    ArityMismatch { expected: usize, got: usize },

    #[error("missing `{0}` section")]
    MissingSection(&'static str),

    #[error("corrupt table data: {0}")]
    Corrupt(String),
}
