//! The shared analysis document.
//!
//! One document per run: the global tables the per-file workers append
//! into, plus the shared error list. Tables sit behind reader-writer
//! locks — aggregation reads concurrently, row appends serialise. The
//! error list takes an exclusive lock on append.

use parking_lot::{Mutex, RwLock};

use sift_table::{Column, ColumnType, Table, TableOptions};

/// Counter result schema.
pub const COUNT_COLUMNS: &[(&str, ColumnType)] = &[
    ("key", ColumnType::Int64),
    ("filename", ColumnType::RStr),
    ("count", ColumnType::Int64),
    ("code", ColumnType::Int64),
    ("characters", ColumnType::Int64),
    ("comment", ColumnType::Int64),
    ("string", ColumnType::Int64),
];

/// Shared tables and error list for one run.
pub struct Document {
    /// File registry: key, filename.
    pub files: RwLock<Table>,
    /// Per-file line statistics (plus one column per counted pattern).
    pub counts: RwLock<Table>,
    /// Pattern match rows.
    pub line_list: RwLock<Table>,
    /// Snippet rows synthesised by transformation expressions.
    pub snippets: RwLock<Table>,
    /// Per-file failures; the run continues past them.
    pub errors: Mutex<Vec<String>>,
}

impl Document {
    /// Build a document; `pattern_columns` appends one count column per
    /// pattern to the counter table.
    pub fn new(pattern_columns: &[String]) -> Self {
        let mut count_columns: Vec<Column> = COUNT_COLUMNS
            .iter()
            .map(|(name, ctype)| Column::new(*name, *ctype))
            .collect();
        for pattern in pattern_columns {
            count_columns.push(Column::new(pattern.clone(), ColumnType::Int64));
        }

        let files = Table::with_options(
            vec![
                Column::new("key", ColumnType::Int64),
                Column::new("filename", ColumnType::RStr),
            ],
            TableOptions {
                intern_strings: true,
                ..TableOptions::default()
            },
        );
        let counts = Table::with_options(
            count_columns,
            TableOptions {
                null_bitmap: true,
                intern_strings: true,
                ..TableOptions::default()
            },
        );
        let snippets = Table::new(vec![
            Column::new("key", ColumnType::Int64),
            Column::new("file-key", ColumnType::Int64),
            Column::new("snippet", ColumnType::Str),
        ]);

        Self {
            files: RwLock::new(files),
            counts: RwLock::new(counts),
            line_list: RwLock::new(sift_scan::line_list_table()),
            snippets: RwLock::new(snippets),
            errors: Mutex::new(Vec::new()),
        }
    }

    /// Record a per-file failure and keep going.
    pub fn add_error(&self, message: impl Into<String>) {
        self.errors.lock().push(message.into());
    }

    /// Snapshot of the recorded failures.
    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().clone()
    }
}
