//! The columnar table.
//!
//! Storage is column-major: one typed vector per column, a row counter,
//! and optional null / row-status bitmaps. Cells cross to and from
//! [`Value`]; setting a cell coerces the value to the column type with
//! the same lossy matrix the value model uses everywhere else.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use sift_value::Value;

use crate::column::{Column, ColumnType};
use crate::errors::TableError;

/// Optional table features selected at construction.
#[derive(Clone, Copy, Debug, Default)]
pub struct TableOptions {
    /// Track per-cell nulls; new rows start fully null.
    pub null_bitmap: bool,
    /// Carry one status byte per row.
    pub row_status: bool,
    /// Deduplicate reference-string cells.
    pub intern_strings: bool,
}

/// Column address: positional or by name.
#[derive(Clone, Copy, Debug)]
pub enum ColumnRef<'a> {
    Index(usize),
    Name(&'a str),
}

impl From<usize> for ColumnRef<'static> {
    fn from(index: usize) -> Self {
        ColumnRef::Index(index)
    }
}

impl<'a> From<&'a str> for ColumnRef<'a> {
    fn from(name: &'a str) -> Self {
        ColumnRef::Name(name)
    }
}

/// Column-major cell storage.
#[derive(Clone, Debug)]
pub(crate) enum ColumnData {
    Int64(Vec<i64>),
    F64(Vec<f64>),
    Bool(Vec<bool>),
    Str(Vec<String>),
    RStr(Vec<Arc<str>>),
    Binary(Vec<Vec<u8>>),
    Nullptr(Vec<u64>),
    Pair(Vec<(i64, i64)>),
}

impl ColumnData {
    pub(crate) fn for_type(ctype: ColumnType) -> Self {
        match ctype {
            ColumnType::Int64 => ColumnData::Int64(Vec::new()),
            ColumnType::F64 => ColumnData::F64(Vec::new()),
            ColumnType::Bool => ColumnData::Bool(Vec::new()),
            ColumnType::Str => ColumnData::Str(Vec::new()),
            ColumnType::RStr => ColumnData::RStr(Vec::new()),
            ColumnType::Binary => ColumnData::Binary(Vec::new()),
            ColumnType::Nullptr => ColumnData::Nullptr(Vec::new()),
            ColumnType::Pair => ColumnData::Pair(Vec::new()),
        }
    }

    fn push_default(&mut self) {
        match self {
            ColumnData::Int64(cells) => cells.push(0),
            ColumnData::F64(cells) => cells.push(0.0),
            ColumnData::Bool(cells) => cells.push(false),
            ColumnData::Str(cells) => cells.push(String::new()),
            ColumnData::RStr(cells) => cells.push(Arc::from("")),
            ColumnData::Binary(cells) => cells.push(Vec::new()),
            ColumnData::Nullptr(cells) => cells.push(0),
            ColumnData::Pair(cells) => cells.push((0, 0)),
        }
    }

    fn retain(&mut self, keep: &[bool]) {
        let mut index = 0usize;
        match self {
            ColumnData::Int64(cells) => cells.retain(|_| keep_next(keep, &mut index)),
            ColumnData::F64(cells) => cells.retain(|_| keep_next(keep, &mut index)),
            ColumnData::Bool(cells) => cells.retain(|_| keep_next(keep, &mut index)),
            ColumnData::Str(cells) => cells.retain(|_| keep_next(keep, &mut index)),
            ColumnData::RStr(cells) => cells.retain(|_| keep_next(keep, &mut index)),
            ColumnData::Binary(cells) => cells.retain(|_| keep_next(keep, &mut index)),
            ColumnData::Nullptr(cells) => cells.retain(|_| keep_next(keep, &mut index)),
            ColumnData::Pair(cells) => cells.retain(|_| keep_next(keep, &mut index)),
        }
    }
}

fn keep_next(keep: &[bool], index: &mut usize) -> bool {
    let keep_this = keep.get(*index).copied().unwrap_or(true);
    *index += 1;
    keep_this
}

/// Per-cell null bitmap (row-major bit order).
#[derive(Clone, Debug, Default)]
pub(crate) struct Bitmap {
    bytes: Vec<u8>,
    len: usize,
}

impl Bitmap {
    pub(crate) fn get(&self, index: usize) -> bool {
        index < self.len && self.bytes[index / 8] & (1 << (index % 8)) != 0
    }

    pub(crate) fn set(&mut self, index: usize, value: bool) {
        debug_assert!(index < self.len);
        let byte = index / 8;
        if value {
            self.bytes[byte] |= 1 << (index % 8);
        } else {
            self.bytes[byte] &= !(1 << (index % 8));
        }
    }

    pub(crate) fn push(&mut self, value: bool) {
        if self.len % 8 == 0 {
            self.bytes.push(0);
        }
        self.len += 1;
        self.set(self.len - 1, value);
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub(crate) fn from_bytes(bytes: Vec<u8>, len: usize) -> Self {
        Self { bytes, len }
    }

    fn retain_rows(&mut self, keep: &[bool], columns: usize) -> Self {
        let mut next = Bitmap::default();
        for (row, keep_row) in keep.iter().enumerate() {
            if *keep_row {
                for column in 0..columns {
                    next.push(self.get(row * columns + column));
                }
            }
        }
        next
    }
}

/// In-memory columnar table.
#[derive(Clone, Debug)]
pub struct Table {
    columns: Vec<Column>,
    data: Vec<ColumnData>,
    rows: usize,
    nulls: Option<Bitmap>,
    row_status: Option<Vec<u8>>,
    intern: Option<FxHashMap<String, Arc<str>>>,
}

impl Table {
    /// Table with the given schema and no optional features.
    pub fn new(columns: Vec<Column>) -> Self {
        Self::with_options(columns, TableOptions::default())
    }

    /// Table with optional null bitmap, row status, and interning.
    pub fn with_options(columns: Vec<Column>, options: TableOptions) -> Self {
        let data = columns
            .iter()
            .map(|column| ColumnData::for_type(column.ctype()))
            .collect();
        Self {
            columns,
            data,
            rows: 0,
            nulls: options.null_bitmap.then(Bitmap::default),
            row_status: options.row_status.then(Vec::new),
            intern: options.intern_strings.then(FxHashMap::default),
        }
    }

    #[inline]
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    #[inline]
    pub fn row_count(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Resolve a column name to its index.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column.name() == name)
    }

    pub(crate) fn resolve(&self, column: ColumnRef<'_>) -> Result<usize, TableError> {
        match column {
            ColumnRef::Index(index) if index < self.columns.len() => Ok(index),
            ColumnRef::Index(index) => Err(TableError::ColumnOutOfRange {
                index,
                columns: self.columns.len(),
            }),
            ColumnRef::Name(name) => self
                .column_index(name)
                .ok_or_else(|| TableError::UnknownColumn(name.to_string())),
        }
    }

    /// Append one row of defaults; with a null bitmap the new cells
    /// start null. Returns the new row index.
    pub fn row_add(&mut self) -> usize {
        for data in &mut self.data {
            data.push_default();
        }
        if let Some(nulls) = &mut self.nulls {
            for _ in 0..self.columns.len() {
                nulls.push(true);
            }
        }
        if let Some(status) = &mut self.row_status {
            status.push(0);
        }
        self.rows += 1;
        self.rows - 1
    }

    /// Append a fully populated row; the value count must match the
    /// column count.
    pub fn row_push(&mut self, values: &[Value]) -> Result<usize, TableError> {
        if values.len() != self.columns.len() {
            return Err(TableError::ArityMismatch {
                expected: self.columns.len(),
                got: values.len(),
            });
        }
        let row = self.row_add();
        for (index, value) in values.iter().enumerate() {
            self.cell_set(row, ColumnRef::Index(index), value.clone())?;
        }
        Ok(row)
    }

    /// Set a cell, coercing the value to the column type. `Value::Null`
    /// marks the cell null (with a bitmap) or resets it to the default.
    pub fn cell_set<'a>(
        &mut self,
        row: usize,
        column: impl Into<ColumnRef<'a>>,
        value: Value,
    ) -> Result<(), TableError> {
        let column = self.resolve(column.into())?;
        if row >= self.rows {
            return Err(TableError::RowOutOfRange { row, rows: self.rows });
        }

        let is_null = value.is_null();
        if !is_null {
            let interned = match (&self.data[column], &mut self.intern) {
                (ColumnData::RStr(_), Some(intern)) => {
                    let text = value.as_string();
                    Some(
                        intern
                            .entry(text.clone())
                            .or_insert_with(|| Arc::from(text.as_str()))
                            .clone(),
                    )
                }
                (ColumnData::RStr(_), None) => Some(Arc::from(value.as_string().as_str())),
                _ => None,
            };
            match &mut self.data[column] {
                ColumnData::Int64(cells) => cells[row] = value.as_integer(),
                ColumnData::F64(cells) => cells[row] = value.as_double(),
                ColumnData::Bool(cells) => cells[row] = value.as_bool(),
                ColumnData::Str(cells) => cells[row] = value.as_string(),
                ColumnData::RStr(cells) => {
                    if let Some(interned) = interned {
                        cells[row] = interned;
                    }
                }
                ColumnData::Binary(cells) => cells[row] = value.as_string().into_bytes(),
                #[allow(clippy::cast_sign_loss, reason = "opaque handle slot")]
                ColumnData::Nullptr(cells) => cells[row] = value.as_integer() as u64,
                ColumnData::Pair(cells) => cells[row] = (value.as_integer(), 0),
            }
        }

        if let Some(nulls) = &mut self.nulls {
            nulls.set(row * self.columns.len() + column, is_null);
        }
        Ok(())
    }

    /// Variant view of a cell.
    ///
    /// Total: out-of-range rows, unknown columns, and null cells all
    /// read as `Value::Null`, which is what row predicates expect of
    /// missing data.
    pub fn cell_get<'a>(&self, row: usize, column: impl Into<ColumnRef<'a>>) -> Value {
        let Ok(column) = self.resolve(column.into()) else {
            return Value::Null;
        };
        if row >= self.rows || self.is_null(row, column) {
            return Value::Null;
        }
        match &self.data[column] {
            ColumnData::Int64(cells) => Value::Int(cells[row]),
            ColumnData::F64(cells) => Value::Float(cells[row]),
            ColumnData::Bool(cells) => Value::Bool(cells[row]),
            ColumnData::Str(cells) => Value::Str(cells[row].clone()),
            ColumnData::RStr(cells) => Value::Str(cells[row].to_string()),
            ColumnData::Binary(cells) => Value::Str(String::from_utf8_lossy(&cells[row]).into_owned()),
            ColumnData::Nullptr(_) => Value::Null,
            ColumnData::Pair(cells) => {
                let (low, high) = cells[row];
                Value::Str(format!("{low}:{high}"))
            }
        }
    }

    /// `true` when the cell is marked null (always `false` without a
    /// bitmap).
    pub fn is_null(&self, row: usize, column: usize) -> bool {
        self.nulls
            .as_ref()
            .is_some_and(|nulls| nulls.get(row * self.columns.len() + column))
    }

    /// One row as values, in column order.
    pub fn row_values(&self, row: usize) -> Vec<Value> {
        (0..self.columns.len())
            .map(|column| self.cell_get(row, column))
            .collect()
    }

    /// Status byte for a row (0 without a status bitmap).
    pub fn row_flags(&self, row: usize) -> u8 {
        self.row_status
            .as_ref()
            .and_then(|status| status.get(row).copied())
            .unwrap_or(0)
    }

    /// Set the status byte for a row; no-op without a status bitmap.
    pub fn set_row_flags(&mut self, row: usize, flags: u8) {
        if let Some(status) = &mut self.row_status {
            if let Some(slot) = status.get_mut(row) {
                *slot = flags;
            }
        }
    }

    /// Append a terminal row holding column-wise sums of the selected
    /// columns; unselected cells stay null (or default).
    pub fn append_sum_row(&mut self, selected: &[ColumnRef<'_>]) -> Result<usize, TableError> {
        let mut indices = Vec::with_capacity(selected.len());
        for column in selected {
            indices.push(self.resolve(*column)?);
        }
        let sums: Vec<(usize, Value)> = indices
            .iter()
            .map(|&column| (column, self.sum_column(column)))
            .collect();
        let row = self.row_add();
        for (column, sum) in sums {
            self.cell_set(row, ColumnRef::Index(column), sum)?;
        }
        Ok(row)
    }

    pub(crate) fn sum_column(&self, column: usize) -> Value {
        match &self.data[column] {
            ColumnData::Int64(cells) => Value::Int(
                cells
                    .iter()
                    .enumerate()
                    .filter(|(row, _)| !self.is_null(*row, column))
                    .map(|(_, cell)| *cell)
                    .sum(),
            ),
            ColumnData::F64(cells) => Value::Float(
                cells
                    .iter()
                    .enumerate()
                    .filter(|(row, _)| !self.is_null(*row, column))
                    .map(|(_, cell)| *cell)
                    .sum(),
            ),
            ColumnData::Bool(cells) => Value::Int(
                cells
                    .iter()
                    .enumerate()
                    .filter(|(row, cell)| **cell && !self.is_null(*row, column))
                    .count() as i64,
            ),
            _ => Value::Null,
        }
    }

    /// Erase every row whose selected cells are all zero (nulls count as
    /// zero). Returns the number of rows removed.
    pub fn prune_zero_rows(&mut self, selected: &[ColumnRef<'_>]) -> Result<usize, TableError> {
        let mut indices = Vec::with_capacity(selected.len());
        for column in selected {
            indices.push(self.resolve(*column)?);
        }
        let keep: Vec<bool> = (0..self.rows)
            .map(|row| {
                indices.iter().any(|&column| match self.cell_get(row, column) {
                    Value::Int(v) => v != 0,
                    Value::Float(v) => v != 0.0,
                    Value::Bool(v) => v,
                    Value::Str(text) => !text.is_empty(),
                    Value::Ptr(_) => true,
                    Value::Null => false,
                })
            })
            .collect();
        let removed = keep.iter().filter(|keep_row| !**keep_row).count();
        if removed == 0 {
            return Ok(0);
        }

        for data in &mut self.data {
            data.retain(&keep);
        }
        if let Some(nulls) = &mut self.nulls {
            let columns = self.columns.len();
            *nulls = nulls.retain_rows(&keep, columns);
        }
        if let Some(status) = &mut self.row_status {
            let mut index = 0usize;
            status.retain(|_| keep_next(&keep, &mut index));
        }
        self.rows -= removed;
        Ok(removed)
    }

    pub(crate) fn data(&self) -> &[ColumnData] {
        &self.data
    }

    pub(crate) fn nulls(&self) -> Option<&Bitmap> {
        self.nulls.as_ref()
    }

    pub(crate) fn row_status_bytes(&self) -> Option<&[u8]> {
        self.row_status.as_deref()
    }

    pub(crate) fn is_interning(&self) -> bool {
        self.intern.is_some()
    }

    pub(crate) fn restore(
        columns: Vec<Column>,
        data: Vec<ColumnData>,
        rows: usize,
        nulls: Option<Bitmap>,
        row_status: Option<Vec<u8>>,
        interned: bool,
    ) -> Self {
        Self {
            columns,
            data,
            rows,
            nulls,
            row_status,
            intern: interned.then(FxHashMap::default),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "tests assert on known-good inputs")]
mod tests {
    use super::{Column, ColumnRef, ColumnType, Table, TableOptions};
    use pretty_assertions::assert_eq;
    use sift_value::Value;

    fn statistics_table() -> Table {
        Table::with_options(
            vec![
                Column::new("key", ColumnType::Int64),
                Column::new("filename", ColumnType::RStr),
                Column::new("count", ColumnType::Int64),
                Column::new("code", ColumnType::Int64),
            ],
            TableOptions {
                null_bitmap: true,
                row_status: true,
                intern_strings: true,
            },
        )
    }

    // === Rows & cells ===

    #[test]
    fn new_rows_start_null_with_bitmap() {
        let mut table = statistics_table();
        let row = table.row_add();
        assert_eq!(row, 0);
        assert_eq!(table.cell_get(0, "count"), Value::Null);
    }

    #[test]
    fn cell_set_clears_null_and_coerces() {
        let mut table = statistics_table();
        let row = table.row_add();
        #[allow(clippy::unwrap_used, reason = "column exists")]
        table.cell_set(row, "count", Value::Str("42".into())).unwrap();
        assert_eq!(table.cell_get(row, "count"), Value::Int(42));
    }

    #[test]
    fn row_push_requires_full_arity() {
        let mut table = statistics_table();
        let result = table.row_push(&[Value::Int(1)]);
        assert!(result.is_err());
        #[allow(clippy::unwrap_used, reason = "arity matches")]
        let row = table
            .row_push(&[Value::Int(1), Value::from("a.c"), Value::Int(10), Value::Int(5)])
            .unwrap();
        assert_eq!(row, 0);
        assert_eq!(table.cell_get(0, "filename"), Value::Str("a.c".into()));
    }

    #[test]
    fn unknown_addresses_read_null() {
        let table = statistics_table();
        assert_eq!(table.cell_get(0, "nope"), Value::Null);
        assert_eq!(table.cell_get(9, "count"), Value::Null);
    }

    #[test]
    fn cell_set_unknown_column_is_an_error() {
        let mut table = statistics_table();
        let row = table.row_add();
        assert!(table.cell_set(row, "nope", Value::Int(1)).is_err());
    }

    #[test]
    fn row_status_round_trips() {
        let mut table = statistics_table();
        let row = table.row_add();
        table.set_row_flags(row, 0x80);
        assert_eq!(table.row_flags(row), 0x80);
    }

    // === Sum rows & pruning ===

    fn filled() -> Table {
        let mut table = statistics_table();
        for (key, count, code) in [(1i64, 10i64, 4i64), (2, 0, 0), (3, 5, 2)] {
            #[allow(clippy::unwrap_used, reason = "arity matches")]
            table
                .row_push(&[
                    Value::Int(key),
                    Value::from(format!("f{key}.c")),
                    Value::Int(count),
                    Value::Int(code),
                ])
                .unwrap();
        }
        table
    }

    #[test]
    fn append_sum_row_totals_selected_columns() {
        let mut table = filled();
        #[allow(clippy::unwrap_used, reason = "columns exist")]
        let row = table
            .append_sum_row(&[ColumnRef::Name("count"), ColumnRef::Name("code")])
            .unwrap();
        assert_eq!(row, 3);
        assert_eq!(table.cell_get(row, "count"), Value::Int(15));
        assert_eq!(table.cell_get(row, "code"), Value::Int(6));
        // Unselected columns stay null.
        assert_eq!(table.cell_get(row, "key"), Value::Null);
    }

    #[test]
    fn prune_zero_rows_drops_all_zero_rows() {
        let mut table = filled();
        #[allow(clippy::unwrap_used, reason = "columns exist")]
        let removed = table
            .prune_zero_rows(&[ColumnRef::Name("count"), ColumnRef::Name("code")])
            .unwrap();
        assert_eq!(removed, 1);
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.cell_get(1, "key"), Value::Int(3));
    }

    #[test]
    fn prune_preserves_null_bits_of_kept_rows() {
        let mut table = filled();
        // Null out a cell in the last row, then prune the middle row.
        #[allow(clippy::unwrap_used, reason = "column exists")]
        table.cell_set(2, "code", Value::Null).unwrap();
        #[allow(clippy::unwrap_used, reason = "columns exist")]
        table.prune_zero_rows(&[ColumnRef::Name("count")]).unwrap();
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.cell_get(1, "code"), Value::Null);
        assert_eq!(table.cell_get(1, "count"), Value::Int(5));
    }
}
