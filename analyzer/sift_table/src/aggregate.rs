//! Column-wise aggregate operations.
//!
//! All aggregates are parameterised by a row range; pass `..` for the
//! whole table. Null cells are skipped. Non-numeric columns support the
//! ordering, uniqueness and text aggregates; the arithmetic aggregates
//! return `None`/`Null` for them.

use std::ops::{Bound, RangeBounds};

use rustc_hash::FxHashSet;

use sift_value::Value;

use crate::table::{ColumnRef, Table};

/// Aggregate suite over a [`Table`].
pub trait Aggregates {
    /// Smallest non-null value.
    fn min<'a>(&self, column: impl Into<ColumnRef<'a>>, rows: impl RangeBounds<usize>) -> Option<Value>;

    /// Largest non-null value.
    fn max<'a>(&self, column: impl Into<ColumnRef<'a>>, rows: impl RangeBounds<usize>) -> Option<Value>;

    /// Longest formatted cell text, in bytes.
    fn max_length<'a>(&self, column: impl Into<ColumnRef<'a>>, rows: impl RangeBounds<usize>) -> Option<usize>;

    /// Column sum: `Int` for integer/bool columns, `Float` for doubles,
    /// `Null` otherwise.
    fn sum<'a>(&self, column: impl Into<ColumnRef<'a>>, rows: impl RangeBounds<usize>) -> Value;

    /// Arithmetic mean of the non-null numeric cells.
    fn average<'a>(&self, column: impl Into<ColumnRef<'a>>, rows: impl RangeBounds<usize>) -> Option<f64>;

    /// Number of rows in the range.
    fn count(&self, rows: impl RangeBounds<usize>) -> usize;

    /// Number of non-null cells.
    fn count_not_null<'a>(&self, column: impl Into<ColumnRef<'a>>, rows: impl RangeBounds<usize>) -> usize;

    /// Number of null cells.
    fn count_null<'a>(&self, column: impl Into<ColumnRef<'a>>, rows: impl RangeBounds<usize>) -> usize;

    /// Number of distinct non-null values.
    fn count_unique<'a>(&self, column: impl Into<ColumnRef<'a>>, rows: impl RangeBounds<usize>) -> usize;

    /// Population variance of the non-null numeric cells.
    fn variance<'a>(&self, column: impl Into<ColumnRef<'a>>, rows: impl RangeBounds<usize>) -> Option<f64>;

    /// Population standard deviation.
    fn std_deviation<'a>(&self, column: impl Into<ColumnRef<'a>>, rows: impl RangeBounds<usize>) -> Option<f64>;

    /// Median of the non-null numeric cells.
    fn median<'a>(&self, column: impl Into<ColumnRef<'a>>, rows: impl RangeBounds<usize>) -> Option<f64>;

    /// Interpolated percentile, `p` in `[0, 100]`.
    fn percentile<'a>(
        &self,
        column: impl Into<ColumnRef<'a>>,
        rows: impl RangeBounds<usize>,
        p: f64,
    ) -> Option<f64>;

    /// Distinct non-null values in first-seen order.
    fn unique<'a>(&self, column: impl Into<ColumnRef<'a>>, rows: impl RangeBounds<usize>) -> Vec<Value>;

    /// Number of cells whose text contains `needle`.
    fn count_contains<'a>(
        &self,
        column: impl Into<ColumnRef<'a>>,
        rows: impl RangeBounds<usize>,
        needle: &str,
    ) -> usize;

    /// Longest formatted cell per column, in bytes.
    fn max_lengths(&self, rows: impl RangeBounds<usize>) -> Vec<usize>;

    /// Text-aware variant: measures the longest *line* inside each cell
    /// (split on `'\n'`) rather than the whole text. Used to size
    /// table-formatted output.
    fn max_text_lengths(&self, rows: impl RangeBounds<usize>) -> Vec<usize>;
}

/// Clamp a range-bounds argument to `[0, rows)`.
fn resolve(rows: usize, bounds: &impl RangeBounds<usize>) -> (usize, usize) {
    let begin = match bounds.start_bound() {
        Bound::Included(&at) => at,
        Bound::Excluded(&at) => at + 1,
        Bound::Unbounded => 0,
    };
    let end = match bounds.end_bound() {
        Bound::Included(&at) => at + 1,
        Bound::Excluded(&at) => at,
        Bound::Unbounded => rows,
    };
    (begin.min(rows), end.min(rows))
}

/// Non-null cells of one column over a row range.
fn cells<'a>(
    table: &'a Table,
    column: ColumnRef<'_>,
    bounds: &impl RangeBounds<usize>,
) -> impl Iterator<Item = Value> + 'a {
    let column = table.resolve(column).ok();
    let (begin, end) = resolve(table.row_count(), bounds);
    (begin..end).filter_map(move |row| {
        let value = table.cell_get(row, column?);
        (!value.is_null()).then_some(value)
    })
}

/// Numeric view of the non-null cells.
fn numeric_cells(
    table: &Table,
    column: ColumnRef<'_>,
    bounds: &impl RangeBounds<usize>,
) -> Vec<f64> {
    cells(table, column, bounds)
        .filter(|value| matches!(value, Value::Int(_) | Value::Float(_) | Value::Bool(_)))
        .map(|value| value.as_double())
        .collect()
}

fn value_less(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => a < b,
        (Value::Str(a), Value::Str(b)) => a < b,
        (Value::Bool(a), Value::Bool(b)) => !*a && *b,
        _ => left.as_double() < right.as_double(),
    }
}

impl Aggregates for Table {
    fn min<'a>(&self, column: impl Into<ColumnRef<'a>>, rows: impl RangeBounds<usize>) -> Option<Value> {
        cells(self, column.into(), &rows).reduce(|best, next| if value_less(&next, &best) { next } else { best })
    }

    fn max<'a>(&self, column: impl Into<ColumnRef<'a>>, rows: impl RangeBounds<usize>) -> Option<Value> {
        cells(self, column.into(), &rows).reduce(|best, next| if value_less(&best, &next) { next } else { best })
    }

    fn max_length<'a>(&self, column: impl Into<ColumnRef<'a>>, rows: impl RangeBounds<usize>) -> Option<usize> {
        cells(self, column.into(), &rows).map(|value| value.as_string().len()).max()
    }

    fn sum<'a>(&self, column: impl Into<ColumnRef<'a>>, rows: impl RangeBounds<usize>) -> Value {
        let column = column.into();
        let Ok(index) = self.resolve(column) else {
            return Value::Null;
        };
        let (begin, end) = resolve(self.row_count(), &rows);
        if (begin, end) == (0, self.row_count()) {
            return self.sum_column(index);
        }
        let values = numeric_cells(self, ColumnRef::Index(index), &rows);
        if values.is_empty() {
            return Value::Null;
        }
        let total: f64 = values.iter().sum();
        match self.columns()[index].ctype() {
            crate::ColumnType::F64 => Value::Float(total),
            #[allow(clippy::cast_possible_truncation, reason = "integer column totals")]
            _ => Value::Int(total as i64),
        }
    }

    fn average<'a>(&self, column: impl Into<ColumnRef<'a>>, rows: impl RangeBounds<usize>) -> Option<f64> {
        let values = numeric_cells(self, column.into(), &rows);
        if values.is_empty() {
            return None;
        }
        #[allow(clippy::cast_precision_loss, reason = "row counts stay small")]
        let n = values.len() as f64;
        Some(values.iter().sum::<f64>() / n)
    }

    fn count(&self, rows: impl RangeBounds<usize>) -> usize {
        let (begin, end) = resolve(self.row_count(), &rows);
        end - begin
    }

    fn count_not_null<'a>(&self, column: impl Into<ColumnRef<'a>>, rows: impl RangeBounds<usize>) -> usize {
        cells(self, column.into(), &rows).count()
    }

    fn count_null<'a>(&self, column: impl Into<ColumnRef<'a>>, rows: impl RangeBounds<usize>) -> usize {
        let (begin, end) = resolve(self.row_count(), &rows);
        (end - begin) - self.count_not_null(column, rows)
    }

    fn count_unique<'a>(&self, column: impl Into<ColumnRef<'a>>, rows: impl RangeBounds<usize>) -> usize {
        let mut seen = FxHashSet::default();
        cells(self, column.into(), &rows)
            .filter(|value| seen.insert(value.as_string()))
            .count()
    }

    fn variance<'a>(&self, column: impl Into<ColumnRef<'a>>, rows: impl RangeBounds<usize>) -> Option<f64> {
        let values = numeric_cells(self, column.into(), &rows);
        if values.is_empty() {
            return None;
        }
        #[allow(clippy::cast_precision_loss, reason = "row counts stay small")]
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        Some(values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n)
    }

    fn std_deviation<'a>(&self, column: impl Into<ColumnRef<'a>>, rows: impl RangeBounds<usize>) -> Option<f64> {
        self.variance(column, rows).map(f64::sqrt)
    }

    fn median<'a>(&self, column: impl Into<ColumnRef<'a>>, rows: impl RangeBounds<usize>) -> Option<f64> {
        self.percentile(column, rows, 50.0)
    }

    fn percentile<'a>(
        &self,
        column: impl Into<ColumnRef<'a>>,
        rows: impl RangeBounds<usize>,
        p: f64,
    ) -> Option<f64> {
        let mut values = numeric_cells(self, column.into(), &rows);
        if values.is_empty() || !(0.0..=100.0).contains(&p) {
            return None;
        }
        values.sort_by(f64::total_cmp);
        #[allow(clippy::cast_precision_loss, reason = "row counts stay small")]
        let rank = p / 100.0 * (values.len() - 1) as f64;
        #[allow(
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            reason = "rank is within 0..len after the range check"
        )]
        let low = rank.floor() as usize;
        #[allow(
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            reason = "rank is within 0..len after the range check"
        )]
        let high = rank.ceil() as usize;
        let fraction = rank - rank.floor();
        Some(values[low] + (values[high] - values[low]) * fraction)
    }

    fn unique<'a>(&self, column: impl Into<ColumnRef<'a>>, rows: impl RangeBounds<usize>) -> Vec<Value> {
        let mut seen = FxHashSet::default();
        cells(self, column.into(), &rows)
            .filter(|value| seen.insert(value.as_string()))
            .collect()
    }

    fn count_contains<'a>(
        &self,
        column: impl Into<ColumnRef<'a>>,
        rows: impl RangeBounds<usize>,
        needle: &str,
    ) -> usize {
        cells(self, column.into(), &rows)
            .filter(|value| value.as_string().contains(needle))
            .count()
    }

    fn max_lengths(&self, rows: impl RangeBounds<usize>) -> Vec<usize> {
        let (begin, end) = resolve(self.row_count(), &rows);
        (0..self.column_count())
            .map(|column| self.max_length(column, begin..end).unwrap_or(0))
            .collect()
    }

    fn max_text_lengths(&self, rows: impl RangeBounds<usize>) -> Vec<usize> {
        let (begin, end) = resolve(self.row_count(), &rows);
        (0..self.column_count())
            .map(|column| {
                (begin..end)
                    .filter_map(|row| {
                        let value = self.cell_get(row, column);
                        if value.is_null() {
                            return None;
                        }
                        value.as_string().split('\n').map(str::len).max()
                    })
                    .max()
                    .unwrap_or(0)
            })
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "tests assert on known-good inputs")]
mod tests {
    use super::Aggregates;
    use crate::column::{Column, ColumnType};
    use crate::table::{Table, TableOptions};
    use pretty_assertions::assert_eq;
    use sift_value::Value;

    fn sample() -> Table {
        let mut table = Table::with_options(
            vec![
                Column::new("name", ColumnType::Str),
                Column::new("count", ColumnType::Int64),
            ],
            TableOptions {
                null_bitmap: true,
                ..TableOptions::default()
            },
        );
        for (name, count) in [("alpha", 4i64), ("beta", 1), ("alpha", 7), ("gamma", 2)] {
            #[allow(clippy::unwrap_used, reason = "arity matches")]
            table.row_push(&[Value::from(name), Value::Int(count)]).unwrap();
        }
        let row = table.row_add(); // fully null row
        let _ = row;
        table
    }

    // === Ordering ===

    #[test]
    fn min_max_skip_nulls() {
        let table = sample();
        assert_eq!(table.min("count", ..), Some(Value::Int(1)));
        assert_eq!(table.max("count", ..), Some(Value::Int(7)));
        assert_eq!(table.max("name", ..), Some(Value::Str("gamma".into())));
    }

    #[test]
    fn range_restricts_rows() {
        let table = sample();
        assert_eq!(table.max("count", 0..2), Some(Value::Int(4)));
        assert_eq!(table.count(1..3), 2);
    }

    // === Arithmetic ===

    #[test]
    fn sum_and_average() {
        let table = sample();
        assert_eq!(table.sum("count", ..), Value::Int(14));
        assert_eq!(table.average("count", ..), Some(3.5));
    }

    #[test]
    fn variance_and_deviation() {
        let table = sample();
        // values 4, 1, 7, 2: mean 3.5, variance 5.25.
        assert_eq!(table.variance("count", ..), Some(5.25));
        #[allow(clippy::unwrap_used, reason = "variance exists")]
        let deviation = table.std_deviation("count", ..).unwrap();
        assert!((deviation - 5.25f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn median_and_percentile() {
        let table = sample();
        // sorted: 1, 2, 4, 7 — median interpolates to 3.
        assert_eq!(table.median("count", ..), Some(3.0));
        assert_eq!(table.percentile("count", .., 0.0), Some(1.0));
        assert_eq!(table.percentile("count", .., 100.0), Some(7.0));
        assert_eq!(table.percentile("count", .., 101.0), None);
    }

    // === Counting ===

    #[test]
    fn null_counting() {
        let table = sample();
        assert_eq!(table.count(..), 5);
        assert_eq!(table.count_not_null("count", ..), 4);
        assert_eq!(table.count_null("count", ..), 1);
    }

    #[test]
    fn uniqueness() {
        let table = sample();
        assert_eq!(table.count_unique("name", ..), 3);
        assert_eq!(
            table.unique("name", ..),
            vec![
                Value::Str("alpha".into()),
                Value::Str("beta".into()),
                Value::Str("gamma".into()),
            ]
        );
    }

    #[test]
    fn contains_counting() {
        let table = sample();
        assert_eq!(table.count_contains("name", .., "a"), 4);
        assert_eq!(table.count_contains("name", .., "amm"), 1);
    }

    // === Lengths ===

    #[test]
    fn plain_and_text_aware_lengths() {
        let mut table = Table::new(vec![Column::new("line", ColumnType::Str)]);
        #[allow(clippy::unwrap_used, reason = "arity matches")]
        table.row_push(&[Value::from("short")]).unwrap();
        #[allow(clippy::unwrap_used, reason = "arity matches")]
        table.row_push(&[Value::from("one\nlonger line\nx")]).unwrap();
        assert_eq!(table.max_lengths(..), vec![17]);
        // Longest single line is "longer line" (11 bytes).
        assert_eq!(table.max_text_lengths(..), vec![11]);
    }

    #[test]
    fn empty_table_aggregates() {
        let table = Table::new(vec![Column::new("count", ColumnType::Int64)]);
        assert_eq!(table.min("count", ..), None);
        assert_eq!(table.sum("count", ..), Value::Int(0));
        assert_eq!(table.average("count", ..), None);
        assert_eq!(table.median("count", ..), None);
    }
}
