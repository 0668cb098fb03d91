//! In-memory columnar store for the sift analysis engine.
//!
//! Every fact the analyses discover becomes a row in a [`Table`]; every
//! post-processing step is either a column-wise aggregate or a row-wise
//! predicate. Columns are typed, cells cross to and from
//! [`sift_value::Value`], and a table optionally carries a null bitmap,
//! a row-status bitmap, and duplicate-string interning for reference
//! string columns.
//!
//! Tables round-trip through a sectioned binary format (`columns`,
//! `body`, `reference`) whose sections are accepted in either order.

mod aggregate;
mod column;
mod errors;
mod serialize;
mod table;

pub use aggregate::Aggregates;
pub use column::{Column, ColumnType};
pub use errors::TableError;
pub use table::{ColumnRef, Table, TableOptions};
