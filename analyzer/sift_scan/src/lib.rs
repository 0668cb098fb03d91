//! Lexical region scanning for the sift analysis engine.
//!
//! This crate classifies a byte stream into *syntactic regions* — code,
//! line comments, block comments, strings, raw strings — according to a
//! configurable rule set, and runs the analyses that ride on the
//! classification:
//!
//! - [`RegionMachine`]: the open/close/escape marker state machine.
//! - [`PatternSet`]: length-sorted literal patterns with a first-byte
//!   hint table; [`RegexPatterns`] is the regex sibling.
//! - [`Scanner`]: composes a [`sift_window::Window`] with the machine
//!   and drives a [`ScanSink`] with classified text.
//! - [`Counter`]: per-file line / code-line / character / segment counts.
//! - [`LineMatcher`]: per-line pattern match extraction into a
//!   [`sift_table::Table`].
//! - [`PatternCounter`]: per-pattern occurrence totals.
//!
//! The scanner is single-threaded per file; a driver fans files out
//! across workers, each with its own scanner.

mod chars;
mod counter;
mod errors;
mod matcher;
mod patterns;
mod region;
mod rules;
mod scanner;

pub use chars::is_code;
pub use counter::{Counter, FileStatistics, PatternCounter};
pub use errors::ScanError;
pub use matcher::{line_list_table, LineMatcher, MatchFinder, RegionSubset, LINE_LIST_COLUMNS};
pub use patterns::{Pattern, PatternHit, PatternSet, RegexPatterns};
pub use region::{Region, RegionCode, RegionGroup};
pub use rules::{RegionMachine, RegionRule};
pub use scanner::{count_rows, FlushCause, ScanSink, ScanSummary, Scanner};
