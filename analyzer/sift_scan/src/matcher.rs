//! Per-line pattern match extraction.
//!
//! The [`LineMatcher`] rides on the scanner: every captured code line or
//! region line in the caller-selected subset is searched, and each hit
//! becomes a row in a line-list table with the file, the trimmed line
//! text, the 1-based row, the 0-based match column, and the pattern text.
//!
//! The column is measured within the captured text *before* trimming;
//! when a logical line is split by a region transition the captured
//! prefix is searched on its own, so the column counts within that
//! prefix.

use bitflags::bitflags;
use tracing::warn;

use sift_table::{Column, ColumnType, Table};
use sift_value::Value;

use crate::patterns::{PatternSet, RegexPatterns};
use crate::region::{Region, RegionGroup};
use crate::scanner::{FlushCause, ScanSink};

bitflags! {
    /// Caller-selected mask over the searchable region classes.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct RegionSubset: u8 {
        const CODE = 0x01;
        const COMMENT = 0x02;
        const STRING = 0x04;
    }
}

impl RegionSubset {
    /// Parse the CLI `state=` word.
    pub fn parse(word: &str) -> Option<Self> {
        Some(match word {
            "code" => RegionSubset::CODE,
            "comment" => RegionSubset::COMMENT,
            "string" => RegionSubset::STRING,
            "all" => RegionSubset::all(),
            _ => return None,
        })
    }

    /// Does the subset cover a region group?
    pub fn covers(self, group: RegionGroup) -> bool {
        match group {
            RegionGroup::Comment => self.contains(RegionSubset::COMMENT),
            RegionGroup::String => self.contains(RegionSubset::STRING),
            RegionGroup::None | RegionGroup::Outside => false,
        }
    }
}

/// Line-list table schema, consumed by downstream tooling.
pub const LINE_LIST_COLUMNS: &[(&str, ColumnType)] = &[
    ("key", ColumnType::Int64),
    ("file-key", ColumnType::Int64),
    ("filename", ColumnType::Str),
    ("line", ColumnType::Str),
    ("row", ColumnType::Int64),
    ("column", ColumnType::Int64),
    ("pattern", ColumnType::Str),
];

/// Build an empty line-list table.
pub fn line_list_table() -> Table {
    Table::new(
        LINE_LIST_COLUMNS
            .iter()
            .map(|(name, ctype)| Column::new(*name, *ctype))
            .collect(),
    )
}

/// Literal or regex search strategy.
#[derive(Clone, Copy, Debug)]
pub enum MatchFinder<'a> {
    Literal(&'a PatternSet),
    Regex(&'a RegexPatterns),
}

impl MatchFinder<'_> {
    /// First match in `text`: `(column, pattern text)`.
    fn find(&self, text: &[u8]) -> Option<(usize, String)> {
        match self {
            MatchFinder::Literal(patterns) => patterns.find_first(text).map(|hit| {
                let pattern = patterns.get(hit.index).map(crate::patterns::Pattern::text);
                (hit.position, pattern.unwrap_or_default())
            }),
            MatchFinder::Regex(patterns) => {
                let text = String::from_utf8_lossy(text);
                patterns.find_first(&text).map(|hit| {
                    let pattern = patterns.source(hit.index).unwrap_or_default();
                    (hit.position, pattern.to_string())
                })
            }
        }
    }
}

/// Scan sink emitting one line-list row per matching captured line.
pub struct LineMatcher<'a> {
    finder: MatchFinder<'a>,
    subset: RegionSubset,
    table: &'a mut Table,
    file_key: u64,
    filename: &'a str,
}

impl<'a> LineMatcher<'a> {
    pub fn new(
        finder: MatchFinder<'a>,
        subset: RegionSubset,
        table: &'a mut Table,
        file_key: u64,
        filename: &'a str,
    ) -> Self {
        Self {
            finder,
            subset,
            table,
            file_key,
            filename,
        }
    }

    fn try_match(&mut self, text: &[u8], row: u64) {
        let Some((column, pattern)) = self.finder.find(text) else {
            return;
        };
        let trimmed = String::from_utf8_lossy(trim_bytes(text)).into_owned();
        let key = self.table.row_count() as u64 + 1;
        let result = self.table.row_push(&[
            Value::from(key),
            Value::from(self.file_key),
            Value::from(self.filename),
            Value::from(trimmed),
            Value::from(row),
            Value::from(column as u64),
            Value::from(pattern),
        ]);
        if let Err(error) = result {
            warn!(%error, "line list row rejected");
        }
    }
}

impl ScanSink for LineMatcher<'_> {
    fn code_flush(&mut self, text: &[u8], row: u64, _cause: FlushCause) {
        if self.subset.contains(RegionSubset::CODE) && !text.is_empty() {
            self.try_match(text, row);
        }
    }

    fn region_enter(&mut self, _region: Region, _row: u64) {}

    fn region_text(&mut self, region: Region, text: &[u8], row: u64, _terminal: bool) {
        if self.subset.covers(region.group()) && !text.is_empty() {
            self.try_match(text, row);
        }
    }
}

/// Trim ASCII whitespace from both ends.
fn trim_bytes(text: &[u8]) -> &[u8] {
    let start = text
        .iter()
        .position(|byte| !byte.is_ascii_whitespace())
        .unwrap_or(text.len());
    let end = text
        .iter()
        .rposition(|byte| !byte.is_ascii_whitespace())
        .map_or(start, |at| at + 1);
    &text[start..end]
}
