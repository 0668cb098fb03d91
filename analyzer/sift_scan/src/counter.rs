//! Per-file counting analyses.
//!
//! [`Counter`] produces the line statistics: total lines, code lines,
//! code characters, comment segments, string segments.
//! [`PatternCounter`] tallies every occurrence of each registered
//! pattern inside a chosen region subset.

use crate::chars::is_code;
use crate::matcher::RegionSubset;
use crate::patterns::PatternSet;
use crate::region::{Region, RegionGroup};
use crate::scanner::{FlushCause, ScanSink};

/// Line statistics for one file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FileStatistics {
    /// Count of `'\n'` across the whole file (filled from the scan
    /// summary by the caller).
    pub total_lines: u64,
    /// Lines holding code characters or string literals.
    pub code_lines: u64,
    /// Bytes passing the code-character filter, outside regions.
    pub code_characters: u64,
    /// Entries into Comment-group regions.
    pub comment_segments: u64,
    /// Entries into String-group regions.
    pub string_segments: u64,
}

/// Scan sink producing [`FileStatistics`].
///
/// A code line is counted when a non-empty accumulation terminates at a
/// `'\n'`, at entry into a *non-multiline* region, or at EOF. Entering a
/// multiline region (block comment, string) shares the line instead of
/// terminating it, and a string entry marks the line as code-bearing —
/// a line holding only string literals is still a code line.
#[derive(Debug, Default)]
pub struct Counter {
    statistics: FileStatistics,
    /// The current line has seen code characters (or a string literal).
    line_has_code: bool,
}

impl Counter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Final statistics; `total_lines` is still zero here, the caller
    /// fills it from the scan summary.
    pub fn into_statistics(self) -> FileStatistics {
        self.statistics
    }
}

impl ScanSink for Counter {
    fn code_flush(&mut self, text: &[u8], _row: u64, cause: FlushCause) {
        let code_bytes = text.iter().filter(|&&byte| is_code(byte)).count() as u64;
        self.statistics.code_characters += code_bytes;
        if code_bytes > 0 {
            self.line_has_code = true;
        }
        let terminates = match cause {
            FlushCause::Newline | FlushCause::EndOfFile => true,
            FlushCause::RegionEnter { multiline } => !multiline,
        };
        if terminates {
            if self.line_has_code {
                self.statistics.code_lines += 1;
            }
            self.line_has_code = false;
        }
    }

    fn region_enter(&mut self, region: Region, _row: u64) {
        match region.group() {
            RegionGroup::Comment => self.statistics.comment_segments += 1,
            RegionGroup::String => {
                self.statistics.string_segments += 1;
                // A string literal is code even though its bytes are not
                // code characters.
                self.line_has_code = true;
            }
            RegionGroup::None | RegionGroup::Outside => {}
        }
    }

    fn region_text(&mut self, _region: Region, _text: &[u8], _row: u64, _terminal: bool) {
        // Region content never contributes counts: segments were counted
        // at entry, and a multiline region ending mid-line leaves the
        // line shared with the surrounding code.
    }
}

/// Scan sink tallying pattern occurrences inside a region subset.
#[derive(Debug)]
pub struct PatternCounter<'a> {
    patterns: &'a PatternSet,
    subset: RegionSubset,
    counts: Vec<u64>,
}

impl<'a> PatternCounter<'a> {
    pub fn new(patterns: &'a PatternSet, subset: RegionSubset) -> Self {
        Self {
            patterns,
            subset,
            counts: vec![0; patterns.len()],
        }
    }

    /// Occurrence totals, one per pattern in set order.
    pub fn into_counts(self) -> Vec<u64> {
        self.counts
    }
}

impl ScanSink for PatternCounter<'_> {
    fn code_flush(&mut self, text: &[u8], _row: u64, _cause: FlushCause) {
        if self.subset.contains(RegionSubset::CODE) && !text.is_empty() {
            self.patterns.count_into(text, &mut self.counts);
        }
    }

    fn region_enter(&mut self, _region: Region, _row: u64) {}

    fn region_text(&mut self, region: Region, text: &[u8], _row: u64, _terminal: bool) {
        if self.subset.covers(region.group()) && !text.is_empty() {
            self.patterns.count_into(text, &mut self.counts);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "tests assert on known-good inputs")]
mod tests {
    use super::{Counter, PatternCounter};
    use crate::matcher::RegionSubset;
    use crate::patterns::PatternSet;
    use crate::region::Region;
    use crate::rules::{RegionMachine, RegionRule};
    use crate::scanner::Scanner;
    use pretty_assertions::assert_eq;

    fn c_like() -> RegionMachine {
        let mut machine = RegionMachine::new();
        machine.add(RegionRule::new(Region::LineComment, "//", "\n"));
        machine.add(RegionRule::new(Region::BlockComment, "/*", "*/"));
        machine.add(RegionRule::with_escape(Region::Str, "\"", "\"", "\\"));
        machine
    }

    fn count(input: &str) -> super::FileStatistics {
        let mut scanner = Scanner::new(c_like());
        let mut counter = Counter::new();
        #[allow(clippy::unwrap_used, reason = "in-memory reads cannot fail")]
        let summary = scanner.scan(input.as_bytes(), &mut counter).unwrap();
        let mut statistics = counter.into_statistics();
        statistics.total_lines = summary.total_lines;
        statistics
    }

    // === Line statistics scenarios ===

    #[test]
    fn code_then_line_comment() {
        let statistics = count("int x = 0; // comment\nint y = 1;\n");
        assert_eq!(statistics.total_lines, 2);
        assert_eq!(statistics.code_lines, 2);
        assert_eq!(statistics.comment_segments, 1);
        assert_eq!(statistics.string_segments, 0);
    }

    #[test]
    fn string_only_line_counts_as_code() {
        let statistics = count("\"a\\\"b\" \"c\"\n");
        assert_eq!(statistics.total_lines, 1);
        assert_eq!(statistics.code_lines, 1);
        assert_eq!(statistics.string_segments, 2);
        assert_eq!(statistics.comment_segments, 0);
    }

    #[test]
    fn block_comment_lines_are_not_code() {
        let statistics = count("/* a\nb\nc */\n");
        assert_eq!(statistics.total_lines, 3);
        assert_eq!(statistics.code_lines, 0);
        assert_eq!(statistics.comment_segments, 1);
    }

    #[test]
    fn code_shares_line_with_block_comment() {
        let statistics = count("int x /* c */ = 5;\n");
        assert_eq!(statistics.code_lines, 1);
        assert_eq!(statistics.comment_segments, 1);
    }

    #[test]
    fn code_characters_exclude_whitespace_and_regions() {
        let statistics = count("ab cd // xyz\n");
        // 'a','b','c','d' outside the comment.
        assert_eq!(statistics.code_characters, 4);
    }

    #[test]
    fn trailing_code_without_newline_counts() {
        let statistics = count("return 1;");
        assert_eq!(statistics.total_lines, 0);
        assert_eq!(statistics.code_lines, 1);
    }

    #[test]
    fn empty_input_counts_nothing() {
        let statistics = count("");
        assert_eq!(statistics, super::FileStatistics::default());
    }

    // === Pattern occurrence totals ===

    #[test]
    fn pattern_counter_respects_region_subset() {
        let patterns = PatternSet::from_texts(["foo"]);
        let mut scanner = Scanner::new(c_like());
        let mut sink = PatternCounter::new(&patterns, RegionSubset::CODE);
        #[allow(clippy::unwrap_used, reason = "in-memory reads cannot fail")]
        scanner
            .scan("foo bar // foo\nfoo again\n".as_bytes(), &mut sink)
            .unwrap();
        // Two in code, the comment occurrence excluded.
        assert_eq!(sink.into_counts(), vec![2]);
    }

    #[test]
    fn pattern_counter_in_comments() {
        let patterns = PatternSet::from_texts(["foo"]);
        let mut scanner = Scanner::new(c_like());
        let mut sink = PatternCounter::new(&patterns, RegionSubset::COMMENT);
        #[allow(clippy::unwrap_used, reason = "in-memory reads cannot fail")]
        scanner
            .scan("foo // foo foo\n".as_bytes(), &mut sink)
            .unwrap();
        assert_eq!(sink.into_counts(), vec![2]);
    }
}
