//! Per-file analysis passes.
//!
//! Files fan out across rayon workers; each worker owns its scanner,
//! window and rule machine and contributes rows to the shared document
//! under its write lock. Within one file rows are emitted in discovery
//! order; across files no order is guaranteed.

use std::fs::File;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::debug;

use sift_scan::{
    count_rows, Counter, FlushCause, LineMatcher, MatchFinder, PatternCounter, PatternSet, Region,
    RegexPatterns, ScanSink, Scanner,
};
use sift_value::Value;

use crate::document::Document;
use crate::options::Options;
use crate::rulesets::{extension_of, machine_for_extension};

/// Register harvested files in the document's file table; returns
/// `(key, path)` pairs for the passes.
pub fn register_files(document: &Document, files: Vec<PathBuf>) -> Vec<(u64, PathBuf)> {
    let mut table = document.files.write();
    files
        .into_iter()
        .enumerate()
        .map(|(index, path)| {
            let key = index as u64 + 1;
            let row = table.row_add();
            let _ = table.cell_set(row, "key", Value::from(key));
            let _ = table.cell_set(row, "filename", Value::from(path.to_string_lossy().into_owned()));
            (key, path)
        })
        .collect()
}

/// Forwards scan events to the line counter and, when patterns are
/// being counted, to the pattern tally as well.
struct CountSinks<'a> {
    counter: Counter,
    patterns: Option<PatternCounter<'a>>,
}

impl ScanSink for CountSinks<'_> {
    fn code_flush(&mut self, text: &[u8], row: u64, cause: FlushCause) {
        self.counter.code_flush(text, row, cause);
        if let Some(patterns) = &mut self.patterns {
            patterns.code_flush(text, row, cause);
        }
    }

    fn region_enter(&mut self, region: Region, row: u64) {
        self.counter.region_enter(region, row);
        if let Some(patterns) = &mut self.patterns {
            patterns.region_enter(region, row);
        }
    }

    fn region_text(&mut self, region: Region, text: &[u8], row: u64, terminal: bool) {
        self.counter.region_text(region, text, row, terminal);
        if let Some(patterns) = &mut self.patterns {
            patterns.region_text(region, text, row, terminal);
        }
    }
}

/// Collect line statistics (and optional pattern occurrence totals)
/// for every file.
pub fn run_count_pass(
    document: &Document,
    options: &Options,
    files: &[(u64, PathBuf)],
    patterns: Option<&PatternSet>,
) {
    files.par_iter().for_each(|(key, path)| {
        count_one_file(document, options, *key, path, patterns);
    });
}

fn count_one_file(
    document: &Document,
    options: &Options,
    key: u64,
    path: &Path,
    patterns: Option<&PatternSet>,
) {
    let filename = path.to_string_lossy().into_owned();
    let reader = match File::open(path) {
        Ok(reader) => reader,
        Err(error) => {
            document.add_error(format!("failed to open {filename}: {error}"));
            return;
        }
    };

    let machine = machine_for_extension(&extension_of(path));
    if machine.is_empty() {
        // No rule set for this file type: only total lines are known.
        match count_rows(reader) {
            Ok(total) => {
                let mut table = document.counts.write();
                let row = table.row_add();
                let _ = table.cell_set(row, "key", Value::from(key));
                let _ = table.cell_set(row, "filename", Value::from(filename));
                let _ = table.cell_set(row, "count", Value::from(total));
            }
            Err(error) => document.add_error(format!("{filename}: {error}")),
        }
        return;
    }

    let mut scanner = Scanner::new(machine);
    let mut sinks = CountSinks {
        counter: Counter::new(),
        patterns: patterns.map(|set| PatternCounter::new(set, options.state)),
    };
    let summary = match scanner.scan(reader, &mut sinks) {
        Ok(summary) => summary,
        Err(error) => {
            document.add_error(format!("{filename}: {error}"));
            return;
        }
    };
    if let Some(region) = summary.unterminated {
        document.add_error(format!("{filename}: unterminated {} at end of file", region.name()));
    }

    let mut statistics = sinks.counter.into_statistics();
    statistics.total_lines = summary.total_lines;
    debug!(
        file = %filename,
        lines = statistics.total_lines,
        code = statistics.code_lines,
        "counted"
    );

    let mut table = document.counts.write();
    let row = table.row_add();
    let _ = table.cell_set(row, "key", Value::from(key));
    let _ = table.cell_set(row, "filename", Value::from(filename));
    let _ = table.cell_set(row, "count", Value::from(statistics.total_lines));
    let _ = table.cell_set(row, "code", Value::from(statistics.code_lines));
    let _ = table.cell_set(row, "characters", Value::from(statistics.code_characters));
    let _ = table.cell_set(row, "comment", Value::from(statistics.comment_segments));
    let _ = table.cell_set(row, "string", Value::from(statistics.string_segments));
    if let (Some(set), Some(sink)) = (patterns, sinks.patterns) {
        for (index, count) in sink.into_counts().into_iter().enumerate() {
            if let Some(pattern) = set.get(index) {
                let _ = table.cell_set(row, pattern.text().as_str(), Value::from(count));
            }
        }
    }
}

/// Search strategy handed to the list pass.
pub enum ListPatterns {
    Literal(PatternSet),
    Regex(RegexPatterns),
}

/// Extract matching lines from every file into the document line list.
pub fn run_list_pass(
    document: &Document,
    options: &Options,
    files: &[(u64, PathBuf)],
    patterns: &ListPatterns,
) {
    files.par_iter().for_each(|(key, path)| {
        list_one_file(document, options, *key, path, patterns);
    });
}

fn list_one_file(
    document: &Document,
    options: &Options,
    key: u64,
    path: &Path,
    patterns: &ListPatterns,
) {
    let filename = path.to_string_lossy().into_owned();
    let reader = match File::open(path) {
        Ok(reader) => reader,
        Err(error) => {
            document.add_error(format!("failed to open {filename}: {error}"));
            return;
        }
    };

    let machine = machine_for_extension(&extension_of(path));
    if machine.is_empty() {
        debug!(file = %filename, "no rule set, skipped by line matcher");
        return;
    }

    let finder = match patterns {
        ListPatterns::Literal(set) => MatchFinder::Literal(set),
        ListPatterns::Regex(set) => MatchFinder::Regex(set),
    };
    let mut local = sift_scan::line_list_table();
    let mut matcher = LineMatcher::new(finder, options.state, &mut local, key, &filename);
    let mut scanner = Scanner::new(machine);
    if let Err(error) = scanner.scan(reader, &mut matcher) {
        document.add_error(format!("{filename}: {error}"));
        return;
    }

    if local.is_empty() {
        return;
    }
    // Merge under the write lock, re-keying rows globally.
    let mut global = document.line_list.write();
    for row in 0..local.row_count() {
        let mut values = local.row_values(row);
        values[0] = Value::from(global.row_count() as u64 + 1);
        let _ = global.row_push(&values);
    }
}
