//! End-to-end pipeline tests: harvest, scan, tables, expressions, output.

#![allow(clippy::unwrap_used, reason = "tests assert on known-good inputs")]

use std::fs;

use pretty_assertions::assert_eq;

use sift_scan::PatternSet;
use sift_table::Aggregates;
use sift_value::Value;
use siftc::document::Document;
use siftc::expression::filter_table;
use siftc::harvest::harvest;
use siftc::ignore::IgnoreList;
use siftc::options::Options;
use siftc::output::render_csv;
use siftc::passes::{register_files, run_count_pass, run_list_pass, ListPatterns};
use siftc::postprocess::sort_table;

fn options_for(root: &std::path::Path, extra: &[&str]) -> Options {
    let mut words = vec![format!("source={}", root.display()), "R".to_string()];
    words.extend(extra.iter().map(ToString::to_string));
    #[allow(clippy::unwrap_used, reason = "options are valid")]
    Options::parse(&words).unwrap()
}

fn sample_tree() -> tempfile::TempDir {
    #[allow(clippy::unwrap_used, reason = "tempdir creation succeeds")]
    let dir = tempfile::tempdir().unwrap();
    let files: &[(&str, &str)] = &[
        (
            "src/main.rs",
            "fn main() {\n    // entry TODO: tidy\n    println!(\"hi\");\n}\n",
        ),
        (
            "src/lib.c",
            "int x = 0; // comment\nint y = 1;\n/* block\nspans lines */\nchar* s = \"TODO in string\";\n",
        ),
        ("script.py", "# TODO later\nvalue = 1\n"),
        ("notes.txt", "one\ntwo\nthree\n"),
    ];
    for (relative, content) in files {
        let path = dir.path().join(relative);
        if let Some(parent) = path.parent() {
            #[allow(clippy::unwrap_used, reason = "test directories are writable")]
            fs::create_dir_all(parent).unwrap();
        }
        #[allow(clippy::unwrap_used, reason = "test files are writable")]
        fs::write(path, content).unwrap();
    }
    dir
}

fn counted_document(dir: &std::path::Path, extra: &[&str]) -> (Options, Document) {
    let options = options_for(dir, extra);
    let document = Document::new(&[]);
    let files = register_files(&document, harvest(&options, &IgnoreList::default()));
    run_count_pass(&document, &options, &files, None);
    (options, document)
}

#[test]
fn count_pass_over_a_mixed_tree() {
    let dir = sample_tree();
    let (_, document) = counted_document(dir.path(), &[]);
    let counts = document.counts.read();
    assert_eq!(counts.row_count(), 4);

    let row_for = |suffix: &str| {
        (0..counts.row_count())
            .find(|&row| counts.cell_get(row, "filename").as_string().ends_with(suffix))
    };

    #[allow(clippy::unwrap_used, reason = "row exists")]
    let c_row = row_for("lib.c").unwrap();
    assert_eq!(counts.cell_get(c_row, "count"), Value::Int(5));
    assert_eq!(counts.cell_get(c_row, "code"), Value::Int(3));
    assert_eq!(counts.cell_get(c_row, "comment"), Value::Int(2));
    assert_eq!(counts.cell_get(c_row, "string"), Value::Int(1));

    // Unknown file type: rows only.
    #[allow(clippy::unwrap_used, reason = "row exists")]
    let txt_row = row_for("notes.txt").unwrap();
    assert_eq!(counts.cell_get(txt_row, "count"), Value::Int(3));
    assert_eq!(counts.cell_get(txt_row, "code"), Value::Null);

    // Aggregates over the shared table.
    assert_eq!(counts.count_not_null("code", ..), 3);
}

#[test]
fn list_pass_finds_patterns_in_selected_regions() {
    let dir = sample_tree();
    let options = options_for(dir.path(), &["pattern=TODO", "state=comment"]);
    let document = Document::new(&[]);
    let files = register_files(&document, harvest(&options, &IgnoreList::default()));
    let patterns = ListPatterns::Literal(PatternSet::from_texts(["TODO"]));
    run_list_pass(&document, &options, &files, &patterns);

    let lines = document.line_list.read();
    // main.rs comment + script.py comment; the string occurrence in
    // lib.c is outside the comment subset.
    assert_eq!(lines.row_count(), 2);
    for row in 0..lines.row_count() {
        assert_eq!(lines.cell_get(row, "pattern"), Value::Str("TODO".into()));
    }
}

#[test]
fn string_subset_finds_the_string_occurrence() {
    let dir = sample_tree();
    let options = options_for(dir.path(), &["pattern=TODO", "state=string"]);
    let document = Document::new(&[]);
    let files = register_files(&document, harvest(&options, &IgnoreList::default()));
    let patterns = ListPatterns::Literal(PatternSet::from_texts(["TODO"]));
    run_list_pass(&document, &options, &files, &patterns);

    let lines = document.line_list.read();
    assert_eq!(lines.row_count(), 1);
    assert!(lines.cell_get(0, "filename").as_string().ends_with("lib.c"));
    assert_eq!(lines.cell_get(0, "row"), Value::Int(5));
}

#[test]
fn filter_and_sort_compose_over_the_counter_table() {
    let dir = sample_tree();
    let (_, document) = counted_document(dir.path(), &[]);
    let counts = document.counts.read().clone();

    #[allow(clippy::unwrap_used, reason = "expression compiles")]
    let (kept, messages) = filter_table(&counts, "is_not_null(code) and count >= 2").unwrap();
    assert!(messages.is_empty());
    assert_eq!(kept.row_count(), 3);

    #[allow(clippy::unwrap_used, reason = "column exists")]
    let sorted = sort_table(&kept, "count").unwrap();
    let first = sorted.cell_get(0, "count").as_integer();
    let last = sorted.cell_get(sorted.row_count() - 1, "count").as_integer();
    assert!(first >= last);
}

#[test]
fn csv_round_trips_through_the_renderer() {
    let dir = sample_tree();
    let (_, document) = counted_document(dir.path(), &[]);
    let counts = document.counts.read();
    let csv = render_csv(&counts, None);
    let mut lines = csv.lines();
    assert_eq!(
        lines.next(),
        Some("key,filename,count,code,characters,comment,string")
    );
    assert_eq!(csv.lines().count(), counts.row_count() + 1);
}

#[test]
fn ignore_list_excludes_matching_paths() {
    let dir = sample_tree();
    let options = options_for(dir.path(), &[]);
    let ignore = IgnoreList::parse("*.py\nnotes.*\n");
    let files = harvest(&options, &ignore);
    assert_eq!(files.len(), 2);
    assert!(files.iter().all(|path| {
        let name = path.to_string_lossy();
        name.ends_with(".rs") || name.ends_with(".c")
    }));
}
