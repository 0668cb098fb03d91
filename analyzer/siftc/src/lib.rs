//! sift — source tree analysis tool.
//!
//! The CLI shell around the analysis engine: option parsing, the
//! extension-to-ruleset registry, ignore lists, file harvesting, the
//! rayon-fanned passes over the shared document, expression
//! post-processing, and result rendering.
//!
//! The library surface exists for the binary and the integration tests;
//! the commands are the real API.

pub mod document;
pub mod expression;
pub mod harvest;
pub mod ignore;
pub mod options;
pub mod output;
pub mod passes;
pub mod postprocess;
pub mod rulesets;
pub mod tracing_setup;

use std::path::PathBuf;

use tracing::info;

use sift_scan::{PatternSet, RegexPatterns};
use sift_table::Table;

use crate::document::Document;
use crate::expression::{filter_table, run_snippet_pass};
use crate::ignore::IgnoreList;
use crate::options::{Options, Stat};
use crate::passes::{register_files, run_count_pass, run_list_pass, ListPatterns};

/// Shared front half of every command: options, ignore list, harvest.
fn prepare(words: &[String]) -> Result<(Options, Vec<PathBuf>), String> {
    let options = Options::parse(words)?;
    let ignore = match &options.ignore {
        Some(path) => IgnoreList::load(path)
            .map_err(|error| format!("cannot read ignore file {}: {error}", path.display()))?,
        None => IgnoreList::default(),
    };
    let files = harvest::harvest(&options, &ignore);
    if files.is_empty() {
        return Err("no files matched".to_string());
    }
    info!(files = files.len(), "harvested");
    Ok((options, files))
}

/// Shared back half: filter, sort, emit, stats, recorded errors.
fn finish(mut table: Table, options: &Options, document: &Document) -> Result<(), String> {
    if let Some(expression) = &options.expression {
        let (kept, messages) = filter_table(&table, expression)?;
        for message in messages {
            eprintln!("warning: {message}");
        }
        table = kept;
    }
    if options.stats.contains(&Stat::Relation) {
        table = postprocess::apply_relation(&table, "count")?;
    }
    if let Some(column) = &options.sort {
        table = postprocess::sort_table(&table, column)?;
    }
    if options.stats.contains(&Stat::Sum) {
        postprocess::append_sums(&mut table).map_err(|error| error.to_string())?;
    }

    output::emit(&table, options)?;
    if options.stats.contains(&Stat::Count) {
        println!("rows: {}", table.row_count());
    }
    for error in document.errors() {
        eprintln!("warning: {error}");
    }
    Ok(())
}

/// `sift count` — per-file line statistics, optional per-pattern
/// occurrence columns.
pub fn command_count(words: &[String]) -> Result<(), String> {
    let (options, files) = prepare(words)?;

    let patterns = (!options.patterns.is_empty()).then(|| {
        PatternSet::from_texts(&options.patterns)
    });
    let pattern_names: Vec<String> = patterns
        .as_ref()
        .map(|set| set.iter().map(sift_scan::Pattern::text).collect())
        .unwrap_or_default();

    let document = Document::new(&pattern_names);
    let files = register_files(&document, files);
    run_count_pass(&document, &options, &files, patterns.as_ref());

    let mut table = document.counts.read().clone();
    if !pattern_names.is_empty() {
        // Drop files in which no pattern occurred at all.
        let selected: Vec<sift_table::ColumnRef<'_>> = pattern_names
            .iter()
            .map(|name| sift_table::ColumnRef::Name(name.as_str()))
            .collect();
        table
            .prune_zero_rows(&selected)
            .map_err(|error| error.to_string())?;
    }
    finish(table, &options, &document)
}

/// `sift list` — matching lines with positions.
pub fn command_list(words: &[String]) -> Result<(), String> {
    let (options, files) = prepare(words)?;
    let patterns = list_patterns(&options)?;

    let document = Document::new(&[]);
    let files = register_files(&document, files);
    run_list_pass(&document, &options, &files, &patterns);

    let table = document.line_list.read().clone();
    finish(table, &options, &document)
}

/// `sift snippet` — run a transformation expression over the matching
/// lines and collect the synthesised rows.
pub fn command_snippet(words: &[String]) -> Result<(), String> {
    let (options, files) = prepare(words)?;
    let expression = options
        .expression
        .clone()
        .ok_or_else(|| "snippet needs expression=<…>".to_string())?;
    let patterns = list_patterns(&options)?;

    let document = Document::new(&[]);
    let files = register_files(&document, files);
    run_list_pass(&document, &options, &files, &patterns);

    let line_list = document.line_list.read().clone();
    let mut snippets = document.snippets.write();
    let messages = run_snippet_pass(&line_list, &mut snippets, &expression)?;
    for message in messages {
        eprintln!("warning: {message}");
    }

    // The snippet table is the result; the generic post-processing
    // (filter/sort) was already spent on producing it.
    let table = snippets.clone();
    drop(snippets);
    output::emit(&table, &options)?;
    for error in document.errors() {
        eprintln!("warning: {error}");
    }
    Ok(())
}

/// `sift eval` — evaluate one expression and print the result.
pub fn command_eval(expression: &str) -> Result<(), String> {
    let mut runtime = sift_expr::Runtime::with_standard_methods();
    let value =
        sift_expr::evaluate_expression(expression, &mut runtime).map_err(|error| error.to_string())?;
    for message in runtime.take_errors() {
        eprintln!("warning: {message}");
    }
    println!("{value}");
    Ok(())
}

fn list_patterns(options: &Options) -> Result<ListPatterns, String> {
    if !options.patterns.is_empty() {
        Ok(ListPatterns::Literal(PatternSet::from_texts(&options.patterns)))
    } else if !options.regex_patterns.is_empty() {
        let compiled = RegexPatterns::compile(&options.regex_patterns)
            .map_err(|error| format!("bad regex: {error}"))?;
        Ok(ListPatterns::Regex(compiled))
    } else {
        Err("pattern=<…> or rpattern=<…> is required".to_string())
    }
}
