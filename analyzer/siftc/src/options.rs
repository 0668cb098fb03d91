//! Command-line options.
//!
//! Options are `key=value` words, order-free: `source=src;tests`
//! `recursive=4` (or the bare flag `R`, which implies 16), `filter=*.rs`,
//! `pattern=TODO,FIXME`, `state=code|comment|string|all`, `sort=count`,
//! `stats=sum,count,relation`, `max=50`, `output=report.csv`, `print`,
//! `table=name`, `vs`, `expression=…`, `ignore=.siftignore`.

use std::path::PathBuf;

use sift_scan::RegionSubset;

/// Post-processing statistics toggles.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stat {
    /// Append a terminal sum row over the numeric columns.
    Sum,
    /// Report the row count.
    Count,
    /// Add a percent-of-total column for the main count.
    Relation,
}

impl Stat {
    fn parse(word: &str) -> Option<Self> {
        Some(match word {
            "sum" => Stat::Sum,
            "count" => Stat::Count,
            "relation" => Stat::Relation,
            _ => return None,
        })
    }
}

/// Parsed CLI options.
#[derive(Clone, Debug)]
pub struct Options {
    /// Files or directories to analyse (`source=`, `;`-separated).
    pub sources: Vec<PathBuf>,
    /// Subtree depth; 0 scans only the listed entries.
    pub recursive: u32,
    /// Filename wildcards (`filter=`, `;`-separated).
    pub filters: Vec<String>,
    /// Literal patterns (`pattern=`, `,`-separated).
    pub patterns: Vec<String>,
    /// Regex patterns (`rpattern=`, `,`-separated).
    pub regex_patterns: Vec<String>,
    /// Region subset searched by the matchers.
    pub state: RegionSubset,
    /// Column to sort the result by.
    pub sort: Option<String>,
    /// Requested statistics.
    pub stats: Vec<Stat>,
    /// Row limit for output.
    pub max: Option<usize>,
    /// Output file; the extension picks the format (.csv, .sql).
    pub output: Option<PathBuf>,
    /// Print to stdout even when `output=` is set.
    pub print: bool,
    /// Table name used for SQL output.
    pub table_name: String,
    /// Visual Studio flavoured line output (`file(row,col): text`).
    pub visual_studio: bool,
    /// Filter/transform expression.
    pub expression: Option<String>,
    /// Ignore-list file.
    pub ignore: Option<PathBuf>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            sources: Vec::new(),
            recursive: 0,
            filters: Vec::new(),
            patterns: Vec::new(),
            regex_patterns: Vec::new(),
            state: RegionSubset::CODE,
            sort: None,
            stats: Vec::new(),
            max: None,
            output: None,
            print: false,
            table_name: "result".to_string(),
            visual_studio: false,
            expression: None,
            ignore: None,
        }
    }
}

impl Options {
    /// Parse `key=value` words; unknown keys and malformed values are
    /// errors so typos do not silently change a run.
    pub fn parse(words: &[String]) -> Result<Self, String> {
        let mut options = Options::default();
        for word in words {
            match word.as_str() {
                "R" => {
                    options.recursive = 16;
                    continue;
                }
                "print" => {
                    options.print = true;
                    continue;
                }
                "vs" => {
                    options.visual_studio = true;
                    continue;
                }
                _ => {}
            }
            let Some((key, value)) = word.split_once('=') else {
                return Err(format!("unrecognised argument `{word}`"));
            };
            match key {
                "source" => {
                    options
                        .sources
                        .extend(value.split(';').filter(|s| !s.is_empty()).map(PathBuf::from));
                }
                "recursive" => {
                    options.recursive = value
                        .parse()
                        .map_err(|_| format!("recursive wants a number, got `{value}`"))?;
                }
                "filter" => {
                    options
                        .filters
                        .extend(value.split(';').filter(|s| !s.is_empty()).map(String::from));
                }
                "pattern" => {
                    options
                        .patterns
                        .extend(value.split(',').filter(|s| !s.is_empty()).map(String::from));
                }
                "rpattern" => {
                    options
                        .regex_patterns
                        .extend(value.split(',').filter(|s| !s.is_empty()).map(String::from));
                }
                "state" => {
                    options.state = RegionSubset::parse(value)
                        .ok_or_else(|| format!("state wants code|comment|string|all, got `{value}`"))?;
                }
                "sort" => options.sort = Some(value.to_string()),
                "stats" => {
                    for stat in value.split(',').filter(|s| !s.is_empty()) {
                        options.stats.push(
                            Stat::parse(stat)
                                .ok_or_else(|| format!("stats wants sum|count|relation, got `{stat}`"))?,
                        );
                    }
                }
                "max" => {
                    options.max = Some(
                        value
                            .parse()
                            .map_err(|_| format!("max wants a number, got `{value}`"))?,
                    );
                }
                "output" => options.output = Some(PathBuf::from(value)),
                "table" => options.table_name = value.to_string(),
                "expression" => options.expression = Some(value.to_string()),
                "ignore" => options.ignore = Some(PathBuf::from(value)),
                _ => return Err(format!("unknown option `{key}`")),
            }
        }
        if options.sources.is_empty() {
            return Err("source=<path> is required".to_string());
        }
        Ok(options)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "tests assert on known-good inputs")]
mod tests {
    use super::{Options, Stat};
    use pretty_assertions::assert_eq;
    use sift_scan::RegionSubset;

    fn parse(words: &[&str]) -> Result<Options, String> {
        let words: Vec<String> = words.iter().map(ToString::to_string).collect();
        Options::parse(&words)
    }

    #[test]
    fn full_option_set() {
        #[allow(clippy::unwrap_used, reason = "options are valid")]
        let options = parse(&[
            "source=src;tests",
            "recursive=4",
            "filter=*.rs;*.toml",
            "pattern=TODO,FIXME",
            "state=comment",
            "sort=count",
            "stats=sum,count",
            "max=50",
            "output=report.csv",
            "print",
            "table=files",
            "vs",
        ])
        .unwrap();
        assert_eq!(options.sources.len(), 2);
        assert_eq!(options.recursive, 4);
        assert_eq!(options.filters, vec!["*.rs", "*.toml"]);
        assert_eq!(options.patterns, vec!["TODO", "FIXME"]);
        assert_eq!(options.state, RegionSubset::COMMENT);
        assert_eq!(options.stats, vec![Stat::Sum, Stat::Count]);
        assert_eq!(options.max, Some(50));
        assert!(options.print);
        assert!(options.visual_studio);
        assert_eq!(options.table_name, "files");
    }

    #[test]
    fn bare_r_implies_sixteen() {
        #[allow(clippy::unwrap_used, reason = "options are valid")]
        let options = parse(&["source=.", "R"]).unwrap();
        assert_eq!(options.recursive, 16);
    }

    #[test]
    fn source_is_required() {
        assert!(parse(&["recursive=2"]).is_err());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(parse(&["source=.", "patern=TODO"]).is_err());
        assert!(parse(&["source=.", "state=everything"]).is_err());
    }
}
