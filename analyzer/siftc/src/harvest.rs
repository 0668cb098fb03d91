//! File enumeration.
//!
//! Expands the `source=` entries into a flat file list: files are taken
//! as-is, directories are walked to the requested depth, filename
//! filters and the ignore list prune as the walk goes. The walk is
//! deterministic (directory entries are sorted) so runs are
//! reproducible.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::ignore::{wildcard_match, IgnoreList};
use crate::options::Options;

/// Expand the option sources into concrete file paths.
pub fn harvest(options: &Options, ignore: &IgnoreList) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for source in &options.sources {
        if source.is_file() {
            files.push(source.clone());
        } else if source.is_dir() {
            walk(source, source, options, ignore, options.recursive, &mut files);
        } else {
            warn!(path = %source.display(), "source not found");
        }
    }
    files
}

fn walk(
    root: &Path,
    directory: &Path,
    options: &Options,
    ignore: &IgnoreList,
    depth_left: u32,
    files: &mut Vec<PathBuf>,
) {
    let entries = match fs::read_dir(directory) {
        Ok(entries) => entries,
        Err(error) => {
            warn!(path = %directory.display(), %error, "cannot read directory");
            return;
        }
    };
    let mut entries: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .collect();
    entries.sort();

    for path in entries {
        let relative = path
            .strip_prefix(root)
            .unwrap_or(&path)
            .to_string_lossy()
            .replace('\\', "/");
        if ignore.matches(&relative) {
            continue;
        }
        if path.is_dir() {
            if depth_left > 0 {
                walk(root, &path, options, ignore, depth_left - 1, files);
            }
        } else if passes_filters(&path, &options.filters) {
            files.push(path);
        }
    }
}

fn passes_filters(path: &Path, filters: &[String]) -> bool {
    if filters.is_empty() {
        return true;
    }
    let name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("");
    filters.iter().any(|filter| wildcard_match(filter, name))
}
