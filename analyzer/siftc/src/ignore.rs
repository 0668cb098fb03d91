//! Ignore lists and filename wildcards.
//!
//! An ignore file holds one pattern per line; `#` starts a comment.
//! Wildcards `*` (any run) and `?` (one character) are supported; a
//! leading `/` anchors the pattern at the project root, otherwise it
//! matches any path suffix component.

use std::fs;
use std::io;
use std::path::Path;

/// Glob-lite match: `*` any run, `?` exactly one byte.
pub fn wildcard_match(pattern: &str, text: &str) -> bool {
    let pattern = pattern.as_bytes();
    let text = text.as_bytes();

    // Iterative backtracking over the single `*` resume point.
    let (mut p, mut t) = (0usize, 0usize);
    let (mut star_p, mut star_t): (Option<usize>, usize) = (None, 0);

    while t < text.len() {
        if p < pattern.len() && (pattern[p] == b'?' || pattern[p] == text[t]) {
            p += 1;
            t += 1;
        } else if p < pattern.len() && pattern[p] == b'*' {
            star_p = Some(p);
            star_t = t;
            p += 1;
        } else if let Some(resume) = star_p {
            p = resume + 1;
            star_t += 1;
            t = star_t;
        } else {
            return false;
        }
    }
    while p < pattern.len() && pattern[p] == b'*' {
        p += 1;
    }
    p == pattern.len()
}

/// One ignore rule.
#[derive(Clone, Debug)]
struct IgnoreRule {
    pattern: String,
    /// Leading `/`: match against the root-relative path only.
    anchored: bool,
}

/// Parsed ignore list.
#[derive(Clone, Debug, Default)]
pub struct IgnoreList {
    rules: Vec<IgnoreRule>,
}

impl IgnoreList {
    /// Parse ignore-file content.
    pub fn parse(content: &str) -> Self {
        let mut rules = Vec::new();
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (anchored, pattern) = match line.strip_prefix('/') {
                Some(rest) => (true, rest),
                None => (false, line),
            };
            rules.push(IgnoreRule {
                pattern: pattern.to_string(),
                anchored,
            });
        }
        Self { rules }
    }

    /// Load an ignore file from disk.
    pub fn load(path: &Path) -> io::Result<Self> {
        Ok(Self::parse(&fs::read_to_string(path)?))
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Does any rule match the root-relative path?
    ///
    /// Anchored rules match the whole relative path; unanchored rules
    /// match any single component or the whole path.
    pub fn matches(&self, relative: &str) -> bool {
        let relative = relative.replace('\\', "/");
        self.rules.iter().any(|rule| {
            if rule.anchored {
                wildcard_match(&rule.pattern, &relative)
            } else {
                relative
                    .split('/')
                    .any(|component| wildcard_match(&rule.pattern, component))
                    || wildcard_match(&rule.pattern, &relative)
            }
        })
    }
}
