//! File extension to region rule set mapping.
//!
//! Every supported extension maps to an ordered rule list. Order
//! matters twice: a rule whose open marker prefixes another (`"""` vs
//! `"`) must come first, and the machine tries rules in insertion
//! order.

use sift_scan::{Region, RegionMachine, RegionRule};

/// Language families with distinct rule sets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Family {
    /// C, C++, C#, Java, JavaScript, TypeScript, Rust, Go.
    CLike,
    /// C++ flavour: C-like plus raw strings.
    Cpp,
    /// Python: hash comments, triple-quoted strings.
    Python,
    /// Shell, Makefile, Ruby: hash comments, plain strings.
    Shell,
    /// SQL: dash comments, single-quoted strings.
    Sql,
}

fn family_of(extension: &str) -> Option<Family> {
    Some(match extension {
        "c" | "h" | "cs" | "java" | "js" | "jsx" | "ts" | "tsx" | "rs" | "go" => Family::CLike,
        "cpp" | "cc" | "cxx" | "hpp" | "hh" | "hxx" | "ipp" => Family::Cpp,
        "py" | "pyi" => Family::Python,
        "sh" | "bash" | "zsh" | "mk" | "makefile" | "rb" | "yml" | "yaml" | "toml" => Family::Shell,
        "sql" => Family::Sql,
        _ => return None,
    })
}

/// Build the region machine for a filename extension.
///
/// Returns an empty machine for unknown extensions; the engine then
/// falls back to plain row counting.
pub fn machine_for_extension(extension: &str) -> RegionMachine {
    let mut machine = RegionMachine::new();
    let Some(family) = family_of(extension.to_ascii_lowercase().as_str()) else {
        return machine;
    };
    match family {
        Family::CLike | Family::Cpp => {
            machine.add(RegionRule::new(Region::LineComment, "//", "\n"));
            machine.add(RegionRule::new(Region::BlockComment, "/*", "*/"));
            machine.add(RegionRule::with_escape(Region::Str, "\"", "\"", "\\"));
            if family == Family::Cpp {
                machine.add(RegionRule::new(Region::RawString, "R\"(", ")\""));
            }
        }
        Family::Python => {
            machine.add(RegionRule::new(Region::LineComment, "#", "\n"));
            machine.add(RegionRule::new(Region::RawString, "\"\"\"", "\"\"\""));
            machine.add(RegionRule::new(Region::RawString, "'''", "'''"));
            machine.add(RegionRule::with_escape(Region::Str, "\"", "\"", "\\"));
            machine.add(RegionRule::with_escape(Region::Str, "'", "'", "\\"));
        }
        Family::Shell => {
            machine.add(RegionRule::new(Region::LineComment, "#", "\n"));
            machine.add(RegionRule::with_escape(Region::Str, "\"", "\"", "\\"));
            machine.add(RegionRule::new(Region::Str, "'", "'"));
        }
        Family::Sql => {
            machine.add(RegionRule::new(Region::LineComment, "--", "\n"));
            machine.add(RegionRule::new(Region::BlockComment, "/*", "*/"));
            machine.add(RegionRule::new(Region::Str, "'", "'"));
        }
    }
    machine
}

/// Extension of a path, lowercased; `makefile` maps files without an
/// extension named like a makefile.
pub fn extension_of(path: &std::path::Path) -> String {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(extension) => extension.to_ascii_lowercase(),
        None => {
            let name = path
                .file_name()
                .and_then(|name| name.to_str())
                .unwrap_or("")
                .to_ascii_lowercase();
            if name == "makefile" {
                "makefile".to_string()
            } else {
                String::new()
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "tests assert on known-good inputs")]
mod tests {
    use super::{extension_of, machine_for_extension};
    use std::path::Path;

    #[test]
    fn c_like_extensions_share_rules() {
        for extension in ["c", "rs", "go", "java", "ts"] {
            let machine = machine_for_extension(extension);
            assert_eq!(machine.rules().len(), 3, "extension {extension}");
        }
    }

    #[test]
    fn cpp_adds_raw_strings() {
        let machine = machine_for_extension("cpp");
        assert_eq!(machine.rules().len(), 4);
    }

    #[test]
    fn python_triple_quotes_come_before_singles() {
        let machine = machine_for_extension("py");
        let opens: Vec<&[u8]> = machine.rules().iter().map(|rule| rule.open()).collect();
        let triple = opens.iter().position(|open| *open == b"\"\"\"");
        let single = opens.iter().position(|open| *open == b"\"");
        assert!(triple < single);
    }

    #[test]
    fn unknown_extension_gives_empty_machine() {
        assert!(machine_for_extension("bin").is_empty());
        assert!(machine_for_extension("").is_empty());
    }

    #[test]
    fn extension_resolution() {
        assert_eq!(extension_of(Path::new("src/main.RS")), "rs");
        assert_eq!(extension_of(Path::new("Makefile")), "makefile");
        assert_eq!(extension_of(Path::new("README")), "");
    }
}
