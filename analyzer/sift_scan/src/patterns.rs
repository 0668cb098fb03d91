//! Literal and regex pattern sets.
//!
//! A [`PatternSet`] holds literal byte patterns sorted by length
//! descending — a pattern that is a prefix of another never shadows the
//! longer one — plus a 256-entry hint table over first bytes so corpus
//! scanning rejects most positions with one load. [`RegexPatterns`] is
//! the regex sibling built on the host regex engine.

use regex::Regex;

/// One literal pattern with an optional escape guard.
///
/// An occurrence preceded by the escape sequence does not count.
#[derive(Clone, Debug)]
pub struct Pattern {
    bytes: Vec<u8>,
    escape: Option<Vec<u8>>,
}

impl Pattern {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
            escape: None,
        }
    }

    pub fn with_escape(bytes: impl Into<Vec<u8>>, escape: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
            escape: Some(escape.into()),
        }
    }

    #[inline]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Pattern text for reports (patterns are expected to be UTF-8).
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }

    /// `true` when the occurrence at the end of `before` is escaped.
    fn is_escaped(&self, before: &[u8]) -> bool {
        match self.escape.as_deref() {
            Some(escape) if !escape.is_empty() && before.len() >= escape.len() => {
                &before[before.len() - escape.len()..] == escape
            }
            _ => false,
        }
    }
}

/// A match located by [`PatternSet::find_first`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PatternHit {
    /// Byte offset of the match within the searched corpus.
    pub position: usize,
    /// Index of the matched pattern within the set's iteration order.
    pub index: usize,
    /// Matched length in bytes.
    pub length: usize,
}

/// Length-sorted literal pattern set with a first-byte hint table.
#[derive(Clone, Debug)]
pub struct PatternSet {
    /// Sorted by pattern length descending; ties keep insertion order.
    patterns: Vec<Pattern>,
    hint: [u8; 256],
}

impl Default for PatternSet {
    fn default() -> Self {
        Self::new()
    }
}

impl PatternSet {
    pub fn new() -> Self {
        Self {
            patterns: Vec::new(),
            hint: [0u8; 256],
        }
    }

    /// Build a set from literal strings.
    pub fn from_texts<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::new();
        for text in texts {
            set.add(Pattern::new(text.as_ref().as_bytes().to_vec()));
        }
        set
    }

    /// Insert a pattern, keeping the longest-first order.
    ///
    /// Empty patterns are ignored; they can never match.
    pub fn add(&mut self, pattern: Pattern) {
        if pattern.bytes().is_empty() {
            return;
        }
        self.hint[usize::from(pattern.bytes()[0])] = 1;
        let at = self
            .patterns
            .partition_point(|existing| existing.bytes().len() >= pattern.bytes().len());
        self.patterns.insert(at, pattern);
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// Pattern by set index (the index reported in [`PatternHit`]).
    pub fn get(&self, index: usize) -> Option<&Pattern> {
        self.patterns.get(index)
    }

    /// Iterate patterns in set order (longest first).
    pub fn iter(&self) -> impl Iterator<Item = &Pattern> {
        self.patterns.iter()
    }

    #[inline]
    pub fn hint(&self, byte: u8) -> bool {
        self.hint[usize::from(byte)] != 0
    }

    /// First occurrence of any pattern in `corpus`.
    ///
    /// At each position the hint is tested first; on a hit the pattern
    /// list is walked longest-first and the first (longest) match wins.
    pub fn find_first(&self, corpus: &[u8]) -> Option<PatternHit> {
        self.find_from(corpus, 0)
    }

    /// [`PatternSet::find_first`] starting at `offset`.
    pub fn find_from(&self, corpus: &[u8], offset: usize) -> Option<PatternHit> {
        if self.patterns.is_empty() {
            return None;
        }
        for position in offset..corpus.len() {
            if !self.hint(corpus[position]) {
                continue;
            }
            for (index, pattern) in self.patterns.iter().enumerate() {
                if corpus[position..].starts_with(pattern.bytes())
                    && !pattern.is_escaped(&corpus[..position])
                {
                    return Some(PatternHit {
                        position,
                        index,
                        length: pattern.bytes().len(),
                    });
                }
            }
        }
        None
    }

    /// Count every (non-overlapping) occurrence per pattern into `counts`.
    ///
    /// `counts` must have one slot per pattern in set order.
    pub fn count_into(&self, corpus: &[u8], counts: &mut [u64]) {
        debug_assert_eq!(counts.len(), self.patterns.len());
        let mut offset = 0usize;
        while let Some(hit) = self.find_from(corpus, offset) {
            counts[hit.index] += 1;
            offset = hit.position + hit.length.max(1);
        }
    }
}

/// Compiled regex patterns paired with their source text.
#[derive(Clone, Debug, Default)]
pub struct RegexPatterns {
    patterns: Vec<(Regex, String)>,
}

impl RegexPatterns {
    pub fn new(patterns: Vec<(Regex, String)>) -> Self {
        Self { patterns }
    }

    /// Compile a list of pattern sources.
    pub fn compile<I, S>(sources: I) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut patterns = Vec::new();
        for source in sources {
            let source = source.as_ref();
            patterns.push((Regex::new(source)?, source.to_string()));
        }
        Ok(Self { patterns })
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Source text of the pattern at `index`.
    pub fn source(&self, index: usize) -> Option<&str> {
        self.patterns.get(index).map(|(_, text)| text.as_str())
    }

    /// First pattern (in sequence order) matching `text`, with the match
    /// start offset.
    pub fn find_first(&self, text: &str) -> Option<PatternHit> {
        self.patterns.iter().enumerate().find_map(|(index, (regex, _))| {
            regex.find(text).map(|found| PatternHit {
                position: found.start(),
                index,
                length: found.len(),
            })
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "tests assert on known-good inputs")]
mod tests {
    use super::{Pattern, PatternSet, RegexPatterns};
    use pretty_assertions::assert_eq;

    // === Ordering ===

    #[test]
    fn longest_pattern_sorts_first() {
        let set = PatternSet::from_texts(["foo", "foobar", "fo"]);
        let lengths: Vec<usize> = set.iter().map(|p| p.bytes().len()).collect();
        assert_eq!(lengths, vec![6, 3, 2]);
    }

    #[test]
    fn longest_match_wins_at_same_position() {
        let set = PatternSet::from_texts(["foo", "foobar"]);
        let hit = set.find_first(b"say foobar now");
        assert_eq!(hit.map(|h| (h.position, h.length)), Some((4, 6)));
    }

    // === Search ===

    #[test]
    fn first_occurrence_of_any_pattern() {
        let set = PatternSet::from_texts(["bar", "foo"]);
        let hit = set.find_first(b"x bar foo");
        let hit = hit.map(|h| (h.position, set.get(h.index).map(Pattern::text)));
        assert_eq!(hit, Some((2, Some("bar".to_string()))));
    }

    #[test]
    fn empty_corpus_or_set_never_matches() {
        let set = PatternSet::from_texts(["foo"]);
        assert_eq!(set.find_first(b""), None);
        let empty = PatternSet::new();
        assert_eq!(empty.find_first(b"foo"), None);
    }

    #[test]
    fn empty_pattern_is_ignored() {
        let mut set = PatternSet::new();
        set.add(Pattern::new(Vec::new()));
        assert!(set.is_empty());
    }

    #[test]
    fn matching_is_byte_exact() {
        let set = PatternSet::from_texts(["Foo"]);
        assert_eq!(set.find_first(b"foo Foo"), Some(super::PatternHit {
            position: 4,
            index: 0,
            length: 3,
        }));
    }

    #[test]
    fn escaped_occurrence_is_skipped() {
        let mut set = PatternSet::new();
        set.add(Pattern::with_escape("$", "\\"));
        let hit = set.find_first(b"a \\$ b $ c");
        assert_eq!(hit.map(|h| h.position), Some(7));
    }

    // === Counting ===

    #[test]
    fn count_into_tallies_per_pattern() {
        let set = PatternSet::from_texts(["ab", "c"]);
        let mut counts = vec![0u64; set.len()];
        set.count_into(b"ab c ab cc", &mut counts);
        assert_eq!(counts, vec![2, 3]);
    }

    // === Regex flavour ===

    #[test]
    fn regex_reports_first_matching_pattern() {
        #[allow(clippy::unwrap_used, reason = "literal patterns compile")]
        let patterns = RegexPatterns::compile(["qu+x", "fo+"]).unwrap();
        let hit = patterns.find_first("a foo then quux");
        assert_eq!(hit.map(|h| (h.index, h.position, h.length)), Some((0, 11, 4)));
        assert_eq!(patterns.source(0), Some("qu+x"));
    }
}
