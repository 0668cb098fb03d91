//! Region rules and the marker state machine.
//!
//! A [`RegionRule`] pairs an open marker with a close marker and an
//! optional escape that guards the close. The [`RegionMachine`] holds an
//! ordered rule list plus a 256-entry hint table over the first byte of
//! every open marker, so byte-level scanning rejects most positions with
//! a single table load before any multi-byte comparison.
//!
//! Exactly one rule is active at a time. Deactivation is *manual*: the
//! scanner asks whether the close marker matches (escape-aware) and runs
//! its end-of-region action before clearing the active slot.

use crate::region::Region;

/// One open/close/escape rule.
///
/// `open` is never empty. `close` may equal `open` (symmetric delimiters
/// such as `"`). `escape` applies only to the close marker.
#[derive(Clone, Debug)]
pub struct RegionRule {
    region: Region,
    open: Vec<u8>,
    close: Vec<u8>,
    escape: Option<Vec<u8>>,
}

impl RegionRule {
    /// Rule without an escape sequence.
    pub fn new(region: Region, open: impl Into<Vec<u8>>, close: impl Into<Vec<u8>>) -> Self {
        let open = open.into();
        debug_assert!(!open.is_empty(), "open marker must be non-empty");
        Self {
            region,
            open,
            close: close.into(),
            escape: None,
        }
    }

    /// Rule whose close marker can be escaped.
    pub fn with_escape(
        region: Region,
        open: impl Into<Vec<u8>>,
        close: impl Into<Vec<u8>>,
        escape: impl Into<Vec<u8>>,
    ) -> Self {
        let mut rule = Self::new(region, open, close);
        rule.escape = Some(escape.into());
        rule
    }

    #[inline]
    pub fn region(&self) -> Region {
        self.region
    }

    #[inline]
    pub fn open(&self) -> &[u8] {
        &self.open
    }

    #[inline]
    pub fn close(&self) -> &[u8] {
        &self.close
    }

    #[inline]
    pub fn escape(&self) -> Option<&[u8]> {
        self.escape.as_deref()
    }

    /// `true` when `text` begins with this rule's open marker.
    #[inline]
    pub fn matches_open(&self, text: &[u8]) -> bool {
        text.starts_with(&self.open)
    }

    /// `true` when `text` begins with this rule's close marker.
    #[inline]
    pub fn matches_close(&self, text: &[u8]) -> bool {
        !self.close.is_empty() && text.starts_with(&self.close)
    }

    /// Escape-of-escape test against the bytes preceding the close.
    ///
    /// The close is escaped iff the trailing `escape.len()` bytes of
    /// `before` equal the escape, and the `escape.len()` bytes before
    /// *those* do not — an escaped escape neutralises the escape, which
    /// is what makes `"\\\""` terminate correctly.
    pub fn is_escaped(&self, before: &[u8]) -> bool {
        let Some(escape) = self.escape.as_deref() else {
            return false;
        };
        let width = escape.len();
        if width == 0 || before.len() < width {
            return false;
        }
        if &before[before.len() - width..] != escape {
            return false;
        }
        if before.len() >= 2 * width && &before[before.len() - 2 * width..before.len() - width] == escape {
            return false;
        }
        true
    }
}

/// Ordered rule set with a first-byte hint table and one active slot.
#[derive(Clone, Debug)]
pub struct RegionMachine {
    rules: Vec<RegionRule>,
    /// Non-zero entries flag bytes that can begin an open marker.
    hint: [u8; 256],
    active: Option<usize>,
}

impl Default for RegionMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl RegionMachine {
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            hint: [0u8; 256],
            active: None,
        }
    }

    /// Append a rule; rules are tried in insertion order, so a rule whose
    /// open marker prefixes another (`"` vs `"""`) must come after it.
    pub fn add(&mut self, rule: RegionRule) {
        self.hint[usize::from(rule.open()[0])] = 1;
        self.rules.push(rule);
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    #[inline]
    pub fn rules(&self) -> &[RegionRule] {
        &self.rules
    }

    /// O(1) first-byte reject filter.
    #[inline]
    pub fn hint(&self, byte: u8) -> bool {
        self.hint[usize::from(byte)] != 0
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// The active rule, if any.
    pub fn active_rule(&self) -> Option<&RegionRule> {
        self.active.map(|index| &self.rules[index])
    }

    /// Region of the active rule, [`Region::None`] when outside.
    pub fn active_region(&self) -> Region {
        self.active_rule().map_or(Region::None, RegionRule::region)
    }

    /// Index of the first rule whose open marker begins `text`.
    pub fn find_open(&self, text: &[u8]) -> Option<usize> {
        self.rules.iter().position(|rule| rule.matches_open(text))
    }

    /// Try to enter a region at `text`; returns `(rule index, open length)`.
    ///
    /// No-op when a region is already active.
    pub fn activate(&mut self, text: &[u8]) -> Option<(usize, usize)> {
        debug_assert!(self.active.is_none(), "activate while a region is active");
        let index = self.find_open(text)?;
        self.active = Some(index);
        Some((index, self.rules[index].open().len()))
    }

    /// Manual close test: does the active rule's close marker match at
    /// `text`, with `before` being the bytes preceding it (for the
    /// escape look-behind)?
    ///
    /// Returns the close length without clearing the active slot, so the
    /// caller can run its end-of-region action first and then call
    /// [`RegionMachine::clear`].
    pub fn check_close(&self, text: &[u8], before: &[u8]) -> Option<usize> {
        let rule = self.active_rule()?;
        if rule.matches_close(text) && !rule.is_escaped(before) {
            Some(rule.close().len())
        } else {
            None
        }
    }

    /// Close test that also clears the active slot on a match.
    pub fn deactivate(&mut self, text: &[u8], before: &[u8]) -> Option<usize> {
        let length = self.check_close(text, before)?;
        self.active = None;
        Some(length)
    }

    /// Leave the active region (pairs with [`RegionMachine::check_close`]).
    #[inline]
    pub fn clear(&mut self) {
        self.active = None;
    }

    /// First rule start in `text`: `(rule index, byte position)`.
    ///
    /// Positions are advanced one byte at a time when no hint fires or no
    /// open marker matches.
    pub fn find_first(&self, text: &[u8]) -> Option<(usize, usize)> {
        for position in 0..text.len() {
            if self.hint(text[position]) {
                if let Some(index) = self.find_open(&text[position..]) {
                    return Some((index, position));
                }
            }
        }
        None
    }

    /// Smallest window size for which region transitions are independent
    /// of the window geometry: the longest `open + close + escape` over
    /// the rule set.
    pub fn minimum_window(&self) -> usize {
        self.rules
            .iter()
            .map(|rule| {
                rule.open().len() + rule.close().len() + rule.escape().map_or(0, <[u8]>::len)
            })
            .max()
            .unwrap_or(0)
    }
}
