//! Streaming scanner composing window, region machine and sinks.
//!
//! The scanner owns the buffer plumbing so analyses never see it. Per
//! file it fills the window, classifies bytes through the region
//! machine, and drives a [`ScanSink`] with captured text:
//!
//! - *code flushes* deliver the accumulated code-line text at `'\n'`, at
//!   every region entry, and at EOF, with the cause attached;
//! - *region text* delivers the captured region content — starting with
//!   the open marker, excluding the close marker — at every `'\n'`
//!   inside a multiline region and at the region end.
//!
//! Row numbers are 1-based: the running newline count admitted to the
//! scan range, minus the newlines between the current position and the
//! window end, plus one.

use std::io::{ErrorKind, Read};

use tracing::{debug, warn};

use sift_window::{Window, DEFAULT_WINDOW_SIZE};

use crate::errors::ScanError;
use crate::region::Region;
use crate::rules::RegionMachine;

/// Why a code-line flush happened.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlushCause {
    /// A `'\n'` outside any region ended the line.
    Newline,
    /// A region opened; a non-multiline region terminates the code line,
    /// a multiline region shares it.
    RegionEnter { multiline: bool },
    /// The input ended.
    EndOfFile,
}

/// Receiver for classified text. Implemented by the analyses.
pub trait ScanSink {
    /// Accumulated code-line text (everything outside regions since the
    /// previous flush, excluding the terminating newline).
    fn code_flush(&mut self, text: &[u8], row: u64, cause: FlushCause);

    /// A region was entered at `row`.
    fn region_enter(&mut self, region: Region, row: u64);

    /// Captured region text for one line (or the final segment when
    /// `terminal` is set). The first segment starts with the open marker.
    fn region_text(&mut self, region: Region, text: &[u8], row: u64, terminal: bool);
}

/// Per-file scan result.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScanSummary {
    /// Count of `'\n'` across the whole file, regardless of region.
    pub total_lines: u64,
    /// Region left open at EOF, if any. Recorded, not fatal.
    pub unterminated: Option<Region>,
}

/// Mutable scan bookkeeping, split from the window so the scan loop can
/// borrow the two independently.
#[derive(Debug, Default)]
struct ScanState {
    /// Newlines admitted to the scan range so far.
    lines_admitted: u64,
    /// Code bytes accumulated since the last flush (no newlines).
    code_text: Vec<u8>,
    /// Region bytes accumulated since region entry or the last in-region
    /// newline. Also serves as the escape look-behind.
    region_text: Vec<u8>,
}

/// Streaming scanner for one file at a time.
pub struct Scanner {
    window: Window,
    machine: RegionMachine,
    state: ScanState,
}

impl Scanner {
    /// Scanner with the default window geometry (4 KiB + 50% margin).
    pub fn new(machine: RegionMachine) -> Self {
        Self::with_window(machine, Window::new(DEFAULT_WINDOW_SIZE))
    }

    /// Scanner over an explicit window.
    ///
    /// # Contract
    ///
    /// The window margin must hold the longest rule marker chain
    /// ([`RegionMachine::minimum_window`]) so region transitions are
    /// independent of the window geometry.
    pub fn with_window(machine: RegionMachine, window: Window) -> Self {
        debug_assert!(
            window.capacity() - window.size() >= machine.minimum_window(),
            "window margin too small for the rule set"
        );
        Self {
            window,
            machine,
            state: ScanState::default(),
        }
    }

    /// The rule set driving this scanner.
    pub fn machine(&self) -> &RegionMachine {
        &self.machine
    }

    /// Scan `reader` to exhaustion, driving `sink`.
    pub fn scan<R: Read, S: ScanSink>(
        &mut self,
        mut reader: R,
        sink: &mut S,
    ) -> Result<ScanSummary, ScanError> {
        self.reset();
        debug!(rules = self.machine.rules().len(), "scan start");

        let mut exhausted = fill(&mut self.window, &mut reader)?;
        let mut carry = 0usize;

        while !self.window.is_empty() {
            let admitted = count_newlines(self.window.as_slice());
            self.state.lines_admitted += admitted;

            carry = scan_round(&self.window, &mut self.machine, &mut self.state, sink, carry);

            self.window.rotate();
            if !exhausted {
                exhausted = fill(&mut self.window, &mut reader)?;
            }
        }

        // EOF: terminate whatever is still accumulating.
        let row = self.state.lines_admitted + 1;
        let unterminated = if self.machine.is_active() {
            let region = self.machine.active_region();
            sink.region_text(region, &self.state.region_text, row, true);
            self.machine.clear();
            self.state.region_text.clear();
            warn!(region = region.name(), "unterminated region at end of file");
            Some(region)
        } else {
            sink.code_flush(&self.state.code_text, row, FlushCause::EndOfFile);
            self.state.code_text.clear();
            None
        };

        Ok(ScanSummary {
            total_lines: self.state.lines_admitted,
            unterminated,
        })
    }

    fn reset(&mut self) {
        self.window.clear();
        self.machine.clear();
        self.state.lines_admitted = 0;
        self.state.code_text.clear();
        self.state.region_text.clear();
    }
}

/// One pass over the occupied window region, starting at `start` (the
/// carry-over when a marker consumed bytes past the previous boundary).
/// Returns the new carry.
fn scan_round<S: ScanSink>(
    window: &Window,
    machine: &mut RegionMachine,
    state: &mut ScanState,
    sink: &mut S,
    start: usize,
) -> usize {
    let look = window.lookahead();
    let occupied = window.occupied();
    let mut position = start;

    while position < occupied {
        let byte = look[position];

        if machine.is_active() {
            // Manual deactivate: run the end-of-region action before the
            // active slot is cleared.
            if let Some(close_len) = machine.check_close(&look[position..], &state.region_text) {
                let region = machine.active_region();
                let row = row_at(state.lines_admitted, &look[..occupied], position);
                sink.region_text(region, &state.region_text, row, true);
                machine.clear();
                state.region_text.clear();
                position += close_len;
                continue;
            }
            state.region_text.push(byte);
            if byte == b'\n' {
                let row = row_at(state.lines_admitted, &look[..occupied], position);
                let line_len = state.region_text.len() - 1;
                sink.region_text(machine.active_region(), &state.region_text[..line_len], row, false);
                state.region_text.clear();
            }
            position += 1;
        } else {
            if machine.hint(byte) {
                if let Some((index, open_len)) = machine.activate(&look[position..]) {
                    let region = machine.rules()[index].region();
                    let row = row_at(state.lines_admitted, &look[..occupied], position);
                    sink.code_flush(
                        &state.code_text,
                        row,
                        FlushCause::RegionEnter {
                            multiline: region.is_multiline(),
                        },
                    );
                    state.code_text.clear();
                    sink.region_enter(region, row);
                    state.region_text.clear();
                    state.region_text.extend_from_slice(machine.rules()[index].open());
                    position += open_len;
                    continue;
                }
            }
            if byte == b'\n' {
                let row = row_at(state.lines_admitted, &look[..occupied], position);
                sink.code_flush(&state.code_text, row, FlushCause::Newline);
                state.code_text.clear();
            } else {
                state.code_text.push(byte);
            }
            position += 1;
        }
    }

    position - occupied
}

/// 1-based row of `position` within the occupied slice.
fn row_at(lines_admitted: u64, occupied: &[u8], position: usize) -> u64 {
    lines_admitted - count_newlines(&occupied[position..]) + 1
}

fn count_newlines(bytes: &[u8]) -> u64 {
    memchr::memchr_iter(b'\n', bytes).count() as u64
}

/// Fill the window's free space; returns `true` once the input reports EOF.
fn fill<R: Read>(window: &mut Window, reader: &mut R) -> Result<bool, ScanError> {
    while window.available() > 0 {
        match reader.read(window.space()) {
            Ok(0) => return Ok(true),
            Ok(read) => window.update(read),
            Err(error) if error.kind() == ErrorKind::Interrupted => {}
            Err(error) => return Err(ScanError::Read(error)),
        }
    }
    Ok(false)
}

/// Count newlines without any region machinery.
///
/// Fallback for files whose extension maps to no rule set: the engine
/// reports only `total_lines`.
pub fn count_rows<R: Read>(mut reader: R) -> Result<u64, ScanError> {
    let mut window = Window::new(DEFAULT_WINDOW_SIZE);
    let mut total = 0u64;
    let mut exhausted = fill(&mut window, &mut reader)?;
    while !window.is_empty() {
        total += count_newlines(window.as_slice());
        window.rotate();
        if !exhausted {
            exhausted = fill(&mut window, &mut reader)?;
        }
    }
    Ok(total)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "tests assert on known-good inputs")]
mod tests {
    use super::{count_rows, FlushCause, ScanSink, Scanner};
    use crate::region::Region;
    use crate::rules::{RegionMachine, RegionRule};
    use pretty_assertions::assert_eq;
    use sift_window::Window;

    fn c_like() -> RegionMachine {
        let mut machine = RegionMachine::new();
        machine.add(RegionRule::new(Region::LineComment, "//", "\n"));
        machine.add(RegionRule::new(Region::BlockComment, "/*", "*/"));
        machine.add(RegionRule::with_escape(Region::Str, "\"", "\"", "\\"));
        machine
    }

    /// Records every sink call for comparison.
    #[derive(Debug, Default, PartialEq, Eq)]
    struct Recorder {
        events: Vec<String>,
    }

    impl ScanSink for Recorder {
        fn code_flush(&mut self, text: &[u8], row: u64, cause: FlushCause) {
            let cause = match cause {
                FlushCause::Newline => "nl".to_string(),
                FlushCause::RegionEnter { multiline } => format!("enter(multiline={multiline})"),
                FlushCause::EndOfFile => "eof".to_string(),
            };
            self.events
                .push(format!("code {:?} row={row} {cause}", String::from_utf8_lossy(text)));
        }

        fn region_enter(&mut self, region: Region, row: u64) {
            self.events.push(format!("open {} row={row}", region.name()));
        }

        fn region_text(&mut self, region: Region, text: &[u8], row: u64, terminal: bool) {
            self.events.push(format!(
                "text {} {:?} row={row} terminal={terminal}",
                region.name(),
                String::from_utf8_lossy(text)
            ));
        }
    }

    fn scan_with(machine: RegionMachine, input: &str) -> (Recorder, super::ScanSummary) {
        let mut scanner = Scanner::new(machine);
        let mut recorder = Recorder::default();
        #[allow(clippy::unwrap_used, reason = "in-memory reads cannot fail")]
        let summary = scanner.scan(input.as_bytes(), &mut recorder).unwrap();
        (recorder, summary)
    }

    // === Code lines and comments ===

    #[test]
    fn line_comment_terminates_code_and_closes_on_newline() {
        let (recorder, summary) = scan_with(c_like(), "int x = 0; // note\nint y;\n");
        assert_eq!(
            recorder.events,
            vec![
                "code \"int x = 0; \" row=1 enter(multiline=false)".to_string(),
                "open line-comment row=1".to_string(),
                "text line-comment \"// note\" row=1 terminal=true".to_string(),
                "code \"int y;\" row=2 nl".to_string(),
                "code \"\" row=3 eof".to_string(),
            ]
        );
        assert_eq!(summary.total_lines, 2);
        assert_eq!(summary.unterminated, None);
    }

    #[test]
    fn block_comment_flushes_per_line() {
        let (recorder, summary) = scan_with(c_like(), "/* a\nb\nc */\n");
        assert_eq!(
            recorder.events,
            vec![
                "code \"\" row=1 enter(multiline=true)".to_string(),
                "open block-comment row=1".to_string(),
                "text block-comment \"/* a\" row=1 terminal=false".to_string(),
                "text block-comment \"b\" row=2 terminal=false".to_string(),
                "text block-comment \"c \" row=3 terminal=true".to_string(),
                "code \"\" row=3 nl".to_string(),
                "code \"\" row=4 eof".to_string(),
            ]
        );
        assert_eq!(summary.total_lines, 3);
    }

    #[test]
    fn escaped_quote_stays_inside_string() {
        let (recorder, _) = scan_with(c_like(), "\"a\\\"b\" x\n");
        assert_eq!(
            recorder.events,
            vec![
                "code \"\" row=1 enter(multiline=true)".to_string(),
                "open string row=1".to_string(),
                "text string \"\\\"a\\\\\\\"b\" row=1 terminal=true".to_string(),
                "code \" x\" row=1 nl".to_string(),
                "code \"\" row=2 eof".to_string(),
            ]
        );
    }

    #[test]
    fn unterminated_region_is_reported() {
        let (recorder, summary) = scan_with(c_like(), "/* never closed\n");
        assert_eq!(summary.unterminated, Some(Region::BlockComment));
        assert_eq!(summary.total_lines, 1);
        assert!(recorder
            .events
            .iter()
            .any(|event| event == "text block-comment \"\" row=2 terminal=true"));
    }

    #[test]
    fn code_without_trailing_newline_flushes_at_eof() {
        let (recorder, summary) = scan_with(c_like(), "return 1;");
        assert_eq!(
            recorder.events,
            vec!["code \"return 1;\" row=1 eof".to_string()]
        );
        assert_eq!(summary.total_lines, 0);
    }

    // === Window-size independence (region determinism) ===

    #[test]
    fn events_are_invariant_under_window_size() {
        let input = "int a; /* one\ntwo */ \"s\\\"t\" // tail\nnext \"x\" y\n";
        let mut baseline = Recorder::default();
        #[allow(clippy::unwrap_used, reason = "in-memory reads cannot fail")]
        Scanner::new(c_like())
            .scan(input.as_bytes(), &mut baseline)
            .unwrap();

        for size in [16usize, 17, 24, 32, 64] {
            let window = Window::with_capacity(size, size + size.max(8));
            let mut scanner = Scanner::with_window(c_like(), window);
            let mut recorder = Recorder::default();
            #[allow(clippy::unwrap_used, reason = "in-memory reads cannot fail")]
            scanner.scan(input.as_bytes(), &mut recorder).unwrap();
            assert_eq!(recorder, baseline, "window size {size}");
        }
    }

    // === Rows-only fallback ===

    #[test]
    fn count_rows_counts_newlines() {
        #[allow(clippy::unwrap_used, reason = "in-memory reads cannot fail")]
        let total = count_rows("a\nb\nc".as_bytes()).unwrap();
        assert_eq!(total, 2);
    }

    #[test]
    fn count_rows_empty_input() {
        #[allow(clippy::unwrap_used, reason = "in-memory reads cannot fail")]
        let total = count_rows(&b""[..]).unwrap();
        assert_eq!(total, 0);
    }

    // === Property tests ===

    #[allow(clippy::disallowed_types, reason = "proptest macros internally use Arc")]
    mod proptest_determinism {
        use super::{c_like, Recorder, Scanner};
        use proptest::prelude::*;
        use sift_window::Window;

        proptest! {
            // Region determinism: the event sequence does not depend on
            // the window geometry.
            #[test]
            fn events_agree_across_window_sizes(
                source in "[ a-z\"/*\\\\\n]{0,200}",
                size in 16usize..96,
            ) {
                let mut baseline = Recorder::default();
                let mut scanner = Scanner::new(c_like());
                prop_assert!(scanner.scan(source.as_bytes(), &mut baseline).is_ok());

                let window = Window::with_capacity(size, size + size);
                let mut small = Scanner::with_window(c_like(), window);
                let mut recorder = Recorder::default();
                prop_assert!(small.scan(source.as_bytes(), &mut recorder).is_ok());
                prop_assert_eq!(recorder, baseline);
            }
        }
    }
}
