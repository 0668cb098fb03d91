//! Streaming window buffer for the sift analysis engine.
//!
//! This crate provides a standalone byte buffer with **zero `sift_*`
//! dependencies**. It is the lowest layer of the scanning pipeline: a
//! fixed-size logical buffer with an oversized tail (the look-ahead
//! margin) so that multi-byte markers straddling a refill boundary are
//! resolved by a single extra read, never by refusing a match.
//!
//! # Architecture
//!
//! The scanner consumes the *occupied* region `[0, min(last, size))`,
//! then calls [`Window::rotate`] which moves the unconsumed excess
//! `[size, last)` to the front of the buffer, and refills the free tail
//! from the input. Marker comparisons near the end of the occupied
//! region may read into the margin, which holds valid bytes from the
//! previous fill.
//!
//! # Usage
//!
//! ```
//! use sift_window::Window;
//!
//! let mut window = Window::new(4096);
//! let written = window.write(b"int x = 0;\n");
//! assert_eq!(written, 11);
//! assert_eq!(window.find_byte(b'\n', 0), Some(10));
//! ```

mod window;

pub use window::Window;

/// Default logical window size used by the scanners: 64 cache lines.
pub const DEFAULT_WINDOW_SIZE: usize = 64 * 64;
