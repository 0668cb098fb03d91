//! Fixed-capacity byte buffer with an oversized look-ahead tail.
//!
//! The buffer has a *logical* size and a larger *capacity*; the region
//! between them is the look-ahead margin. `last` is the one-past-end of
//! valid bytes and may exceed the logical size (that is the point of the
//! margin). Rotation moves the bytes beyond the logical size back to the
//! front so the stream is consumed without copying twice.
//!
//! # Invariants
//!
//! - `last <= capacity` at all times.
//! - After [`Window::rotate`]: `last <= capacity - size`, and the bytes
//!   that were in `[size, last)` now sit at `[0, last)`.
//! - `summary` is the lifetime count of bytes admitted via
//!   [`Window::write`] / [`Window::update`].

use memchr::{memchr, memmem};

/// Streaming byte buffer with a look-ahead margin past its logical end.
///
/// Created with a logical `size`; the capacity defaults to `size * 3/2`,
/// leaving a 50% margin for multi-byte marker look-ahead.
#[derive(Clone, Debug)]
pub struct Window {
    /// Owned storage, `capacity` bytes.
    buf: Vec<u8>,
    /// Logical main region size. The scanner consumes `[0, min(last, size))`.
    size: usize,
    /// One-past-end of valid bytes, `0..=capacity`.
    last: usize,
    /// Lifetime count of bytes admitted into the window.
    summary: u64,
}

impl Window {
    /// Create a window with a logical `size` and a 50% look-ahead margin.
    pub fn new(size: usize) -> Self {
        Self::with_capacity(size, size + (size >> 1))
    }

    /// Create a window with an explicit capacity.
    ///
    /// # Contract
    ///
    /// `capacity > size`: the margin must exist, otherwise markers that
    /// straddle the logical boundary cannot be resolved.
    pub fn with_capacity(size: usize, capacity: usize) -> Self {
        debug_assert!(size >= 16, "window size {size} below useful minimum");
        debug_assert!(capacity > size, "capacity {capacity} must exceed size {size}");
        Self {
            buf: vec![0u8; capacity],
            size,
            last: 0,
            summary: 0,
        }
    }

    /// Logical main region size.
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Total allocated capacity (`size` + margin).
    #[inline]
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Free space at the tail, `capacity - last`.
    #[inline]
    pub fn available(&self) -> usize {
        self.buf.len() - self.last
    }

    /// Bytes the scanner may consume this round, `min(last, size)`.
    #[inline]
    pub fn occupied(&self) -> usize {
        self.last.min(self.size)
    }

    /// One-past-end of valid bytes (occupied region plus margin content).
    #[inline]
    pub fn last(&self) -> usize {
        self.last
    }

    /// `true` when the window holds no valid bytes.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.last == 0
    }

    /// Lifetime count of bytes admitted.
    #[inline]
    pub fn summary(&self) -> u64 {
        self.summary
    }

    /// `(begin, end)` index pair over the occupied region.
    #[inline]
    pub fn range(&self) -> (usize, usize) {
        (0, self.occupied())
    }

    /// The occupied region as a slice.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.buf[..self.occupied()]
    }

    /// All valid bytes including the look-ahead margin.
    ///
    /// Marker comparisons use this so a marker starting near the end of
    /// the occupied region can be matched against bytes in the margin.
    #[inline]
    pub fn lookahead(&self) -> &[u8] {
        &self.buf[..self.last]
    }

    /// The writable tail `[last, capacity)`.
    ///
    /// Fill it from the input, then record the count with [`Window::update`].
    #[inline]
    pub fn space(&mut self) -> &mut [u8] {
        let last = self.last;
        &mut self.buf[last..]
    }

    /// Record `added` bytes written into [`Window::space`].
    ///
    /// Bumps `last` and the lifetime summary. A count beyond the free
    /// space is clamped to capacity.
    pub fn update(&mut self, added: usize) {
        debug_assert!(added <= self.available(), "update({added}) exceeds available space");
        self.last = (self.last + added).min(self.buf.len());
        self.summary += added as u64;
    }

    /// Append bytes, rotating first when valid data extends past `size`.
    ///
    /// Returns the number of bytes actually written; partial writes are
    /// legal when the free space is smaller than `data`.
    pub fn write(&mut self, data: &[u8]) -> usize {
        if self.last > self.size {
            self.rotate();
        }
        let to_write = data.len().min(self.available());
        if to_write == 0 {
            return 0;
        }
        let at = self.last;
        self.buf[at..at + to_write].copy_from_slice(&data[..to_write]);
        self.last += to_write;
        self.summary += to_write as u64;
        to_write
    }

    /// Move the excess `[size, last)` to the buffer start.
    ///
    /// After rotation `last` is the excess length, or `0` when the valid
    /// data fit inside the logical region.
    pub fn rotate(&mut self) {
        if self.last > self.size {
            let excess = self.last - self.size;
            self.buf.copy_within(self.size..self.last, 0);
            self.last = excess;
        } else {
            self.last = 0;
        }
    }

    /// Drop all valid bytes without touching the lifetime summary.
    pub fn clear(&mut self) {
        self.last = 0;
    }

    /// Find `byte` in `[offset, last)`, returning its absolute index.
    pub fn find_byte(&self, byte: u8, offset: usize) -> Option<usize> {
        if offset >= self.last {
            return None;
        }
        memchr(byte, &self.buf[offset..self.last]).map(|at| offset + at)
    }

    /// Find `needle` in `[offset, last)`, returning its absolute index.
    pub fn find(&self, needle: &[u8], offset: usize) -> Option<usize> {
        if needle.is_empty() || offset >= self.last {
            return None;
        }
        memmem::find(&self.buf[offset..self.last], needle).map(|at| offset + at)
    }

    /// Find the first position in `[offset, last)` whose byte has a
    /// non-zero entry in `mask`.
    pub fn find_mask(&self, mask: &[u8; 256], offset: usize) -> Option<usize> {
        self.buf[..self.last]
            .iter()
            .enumerate()
            .skip(offset)
            .find(|(_, b)| mask[usize::from(**b)] != 0)
            .map(|(at, _)| at)
    }

    /// Count occurrences of `byte` in `[offset, last)`.
    pub fn count_byte(&self, byte: u8, offset: usize) -> usize {
        if offset >= self.last {
            return 0;
        }
        memchr::memchr_iter(byte, &self.buf[offset..self.last]).count()
    }

    /// Count non-overlapping occurrences of `needle` in `[offset, last)`.
    pub fn count(&self, needle: &[u8], offset: usize) -> usize {
        if needle.is_empty() || offset >= self.last {
            return 0;
        }
        memmem::find_iter(&self.buf[offset..self.last], needle).count()
    }
}
