//! Scan failure kinds.
//!
//! Per-file failures are recoverable at the pass level: the driver
//! records the error on the file's row and continues with the next file.

use std::io;
use thiserror::Error;

/// Failure while opening or streaming a source file.
#[derive(Debug, Error)]
pub enum ScanError {
    /// The file could not be opened; the file is skipped.
    #[error("failed to open {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: io::Error,
    },

    /// A window refill failed; the file is abandoned.
    #[error("read failed: {0}")]
    Read(#[from] io::Error),
}
