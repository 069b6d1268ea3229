//! Error types for the SIXEL encoder library.

use std::io;
use thiserror::Error;

/// Result type for SIXEL operations.
pub type Result<T> = std::result::Result<T, SixelError>;

/// Errors that can occur in SIXEL encoder operations.
#[derive(Debug, Error)]
pub enum SixelError {
    /// I/O error while flushing the encoded stream to a sink.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The requested image dimensions cannot be represented in memory.
    #[error("image dimensions {width}x{height} are too large")]
    DimensionsTooLarge {
        /// Requested image width in pixels.
        width: u32,
        /// Requested image height in pixels.
        height: u32,
    },
}
