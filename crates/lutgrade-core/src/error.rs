//! Codec error types.

use thiserror::Error;

/// Result type for LUT codec operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur while parsing or decoding LUT data.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Text LUT is missing a usable size directive or has too few rows.
    #[error("malformed LUT: {0}")]
    MalformedLut(String),

    /// Binary container has a wrong magic tag or an unsupported version.
    #[error("invalid .clut format: {0}")]
    InvalidFormat(String),

    /// Binary payload is shorter than the header declares.
    #[error("corrupt LUT data: expected {expected} bytes, got {actual}")]
    CorruptData {
        /// Byte count the header declares.
        expected: usize,
        /// Byte count actually present.
        actual: usize,
    },

    /// I/O error while reading a LUT file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
