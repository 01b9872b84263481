// Errors raised while walking tag structures

use thiserror::Error;

/// Result type for tag parsing
pub type ParseResult<T> = Result<T, ParseError>;

/// Errors that can occur while reading a tag or container
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("read of {length} bytes at offset {offset} exceeds a view of {available} bytes")]
    OutOfBounds {
        offset: usize,
        length: usize,
        available: usize,
    },

    #[error("malformed {format} data: {reason}")]
    Malformed { format: &'static str, reason: String },
}

impl ParseError {
    /// Create an out-of-bounds error
    pub fn out_of_bounds(offset: usize, length: usize, available: usize) -> Self {
        Self::OutOfBounds {
            offset,
            length,
            available,
        }
    }

    /// Create a malformed-input error for the given format
    pub fn malformed<S: Into<String>>(format: &'static str, reason: S) -> Self {
        Self::Malformed {
            format,
            reason: reason.into(),
        }
    }
}
