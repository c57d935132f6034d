//! Error types for the codec crate.

use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors that can occur during encoding or decoding.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Unexpected end of input.
    #[error("unexpected end of input: needed {needed} bytes, {available} available")]
    UnexpectedEof {
        /// Bytes the decoder needed.
        needed: usize,
        /// Bytes left in the input.
        available: usize,
    },

    /// The metadata flags byte names no known data type.
    #[error("unknown data type tag {0}")]
    UnknownDataType(u8),

    /// Namespace does not fit the one-byte length prefix.
    #[error("namespace too long: {len} bytes (max {max})")]
    NamespaceTooLong {
        /// Actual namespace length.
        len: usize,
        /// Maximum supported length.
        max: usize,
    },

    /// Invalid record structure.
    #[error("invalid structure: {message}")]
    InvalidStructure {
        /// Description of the structural error.
        message: String,
    },
}

impl CodecError {
    /// Create an invalid structure error.
    pub fn invalid_structure(message: impl Into<String>) -> Self {
        Self::InvalidStructure {
            message: message.into(),
        }
    }

    pub(crate) fn ensure(needed: usize, available: usize) -> CodecResult<()> {
        if available < needed {
            return Err(Self::UnexpectedEof { needed, available });
        }
        Ok(())
    }
}
