//! Error types for bitkv core.

use bitkv_codec::DataType;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in bitkv core operations.
///
/// A missing key or segment is never an error: it reads as zero data.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Storage error, propagated unchanged from the store.
    #[error("storage error: {0}")]
    Storage(#[from] bitkv_storage::StorageError),

    /// A stored record could not be decoded.
    #[error("codec error: {0}")]
    Codec(#[from] bitkv_codec::CodecError),

    /// The key holds a value of another type.
    #[error("WRONGTYPE operation against a key holding {actual}, expected {expected}")]
    WrongType {
        /// Type the operation works on.
        expected: DataType,
        /// Type currently stored under the key.
        actual: DataType,
    },

    /// Bit offset above the configured maximum.
    #[error("bit offset {offset} is out of range (max {max})")]
    OffsetOutOfRange {
        /// Requested bit offset.
        offset: u64,
        /// Largest accepted bit offset.
        max: u64,
    },

    /// Invalid argument.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// Description of the problem.
        message: String,
    },
}

impl CoreError {
    /// Creates an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Returns whether this error came from the storage layer.
    #[must_use]
    pub fn is_storage(&self) -> bool {
        matches!(self, Self::Storage(_))
    }
}
