//! Error types for the buffer.

use std::error::Error as StdError;
use thiserror::Error;

/// Result type for buffer operations.
pub type BufferResult<T> = Result<T, BufferError>;

/// Boxed error returned by element processors.
pub type ProcessorError = Box<dyn StdError + Send + Sync>;

/// Errors that can occur in buffer operations.
#[derive(Debug, Error)]
pub enum BufferError {
    /// Storage backend error.
    #[error("storage error: {0}")]
    Storage(#[from] filebuffer_storage::StorageError),

    /// Element could not be encoded.
    #[error("codec error: {0}")]
    Codec(#[from] filebuffer_codec::CodecError),

    /// A mandatory argument was missing or unusable.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// Description of the problem.
        message: String,
    },

    /// The data and index files disagree in a way that cannot be resolved
    /// without guessing.
    #[error("inconsistent state: {message}")]
    InconsistentState {
        /// Description of the mismatch.
        message: String,
    },

    /// The data file header or a record frame is malformed.
    #[error("invalid format: {message}")]
    InvalidFormat {
        /// Description of the format issue.
        message: String,
    },

    /// The persisted magic value differs from the requested one.
    #[error("magic value mismatch: expected {expected:#010x}, found {found:#010x}")]
    MagicMismatch {
        /// Magic value passed when opening.
        expected: i32,
        /// Magic value stored in the data file header.
        found: i32,
    },

    /// An element processor rejected an element.
    #[error("element processor failed: {0}")]
    Processor(#[source] ProcessorError),
}

impl BufferError {
    /// Create an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create an inconsistent state error.
    pub fn inconsistent_state(message: impl Into<String>) -> Self {
        Self::InconsistentState {
            message: message.into(),
        }
    }

    /// Create an invalid format error.
    pub fn invalid_format(message: impl Into<String>) -> Self {
        Self::InvalidFormat {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn magic_mismatch_renders_hex() {
        let err = BufferError::MagicMismatch {
            expected: 0xDEAD_BEEF_u32 as i32,
            found: 1,
        };
        assert_eq!(
            err.to_string(),
            "magic value mismatch: expected 0xdeadbeef, found 0x00000001"
        );
    }

    #[test]
    fn processor_error_keeps_source() {
        let err = BufferError::Processor("index full".into());
        assert_eq!(err.to_string(), "element processor failed: index full");
        assert!(err.source().is_some());
    }
}
