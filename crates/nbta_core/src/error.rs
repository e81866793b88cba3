//! Error types for the commit protocol.

use crate::types::{Key, Timestamp};
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors raised by stores, the controller and transactions.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A newer write than the commit's `prev` token is already pending or
    /// stable for the key.
    #[error("concurrent write on {key}: observed {prev}, found {found}")]
    ConcurrentWrite {
        /// The contended key.
        key: Key,
        /// The writer's concurrency token.
        prev: Timestamp,
        /// Timestamp of the newer write already present.
        found: Timestamp,
    },

    /// A pending write referenced by promotion or lookup does not exist.
    #[error("write {key}@{ts} not found (already promoted: {promoted})")]
    NotFound {
        /// The key looked up.
        key: Key,
        /// The timestamp looked up.
        ts: Timestamp,
        /// True if the write exists, but in the stable set.
        promoted: bool,
    },

    /// A transaction proved a write must exist but no replica has it yet.
    #[error("missing required write {key}@{ts}")]
    MissingRequiredWrite {
        /// The key read.
        key: Key,
        /// The timestamp the transaction required.
        ts: Timestamp,
    },

    /// Two different writes were proposed for the same key and timestamp.
    #[error("timestamp collision on {key}@{ts}")]
    TimestampCollision {
        /// The key written.
        key: Key,
        /// The duplicated timestamp.
        ts: Timestamp,
    },

    /// Log backend error.
    #[error("storage error: {0}")]
    Storage(#[from] nbta_storage::StorageError),

    /// The write log failed validation during replay.
    #[error("log corruption at offset {offset}: {message}")]
    LogCorruption {
        /// Byte offset of the bad record.
        offset: u64,
        /// Description of the corruption.
        message: String,
    },

    /// CBOR encoding or decoding failed.
    #[error("codec error: {message}")]
    Codec {
        /// Description of the failure.
        message: String,
    },

    /// Peer messaging failed.
    #[error("transport error: {message}")]
    Transport {
        /// Error message.
        message: String,
        /// Whether the operation can be retried.
        retryable: bool,
    },

    /// Operation not permitted in the current state.
    #[error("invalid operation: {message}")]
    InvalidOperation {
        /// Why the operation is invalid.
        message: String,
    },

    /// An argument was rejected.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// Which argument and why.
        message: String,
    },
}

impl CoreError {
    /// Creates a retryable transport error.
    pub fn transport_retryable(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: true,
        }
    }

    /// Creates a non-retryable transport error.
    pub fn transport_fatal(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: false,
        }
    }

    /// Creates a codec error.
    pub fn codec(message: impl Into<String>) -> Self {
        Self::Codec {
            message: message.into(),
        }
    }

    /// Creates a log corruption error.
    pub fn log_corruption(offset: u64, message: impl Into<String>) -> Self {
        Self::LogCorruption {
            offset,
            message: message.into(),
        }
    }

    /// Creates an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }

    /// Creates an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Returns true if retrying the whole transaction may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            CoreError::ConcurrentWrite { .. } | CoreError::MissingRequiredWrite { .. } => true,
            CoreError::Transport { retryable, .. } => *retryable,
            _ => false,
        }
    }
}
