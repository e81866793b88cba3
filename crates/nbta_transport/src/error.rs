//! Error types for the notify transport.

use nbta_core::{CoreError, ReplicaAddr};
use thiserror::Error;

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Errors raised while queuing or delivering notifications.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The link's mailbox is full and the overflow policy rejects new frames.
    #[error("mailbox to {to} is full ({capacity} frames)")]
    Backpressure {
        /// Destination of the rejected frame.
        to: ReplicaAddr,
        /// Mailbox capacity.
        capacity: usize,
    },

    /// No endpoint is registered under this address.
    #[error("unknown replica: {0}")]
    UnknownReplica(ReplicaAddr),

    /// Frame encoding or decoding failed.
    #[error("codec error: {0}")]
    Codec(String),

    /// Configuration was rejected.
    #[error("invalid transport config: {0}")]
    InvalidConfig(String),
}

impl TransportError {
    /// Returns true if the same send may succeed later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, TransportError::Backpressure { .. })
    }
}

impl From<TransportError> for CoreError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Codec(message) => CoreError::codec(message),
            err if err.is_retryable() => CoreError::transport_retryable(err.to_string()),
            err => CoreError::transport_fatal(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backpressure_maps_to_retryable_core_error() {
        let err = TransportError::Backpressure {
            to: ReplicaAddr::from("r1"),
            capacity: 4,
        };
        assert!(err.is_retryable());
        let core: CoreError = err.into();
        assert!(core.is_retryable());
        assert!(core.to_string().contains("r1"));
    }

    #[test]
    fn unknown_replica_is_fatal() {
        let core: CoreError = TransportError::UnknownReplica(ReplicaAddr::from("gone")).into();
        assert!(matches!(
            core,
            CoreError::Transport {
                retryable: false,
                ..
            }
        ));
    }

    #[test]
    fn codec_keeps_its_kind() {
        let core: CoreError = TransportError::Codec("truncated".into()).into();
        assert!(matches!(core, CoreError::Codec { .. }));
    }
}
