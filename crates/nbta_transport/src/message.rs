//! Wire frames.

use crate::error::{TransportError, TransportResult};
use nbta_core::{Notify, ReplicaAddr};
use serde::{Deserialize, Serialize};

/// A notification addressed from one replica to another.
///
/// Frames travel between replicas as CBOR-encoded envelopes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotifyEnvelope {
    /// Sending replica; the receiver credits the acknowledgment to it.
    pub from: ReplicaAddr,
    /// Receiving replica.
    pub to: ReplicaAddr,
    /// The notification.
    pub notify: Notify,
}

impl NotifyEnvelope {
    /// Encodes the envelope as a CBOR frame.
    pub fn encode(&self) -> TransportResult<Vec<u8>> {
        let mut frame = Vec::new();
        ciborium::into_writer(self, &mut frame)
            .map_err(|e| TransportError::Codec(e.to_string()))?;
        Ok(frame)
    }

    /// Decodes a CBOR frame.
    pub fn decode(frame: &[u8]) -> TransportResult<Self> {
        ciborium::from_reader(frame).map_err(|e| TransportError::Codec(e.to_string()))
    }
}
