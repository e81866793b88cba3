//! The client-facing surface of a replica.

use crate::error::CoreResult;
use crate::types::{Key, Timestamp};
use crate::write::Write;
use std::sync::Arc;

/// The minimal surface a request-handling layer exposes to drive
/// transactions.
///
/// Implemented by [`crate::Controller`] for a single replica and by
/// routing clients that fan a write out to every replica of its key.
pub trait Server: Send + Sync {
    /// Returns the newest stable write for `key` at or above `ts_required`,
    /// or, when `ts_required` is set and no stable write qualifies, the
    /// pending write at exactly `ts_required`.
    ///
    /// # Errors
    ///
    /// Storage and transport faults.
    fn get(&self, key: &Key, ts_required: Timestamp) -> CoreResult<Option<Write>>;

    /// Proposes `write` and starts its acknowledgment fan-out.
    ///
    /// Returns without waiting for any acknowledgment.
    ///
    /// # Errors
    ///
    /// [`crate::CoreError::ConcurrentWrite`] and other `pending_add`
    /// failures, then the first notify failure.
    fn set(&self, write: Write) -> CoreResult<()>;
}

impl<S: Server + ?Sized> Server for &S {
    fn get(&self, key: &Key, ts_required: Timestamp) -> CoreResult<Option<Write>> {
        (**self).get(key, ts_required)
    }

    fn set(&self, write: Write) -> CoreResult<()> {
        (**self).set(write)
    }
}

impl<S: Server + ?Sized> Server for Arc<S> {
    fn get(&self, key: &Key, ts_required: Timestamp) -> CoreResult<Option<Write>> {
        (**self).get(key, ts_required)
    }

    fn set(&self, write: Write) -> CoreResult<()> {
        (**self).set(write)
    }
}
