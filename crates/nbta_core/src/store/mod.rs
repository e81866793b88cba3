//! Per-replica persistence of pending writes, stable writes and
//! acknowledgments.
//!
//! A replica exclusively owns its store. Every mutation is atomic per key:
//! [`Store::pending_add`] holds the key's lock across the concurrency check
//! and the insert, so two conflicting commits can never both pass the check.

mod durable;
mod keyspace;
mod memory;
mod record;

pub use durable::DurableStore;
pub use memory::MemoryStore;

use crate::error::CoreResult;
use crate::types::{Key, ReplicaAddr, Timestamp};
use crate::write::Write;
use std::sync::Arc;

/// The storage contract a replica's persistence layer implements.
pub trait Store: Send + Sync {
    /// Returns the highest-timestamp stable write for `key` with
    /// `ts >= ts_minimum`, or `None` if none qualifies.
    ///
    /// # Errors
    ///
    /// Only on storage faults; absence is not an error.
    fn stable_find(&self, key: &Key, ts_minimum: Timestamp) -> CoreResult<Option<Write>>;

    /// Returns the pending write at exactly `(key, ts)`.
    ///
    /// # Errors
    ///
    /// Only on storage faults; absence is not an error.
    fn pending_get(&self, key: &Key, ts: Timestamp) -> CoreResult<Option<Write>>;

    /// Adds `write` to the pending set of its key.
    ///
    /// # Errors
    ///
    /// - [`crate::CoreError::ConcurrentWrite`] if `write.prev()` is set and a
    ///   pending or stable write newer than it exists; nothing is inserted
    /// - [`crate::CoreError::TimestampCollision`] if a different write
    ///   already holds `(key, ts)`
    fn pending_add(&self, write: &Write) -> CoreResult<()>;

    /// Moves the pending write `(key, ts)` into the stable set.
    ///
    /// # Errors
    ///
    /// [`crate::CoreError::NotFound`] if no such pending write exists; its
    /// `promoted` flag tells an earlier promotion from a write that was
    /// never proposed here.
    fn pending_promote(&self, key: &Key, ts: Timestamp) -> CoreResult<()>;

    /// Records that `(from_replica, from_key)` acknowledged `(to_key, ts)`
    /// and returns the number of distinct acknowledgers so far.
    ///
    /// Re-acknowledging from the same identity leaves the count unchanged.
    ///
    /// # Errors
    ///
    /// Only on storage faults.
    fn ack(
        &self,
        to_key: &Key,
        from_key: &Key,
        ts: Timestamp,
        from_replica: &ReplicaAddr,
    ) -> CoreResult<usize>;
}

impl<S: Store + ?Sized> Store for Arc<S> {
    fn stable_find(&self, key: &Key, ts_minimum: Timestamp) -> CoreResult<Option<Write>> {
        (**self).stable_find(key, ts_minimum)
    }

    fn pending_get(&self, key: &Key, ts: Timestamp) -> CoreResult<Option<Write>> {
        (**self).pending_get(key, ts)
    }

    fn pending_add(&self, write: &Write) -> CoreResult<()> {
        (**self).pending_add(write)
    }

    fn pending_promote(&self, key: &Key, ts: Timestamp) -> CoreResult<()> {
        (**self).pending_promote(key, ts)
    }

    fn ack(
        &self,
        to_key: &Key,
        from_key: &Key,
        ts: Timestamp,
        from_replica: &ReplicaAddr,
    ) -> CoreResult<usize> {
        (**self).ack(to_key, from_key, ts, from_replica)
    }
}
