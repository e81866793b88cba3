//! In-memory replica store.

use crate::error::CoreResult;
use crate::store::keyspace::{Acknowledger, AddOutcome, KeySpace};
use crate::store::Store;
use crate::types::{Key, ReplicaAddr, Timestamp};
use crate::write::Write;
use tracing::trace;

/// A [`Store`] that keeps all state in memory.
///
/// State is lost when the store is dropped. Use [`crate::DurableStore`]
/// for a replica that must recover its pending and stable sets.
///
/// # Example
///
/// ```rust
/// use nbta_core::{Key, MemoryStore, ReplicaAddr, Store, Timestamp, Write};
///
/// let store = MemoryStore::new();
/// let w = Write::single(Key::from("x"), Some(b"xxx".to_vec()), Timestamp::new(10));
/// store.pending_add(&w).unwrap();
/// assert_eq!(store.ack(&Key::from("x"), &Key::from("x"), w.ts(), &ReplicaAddr::from("a")).unwrap(), 1);
/// store.pending_promote(&Key::from("x"), w.ts()).unwrap();
/// assert_eq!(store.stable_find(&Key::from("x"), Timestamp::NONE).unwrap(), Some(w));
/// ```
#[derive(Debug, Default)]
pub struct MemoryStore {
    keys: KeySpace,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of pending writes held for `key`.
    #[must_use]
    pub fn pending_count(&self, key: &Key) -> usize {
        self.keys.read_key(key, |s| s.pending_len()).unwrap_or(0)
    }

    /// Number of stable writes held for `key`.
    #[must_use]
    pub fn stable_count(&self, key: &Key) -> usize {
        self.keys.read_key(key, |s| s.stable_len()).unwrap_or(0)
    }

    /// Number of distinct acknowledgers recorded for `(key, ts)`.
    #[must_use]
    pub fn ack_count(&self, key: &Key, ts: Timestamp) -> usize {
        self.keys.read_key(key, |s| s.ack_count(ts)).unwrap_or(0)
    }

    /// Number of keys this replica has seen.
    #[must_use]
    pub fn key_count(&self) -> usize {
        self.keys.key_count()
    }
}

impl Store for MemoryStore {
    fn stable_find(&self, key: &Key, ts_minimum: Timestamp) -> CoreResult<Option<Write>> {
        Ok(self
            .keys
            .read_key(key, |s| s.stable_find(ts_minimum).cloned())
            .flatten())
    }

    fn pending_get(&self, key: &Key, ts: Timestamp) -> CoreResult<Option<Write>> {
        Ok(self
            .keys
            .read_key(key, |s| s.pending_get(ts).cloned())
            .flatten())
    }

    fn pending_add(&self, write: &Write) -> CoreResult<()> {
        self.keys.with_key(write.key(), |state| {
            if state.check_add(write)? == AddOutcome::Insert {
                state.insert_pending(write.clone());
            } else {
                trace!(key = %write.key(), ts = %write.ts(), "duplicate pending add");
            }
            Ok(())
        })
    }

    fn pending_promote(&self, key: &Key, ts: Timestamp) -> CoreResult<()> {
        self.keys.with_key(key, |state| state.promote(key, ts))
    }

    fn ack(
        &self,
        to_key: &Key,
        from_key: &Key,
        ts: Timestamp,
        from_replica: &ReplicaAddr,
    ) -> CoreResult<usize> {
        let who = Acknowledger {
            replica: from_replica.clone(),
            key: from_key.clone(),
        };
        Ok(self.keys.with_key(to_key, |state| state.record_ack(ts, who)))
    }
}
