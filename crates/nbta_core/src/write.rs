//! The replicated unit of state.

use crate::types::{Key, Timestamp};
use serde::{Deserialize, Serialize};

/// One key's piece of a (possibly multi-key) atomic write.
///
/// A write is immutable once created. `sibs` lists every key written by the
/// same transaction, sorted and including `key` itself; it drives both the
/// notify fan-out and the required-read propagation in
/// [`crate::Transaction::get`]. `prev` is the optimistic-concurrency token:
/// the timestamp the writer last observed for `key`, or [`Timestamp::NONE`]
/// for a blind write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Write {
    key: Key,
    val: Option<Vec<u8>>,
    ts: Timestamp,
    sibs: Vec<Key>,
    prev: Timestamp,
}

impl Write {
    /// Creates a write. `val == None` marks a deletion.
    ///
    /// The sibling list is sorted, deduplicated and always contains `key`.
    pub fn new(
        key: Key,
        val: Option<Vec<u8>>,
        ts: Timestamp,
        sibs: impl IntoIterator<Item = Key>,
        prev: Timestamp,
    ) -> Self {
        let mut sibs: Vec<Key> = sibs.into_iter().collect();
        if !sibs.contains(&key) {
            sibs.push(key.clone());
        }
        sibs.sort();
        sibs.dedup();
        Self {
            key,
            val,
            ts,
            sibs,
            prev,
        }
    }

    /// Creates a single-key write with no concurrency token.
    pub fn single(key: Key, val: Option<Vec<u8>>, ts: Timestamp) -> Self {
        Self::new(key.clone(), val, ts, [key], Timestamp::NONE)
    }

    /// The key this write applies to.
    #[must_use]
    pub fn key(&self) -> &Key {
        &self.key
    }

    /// The value, or `None` for a deletion.
    #[must_use]
    pub fn val(&self) -> Option<&[u8]> {
        self.val.as_deref()
    }

    /// Consumes the write and returns its value.
    #[must_use]
    pub fn into_val(self) -> Option<Vec<u8>> {
        self.val
    }

    /// The write timestamp.
    #[must_use]
    pub fn ts(&self) -> Timestamp {
        self.ts
    }

    /// Every key written together with this one, sorted.
    #[must_use]
    pub fn sibs(&self) -> &[Key] {
        &self.sibs
    }

    /// The optimistic-concurrency token.
    #[must_use]
    pub fn prev(&self) -> Timestamp {
        self.prev
    }

    /// Returns true if this write deletes its key.
    #[must_use]
    pub fn is_delete(&self) -> bool {
        self.val.is_none()
    }
}
