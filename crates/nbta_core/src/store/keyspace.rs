//! Per-key state shared by the store implementations.

use crate::error::{CoreError, CoreResult};
use crate::types::{Key, ReplicaAddr, Timestamp};
use crate::write::Write;
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

/// Identity an acknowledgment is deduplicated on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct Acknowledger {
    pub(crate) replica: ReplicaAddr,
    pub(crate) key: Key,
}

/// What `pending_add` should do with a write that passed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AddOutcome {
    /// New write; insert it.
    Insert,
    /// The identical write is already here (redelivery).
    Duplicate,
}

/// Everything one replica knows about one key.
#[derive(Debug, Default)]
pub(crate) struct KeyState {
    pending: BTreeMap<Timestamp, Write>,
    stable: BTreeMap<Timestamp, Write>,
    acks: HashMap<Timestamp, HashSet<Acknowledger>>,
}

impl KeyState {
    pub(crate) fn stable_find(&self, ts_minimum: Timestamp) -> Option<&Write> {
        self.stable.range(ts_minimum..).next_back().map(|(_, w)| w)
    }

    pub(crate) fn pending_get(&self, ts: Timestamp) -> Option<&Write> {
        self.pending.get(&ts)
    }

    /// Validates `write` against everything already held for its key.
    pub(crate) fn check_add(&self, write: &Write) -> CoreResult<AddOutcome> {
        let ts = write.ts();
        if let Some(existing) = self.pending.get(&ts).or_else(|| self.stable.get(&ts)) {
            if existing == write {
                return Ok(AddOutcome::Duplicate);
            }
            return Err(CoreError::TimestampCollision {
                key: write.key().clone(),
                ts,
            });
        }

        let prev = write.prev();
        if !prev.is_none() {
            let newest = self.newest_ts();
            if newest > prev {
                return Err(CoreError::ConcurrentWrite {
                    key: write.key().clone(),
                    prev,
                    found: newest,
                });
            }
        }
        Ok(AddOutcome::Insert)
    }

    pub(crate) fn insert_pending(&mut self, write: Write) {
        self.pending.insert(write.ts(), write);
    }

    /// Checks that `(key, ts)` can be promoted without changing anything.
    pub(crate) fn check_promote(&self, key: &Key, ts: Timestamp) -> CoreResult<()> {
        if self.pending.contains_key(&ts) {
            return Ok(());
        }
        Err(CoreError::NotFound {
            key: key.clone(),
            ts,
            promoted: self.stable.contains_key(&ts),
        })
    }

    pub(crate) fn promote(&mut self, key: &Key, ts: Timestamp) -> CoreResult<()> {
        self.check_promote(key, ts)?;
        if let Some(write) = self.pending.remove(&ts) {
            self.stable.insert(ts, write);
        }
        Ok(())
    }

    pub(crate) fn has_ack(&self, ts: Timestamp, who: &Acknowledger) -> bool {
        self.acks.get(&ts).is_some_and(|set| set.contains(who))
    }

    /// Records an acknowledgment and returns the distinct count.
    pub(crate) fn record_ack(&mut self, ts: Timestamp, who: Acknowledger) -> usize {
        let set = self.acks.entry(ts).or_default();
        set.insert(who);
        set.len()
    }

    pub(crate) fn ack_count(&self, ts: Timestamp) -> usize {
        self.acks.get(&ts).map_or(0, HashSet::len)
    }

    pub(crate) fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub(crate) fn stable_len(&self) -> usize {
        self.stable.len()
    }

    fn newest_ts(&self) -> Timestamp {
        let pending = self.pending.keys().next_back().copied();
        let stable = self.stable.keys().next_back().copied();
        pending.max(stable).unwrap_or(Timestamp::NONE)
    }
}

/// Map of keys to independently locked [`KeyState`]s.
#[derive(Debug, Default)]
pub(crate) struct KeySpace {
    keys: RwLock<HashMap<Key, Arc<Mutex<KeyState>>>>,
}

impl KeySpace {
    /// Runs `f` with the key's lock held, creating the key if needed.
    pub(crate) fn with_key<R>(&self, key: &Key, f: impl FnOnce(&mut KeyState) -> R) -> R {
        let slot = self.slot(key);
        let mut state = slot.lock();
        f(&mut state)
    }

    /// Runs `f` with the key's lock held; returns `None` for unknown keys.
    pub(crate) fn read_key<R>(&self, key: &Key, f: impl FnOnce(&KeyState) -> R) -> Option<R> {
        let slot = self.keys.read().get(key).cloned()?;
        let state = slot.lock();
        Some(f(&state))
    }

    pub(crate) fn key_count(&self) -> usize {
        self.keys.read().len()
    }

    fn slot(&self, key: &Key) -> Arc<Mutex<KeyState>> {
        if let Some(slot) = self.keys.read().get(key) {
            return Arc::clone(slot);
        }
        Arc::clone(self.keys.write().entry(key.clone()).or_default())
    }
}
