//! Transaction session state.

use crate::error::{CoreError, CoreResult};
use crate::types::{Key, Timestamp};
use crate::write::Write;
use std::collections::{BTreeMap, HashMap};

/// Lifecycle of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    /// Transaction is open for reads and writes.
    Active,
    /// Every buffered write was accepted.
    Committed,
    /// Buffered state was discarded.
    Aborted,
    /// A commit failed part-way; some keys may already be pending.
    Failed,
}

impl TransactionState {
    fn describe(self) -> &'static str {
        match self {
            TransactionState::Active => "active",
            TransactionState::Committed => "committed",
            TransactionState::Aborted => "aborted",
            TransactionState::Failed => "failed",
        }
    }
}

/// The buffered, purely local state of one transaction.
#[derive(Debug)]
pub(crate) struct Session {
    state: TransactionState,
    /// Highest timestamp observed per key.
    reads: HashMap<Key, Timestamp>,
    /// Buffered writes; `None` is a deletion. Ordered so commit order and
    /// the sibling list are deterministic.
    writes: BTreeMap<Key, Option<Vec<u8>>>,
    /// Minimum timestamp proven to exist per key.
    required: HashMap<Key, Timestamp>,
}

impl Session {
    pub(crate) fn new() -> Self {
        Self {
            state: TransactionState::Active,
            reads: HashMap::new(),
            writes: BTreeMap::new(),
            required: HashMap::new(),
        }
    }

    pub(crate) fn state(&self) -> TransactionState {
        self.state
    }

    pub(crate) fn ensure_active(&self) -> CoreResult<()> {
        if self.state != TransactionState::Active {
            return Err(CoreError::invalid_operation(format!(
                "transaction is {}",
                self.state.describe()
            )));
        }
        Ok(())
    }

    pub(crate) fn buffer(&mut self, key: Key, val: Option<Vec<u8>>) {
        self.writes.insert(key, val);
    }

    pub(crate) fn buffered(&self, key: &Key) -> Option<&Option<Vec<u8>>> {
        self.writes.get(key)
    }

    pub(crate) fn writes(&self) -> &BTreeMap<Key, Option<Vec<u8>>> {
        &self.writes
    }

    pub(crate) fn read_ts(&self, key: &Key) -> Timestamp {
        self.reads.get(key).copied().unwrap_or(Timestamp::NONE)
    }

    pub(crate) fn required_ts(&self, key: &Key) -> Timestamp {
        self.required.get(key).copied().unwrap_or(Timestamp::NONE)
    }

    /// Records that `write` was read, and that each of its siblings must
    /// now be visible at least at its timestamp.
    pub(crate) fn observe(&mut self, write: &Write) {
        let ts = write.ts();
        raise(&mut self.reads, write.key(), ts);
        for sib in write.sibs() {
            raise(&mut self.required, sib, ts);
        }
    }

    pub(crate) fn finish(&mut self, state: TransactionState) {
        self.state = state;
        if state == TransactionState::Aborted {
            self.reads.clear();
            self.writes.clear();
            self.required.clear();
        }
    }
}

fn raise(map: &mut HashMap<Key, Timestamp>, key: &Key, ts: Timestamp) {
    let slot = map.entry(key.clone()).or_insert(Timestamp::NONE);
    if ts > *slot {
        *slot = ts;
    }
}
