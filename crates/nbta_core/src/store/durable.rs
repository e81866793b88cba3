//! Log-backed replica store.

use crate::config::DurableStoreConfig;
use crate::error::{CoreError, CoreResult};
use crate::store::keyspace::{Acknowledger, AddOutcome, KeySpace};
use crate::store::record::{scan, LogRecord};
use crate::store::Store;
use crate::types::{Key, ReplicaAddr, Timestamp};
use crate::write::Write;
use nbta_storage::StorageBackend;
use parking_lot::Mutex;
use tracing::{debug, warn};

/// A [`Store`] that journals every mutation to a [`StorageBackend`].
///
/// The in-memory index is identical to [`crate::MemoryStore`]'s; each
/// mutation is validated, appended to the log and only then applied, all
/// under the key's lock. [`DurableStore::open`] rebuilds the index by
/// replaying the log.
///
/// # Recovery
///
/// - An incomplete final frame (crash mid-append) is truncated away
/// - Any other damage fails the open with [`CoreError::LogCorruption`]
///
/// An append that fails at runtime is cut back off the log before the
/// error is returned, so later records never follow a partial frame.
pub struct DurableStore<B: StorageBackend> {
    backend: B,
    keys: KeySpace,
    config: DurableStoreConfig,
    /// Serialises appends across keys so a failed frame can be cut back.
    log: Mutex<()>,
}

impl<B: StorageBackend> DurableStore<B> {
    /// Opens a store over `backend`, replaying any records it holds.
    ///
    /// # Errors
    ///
    /// Returns an error if the log cannot be read, is corrupt, or replays
    /// into an impossible state.
    pub fn open(backend: B, config: DurableStoreConfig) -> CoreResult<Self> {
        let image = backend.read_all()?;
        let scan = scan(&image)?;
        if scan.torn {
            warn!(
                valid_len = scan.valid_len,
                size = image.len(),
                "truncating torn tail of write log"
            );
            backend.truncate(scan.valid_len)?;
        }

        let keys = KeySpace::default();
        let replayed = scan.records.len();
        for (offset, record) in scan.records {
            replay(&keys, offset, record)?;
        }
        debug!(records = replayed, keys = keys.key_count(), "write log replayed");

        Ok(Self {
            backend,
            keys,
            config,
            log: Mutex::new(()),
        })
    }

    /// Returns the log backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Number of keys this replica has seen.
    pub fn key_count(&self) -> usize {
        self.keys.key_count()
    }

    /// Syncs the log regardless of `sync_on_write`.
    ///
    /// # Errors
    ///
    /// Propagates backend failures.
    pub fn sync(&self) -> CoreResult<()> {
        self.backend.sync()?;
        Ok(())
    }

    fn append(&self, record: &LogRecord) -> CoreResult<()> {
        let frame = record.encode_frame()?;
        let _log = self.log.lock();
        let offset = self.backend.size()?;
        if let Err(e) = self.write_frame(&frame) {
            match self.backend.truncate(offset) {
                Ok(()) => debug!(offset, error = %e, "log append failed, frame discarded"),
                Err(undo) => warn!(offset, error = %undo, "could not discard failed log append"),
            }
            return Err(e);
        }
        Ok(())
    }

    fn write_frame(&self, frame: &[u8]) -> CoreResult<()> {
        self.backend.append(frame)?;
        if self.config.sync_on_write {
            self.backend.sync()?;
        }
        Ok(())
    }
}

fn replay(keys: &KeySpace, offset: u64, record: LogRecord) -> CoreResult<()> {
    match record {
        LogRecord::PendingAdded(write) => {
            let key = write.key().clone();
            keys.with_key(&key, |state| state.insert_pending(write));
            Ok(())
        }
        LogRecord::Promoted { key, ts } => keys
            .with_key(&key, |state| state.promote(&key, ts))
            .map_err(|e| CoreError::log_corruption(offset, format!("replaying promotion: {e}"))),
        LogRecord::Acked {
            to_key,
            ts,
            from_key,
            from_replica,
        } => {
            let who = Acknowledger {
                replica: from_replica,
                key: from_key,
            };
            keys.with_key(&to_key, |state| state.record_ack(ts, who));
            Ok(())
        }
    }
}

impl<B: StorageBackend> Store for DurableStore<B> {
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
            if state.check_add(write)? == AddOutcome::Duplicate {
                return Ok(());
            }
            self.append(&LogRecord::PendingAdded(write.clone()))?;
            state.insert_pending(write.clone());
            Ok(())
        })
    }

    fn pending_promote(&self, key: &Key, ts: Timestamp) -> CoreResult<()> {
        self.keys.with_key(key, |state| {
            state.check_promote(key, ts)?;
            self.append(&LogRecord::Promoted {
                key: key.clone(),
                ts,
            })?;
            state.promote(key, ts)
        })
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
        self.keys.with_key(to_key, |state| {
            if state.has_ack(ts, &who) {
                return Ok(state.ack_count(ts));
            }
            self.append(&LogRecord::Acked {
                to_key: to_key.clone(),
                ts,
                from_key: from_key.clone(),
                from_replica: from_replica.clone(),
            })?;
            Ok(state.record_ack(ts, who))
        })
    }
}
