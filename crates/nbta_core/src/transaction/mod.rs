//! Client-side transactions.
//!
//! A [`Transaction`] buffers writes locally and sends nothing until
//! [`Transaction::commit`]. Reads go through a [`Server`] and are tracked so
//! that:
//! - a later commit can carry the observed timestamp as its concurrency token
//! - once one piece of a multi-key write has been read, every sibling piece
//!   must be visible too, or the read fails with
//!   [`CoreError::MissingRequiredWrite`]

mod state;

pub use state::TransactionState;

use crate::error::{CoreError, CoreResult};
use crate::server::Server;
use crate::types::{Key, Timestamp};
use crate::write::Write;
use state::Session;
use tracing::{debug, warn};

/// A client session committing at a single timestamp.
pub struct Transaction<S: Server> {
    server: S,
    ts: Timestamp,
    session: Session,
}

impl<S: Server> Transaction<S> {
    /// Starts a transaction that will commit at `ts`.
    ///
    /// # Errors
    ///
    /// [`CoreError::InvalidArgument`] if `ts` is the reserved
    /// [`Timestamp::NONE`].
    pub fn begin(server: S, ts: Timestamp) -> CoreResult<Self> {
        if ts.is_none() {
            return Err(CoreError::invalid_argument(
                "transaction timestamp must be non-zero",
            ));
        }
        Ok(Self {
            server,
            ts,
            session: Session::new(),
        })
    }

    /// The commit timestamp.
    #[must_use]
    pub fn ts(&self) -> Timestamp {
        self.ts
    }

    /// The lifecycle state.
    #[must_use]
    pub fn state(&self) -> TransactionState {
        self.session.state()
    }

    /// Highest timestamp this transaction has read for `key`.
    #[must_use]
    pub fn read_timestamp(&self, key: &Key) -> Timestamp {
        self.session.read_ts(key)
    }

    /// Minimum timestamp this transaction has proven must exist for `key`.
    #[must_use]
    pub fn required_timestamp(&self, key: &Key) -> Timestamp {
        self.session.required_ts(key)
    }

    /// Number of buffered writes.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.session.writes().len()
    }

    /// Buffers `val` for `key`.
    pub fn set(&mut self, key: impl Into<Key>, val: impl Into<Vec<u8>>) -> CoreResult<()> {
        self.session.ensure_active()?;
        self.session.buffer(key.into(), Some(val.into()));
        Ok(())
    }

    /// Buffers a deletion of `key`.
    pub fn del(&mut self, key: impl Into<Key>) -> CoreResult<()> {
        self.session.ensure_active()?;
        self.session.buffer(key.into(), None);
        Ok(())
    }

    /// Reads `key`, returning `None` if it is absent or deleted.
    ///
    /// Buffered writes are returned without contacting the server.
    ///
    /// # Errors
    ///
    /// - [`CoreError::MissingRequiredWrite`] if an earlier read proved a
    ///   write on `key` exists, but the server has no such write
    /// - any server failure
    pub fn get(&mut self, key: &Key) -> CoreResult<Option<Vec<u8>>> {
        self.session.ensure_active()?;
        if let Some(val) = self.session.buffered(key) {
            return Ok(val.clone());
        }

        let required = self.session.required_ts(key);
        let found = self.server.get(key, required)?;
        let Some(write) = found else {
            if !required.is_none() {
                return Err(CoreError::MissingRequiredWrite {
                    key: key.clone(),
                    ts: required,
                });
            }
            return Ok(None);
        };

        self.session.observe(&write);
        Ok(write.into_val())
    }

    /// Sends every buffered write to the server at this transaction's
    /// timestamp.
    ///
    /// With `error_if_concurrent`, each write carries the timestamp last read
    /// for its key, and the server rejects it if something newer landed in
    /// between. Otherwise writes are blind.
    ///
    /// # Errors
    ///
    /// The first failing write's error, returned as-is. Keys committed
    /// before the failure are not rolled back; the transaction moves to
    /// [`TransactionState::Failed`].
    pub fn commit(&mut self, error_if_concurrent: bool) -> CoreResult<()> {
        self.session.ensure_active()?;

        let sibs: Vec<Key> = self.session.writes().keys().cloned().collect();
        let writes: Vec<Write> = self
            .session
            .writes()
            .iter()
            .map(|(key, val)| {
                let prev = if error_if_concurrent {
                    self.session.read_ts(key)
                } else {
                    Timestamp::NONE
                };
                Write::new(key.clone(), val.clone(), self.ts, sibs.iter().cloned(), prev)
            })
            .collect();

        let mut applied: Vec<Key> = Vec::with_capacity(writes.len());
        for write in writes {
            let key = write.key().clone();
            if let Err(e) = self.server.set(write) {
                if !applied.is_empty() {
                    warn!(ts = %self.ts, failed = %key, applied = ?applied, error = %e, "commit failed after partial apply");
                }
                self.session.finish(TransactionState::Failed);
                return Err(e);
            }
            applied.push(key);
        }

        debug!(ts = %self.ts, keys = sibs.len(), "committed");
        self.session.finish(TransactionState::Committed);
        Ok(())
    }

    /// Discards all buffered state. Nothing is sent.
    pub fn abort(&mut self) -> CoreResult<()> {
        self.session.ensure_active()?;
        self.session.finish(TransactionState::Aborted);
        Ok(())
    }
}
