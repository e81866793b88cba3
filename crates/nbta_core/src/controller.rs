//! The per-replica protocol engine.
//!
//! A [`Controller`] ties one replica's [`Store`] to its [`Peer`]. It accepts
//! proposed writes, fans notifications out to every replica of every sibling
//! key, counts incoming acknowledgments and promotes a pending write once
//! the whole transaction footprint has acknowledged it.

use crate::error::{CoreError, CoreResult};
use crate::peer::{Notify, NotifyReceiver, Peer};
use crate::server::Server;
use crate::stats::ControllerStats;
use crate::store::Store;
use crate::types::{Key, ReplicaAddr, Timestamp};
use crate::write::Write;
use tracing::{debug, trace, warn};

/// Drives `Set`, `Get` and `ReceiveNotify` for one replica.
///
/// Holds no mutable protocol state of its own; all per-key serialisation
/// happens inside the store, so a controller can be shared freely between
/// concurrent transactions and the delivery loop.
pub struct Controller<S: Store, P: Peer> {
    store: S,
    peer: P,
    stats: ControllerStats,
}

impl<S: Store, P: Peer> Controller<S, P> {
    /// Creates a controller over `store`, sending through `peer`.
    pub fn new(store: S, peer: P) -> Self {
        Self {
            store,
            peer,
            stats: ControllerStats::new(),
        }
    }

    /// The replica's store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The replica's outbound peer.
    pub fn peer(&self) -> &P {
        &self.peer
    }

    /// Protocol counters.
    pub fn stats(&self) -> &ControllerStats {
        &self.stats
    }

    fn fan_out(&self, write: &Write) -> CoreResult<()> {
        let sib_count = write.sibs().len();
        let mut first_error = None;

        for sib in write.sibs() {
            let replicas = self.peer.replicas_for(sib);
            let acks_needed = sib_count * replicas.len();
            for replica in &replicas {
                let notify = Notify {
                    to_key: sib.clone(),
                    from_key: write.key().clone(),
                    ts: write.ts(),
                    acks_needed,
                };
                match self.peer.async_notify(replica, notify) {
                    Ok(()) => {
                        self.stats.record_notify_sent();
                        trace!(to = %replica, to_key = %sib, from_key = %write.key(), ts = %write.ts(), acks_needed, "notify queued");
                    }
                    Err(e) => {
                        self.stats.record_notify_failure();
                        warn!(to = %replica, to_key = %sib, ts = %write.ts(), error = %e, "notify failed");
                        first_error.get_or_insert(e);
                    }
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl<S: Store, P: Peer> Server for Controller<S, P> {
    fn get(&self, key: &Key, ts_required: Timestamp) -> CoreResult<Option<Write>> {
        if let Some(write) = self.store.stable_find(key, ts_required)? {
            return Ok(Some(write));
        }
        if ts_required.is_none() {
            return Ok(None);
        }
        self.store.pending_get(key, ts_required)
    }

    fn set(&self, write: Write) -> CoreResult<()> {
        if let Err(e) = self.store.pending_add(&write) {
            self.stats.record_rejected_set();
            debug!(key = %write.key(), ts = %write.ts(), error = %e, "pending add rejected");
            return Err(e);
        }
        self.stats.record_set();
        debug!(key = %write.key(), ts = %write.ts(), sibs = write.sibs().len(), "pending add");

        self.fan_out(&write)
    }
}

impl<S: Store, P: Peer> NotifyReceiver for Controller<S, P> {
    fn receive_notify(&self, from_replica: &ReplicaAddr, notify: Notify) -> CoreResult<()> {
        self.stats.record_ack_received();
        let acks = self
            .store
            .ack(&notify.to_key, &notify.from_key, notify.ts, from_replica)?;
        trace!(
            from = %from_replica,
            to_key = %notify.to_key,
            from_key = %notify.from_key,
            ts = %notify.ts,
            acks,
            acks_needed = notify.acks_needed,
            "ack recorded"
        );

        if acks < notify.acks_needed {
            return Ok(());
        }

        match self.store.pending_promote(&notify.to_key, notify.ts) {
            Ok(()) => {
                self.stats.record_promotion();
                debug!(key = %notify.to_key, ts = %notify.ts, "promoted");
                Ok(())
            }
            Err(CoreError::NotFound { promoted: true, .. }) => {
                self.stats.record_duplicate_promotion();
                trace!(key = %notify.to_key, ts = %notify.ts, "already promoted");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}
