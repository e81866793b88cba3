//! The in-process message network.
//!
//! A [`Network`] is an explicit registry of replica endpoints plus one
//! bounded [`Mailbox`] per `(from, to)` link. Senders enqueue CBOR frames
//! and return immediately; frames are delivered either by the caller
//! pumping [`Network::deliver_next`] / [`Network::deliver_all`], or by a
//! background task started with [`Network::spawn_delivery`].
//!
//! Endpoints are held as `Weak` references: the network never keeps a
//! replica alive, and frames for a replica that has gone away are counted
//! as undeliverable and discarded.

use crate::config::TransportConfig;
use crate::error::{TransportError, TransportResult};
use crate::mailbox::{Mailbox, Offer};
use crate::message::NotifyEnvelope;
use crate::peer::NetworkPeer;
use crate::stats::NetworkStats;
use nbta_core::{Notify, NotifyReceiver, ReplicaAddr, ReplicaDirectory, Server};
use parking_lot::{Mutex, RwLock};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Weak};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

/// A replica as seen by the network: it serves client requests and
/// receives notifications.
pub trait Endpoint: Server + NotifyReceiver {}

impl<T: Server + NotifyReceiver> Endpoint for T {}

type Link = (ReplicaAddr, ReplicaAddr);

struct Links {
    mailboxes: BTreeMap<Link, Mailbox>,
    /// Frames queued across all mailboxes.
    queued: usize,
    rng: StdRng,
}

/// Registry and mailboxes for a set of replicas.
pub struct Network {
    config: TransportConfig,
    directory: Arc<dyn ReplicaDirectory>,
    endpoints: RwLock<HashMap<ReplicaAddr, Weak<dyn Endpoint>>>,
    links: Mutex<Links>,
    /// Signalled when the network goes from idle to having a frame queued.
    data_to_send: tokio::sync::Notify,
    stats: NetworkStats,
}

impl Network {
    /// Creates a network resolving placement through `directory`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::InvalidConfig`] if `config` is invalid.
    pub fn new(
        directory: impl ReplicaDirectory + 'static,
        config: TransportConfig,
    ) -> TransportResult<Arc<Self>> {
        config.validate()?;
        let rng = StdRng::seed_from_u64(config.fault.seed);
        Ok(Arc::new(Self {
            config,
            directory: Arc::new(directory),
            endpoints: RwLock::new(HashMap::new()),
            links: Mutex::new(Links {
                mailboxes: BTreeMap::new(),
                queued: 0,
                rng,
            }),
            data_to_send: tokio::sync::Notify::new(),
            stats: NetworkStats::default(),
        }))
    }

    /// The configuration.
    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// The placement resolver shared by every peer.
    pub fn directory(&self) -> &Arc<dyn ReplicaDirectory> {
        &self.directory
    }

    /// Frame counters.
    pub fn stats(&self) -> &NetworkStats {
        &self.stats
    }

    /// Returns a peer sending on behalf of `local`.
    pub fn peer(self: &Arc<Self>, local: ReplicaAddr) -> NetworkPeer {
        NetworkPeer::new(local, Arc::clone(self))
    }

    /// Registers `endpoint` under `addr`, replacing any previous endpoint.
    pub fn register<E: Endpoint + 'static>(&self, addr: ReplicaAddr, endpoint: &Arc<E>) {
        let weak = Arc::downgrade(endpoint);
        let weak: Weak<dyn Endpoint> = weak;
        debug!(replica = %addr, "endpoint registered");
        self.endpoints.write().insert(addr, weak);
    }

    /// Removes the endpoint under `addr`. Returns false if none was registered.
    pub fn deregister(&self, addr: &ReplicaAddr) -> bool {
        self.endpoints.write().remove(addr).is_some()
    }

    /// Returns the live endpoint registered under `addr`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::UnknownReplica`] if nothing is registered or
    /// the endpoint has been dropped.
    pub fn endpoint(&self, addr: &ReplicaAddr) -> TransportResult<Arc<dyn Endpoint>> {
        self.endpoints
            .read()
            .get(addr)
            .and_then(Weak::upgrade)
            .ok_or_else(|| TransportError::UnknownReplica(addr.clone()))
    }

    /// Number of frames waiting for delivery.
    pub fn queued(&self) -> usize {
        self.links.lock().queued
    }

    /// Enqueues `notify` on the `(from, to)` link without waiting for it to
    /// be delivered.
    ///
    /// # Errors
    ///
    /// - [`TransportError::UnknownReplica`] if `to` is not registered
    /// - [`TransportError::Backpressure`] if the link is full and the
    ///   overflow policy rejects new frames
    pub fn send(&self, from: &ReplicaAddr, to: &ReplicaAddr, notify: Notify) -> TransportResult<()> {
        if !self.endpoints.read().contains_key(to) {
            return Err(TransportError::UnknownReplica(to.clone()));
        }
        let frame = NotifyEnvelope {
            from: from.clone(),
            to: to.clone(),
            notify,
        }
        .encode()?;

        let was_idle = {
            let mut guard = self.links.lock();
            let links = &mut *guard;
            let was_idle = links.queued == 0;
            let capacity = self.config.mailbox_capacity;
            let mailbox = links
                .mailboxes
                .entry((from.clone(), to.clone()))
                .or_insert_with(|| Mailbox::new(capacity));

            match mailbox.offer(frame, self.config.overflow) {
                Offer::Queued => links.queued += 1,
                Offer::Evicted => {
                    self.stats.record_dropped();
                    warn!(from = %from, to = %to, capacity, "mailbox full, dropped oldest frame");
                }
                Offer::Refused => {
                    self.stats.record_rejected();
                    warn!(from = %from, to = %to, capacity, "mailbox full, frame rejected");
                    return Err(TransportError::Backpressure {
                        to: to.clone(),
                        capacity: mailbox.capacity(),
                    });
                }
            }
            trace!(from = %from, to = %to, depth = mailbox.len(), "frame queued");
            was_idle
        };

        self.stats.record_enqueued();
        if was_idle {
            self.data_to_send.notify_one();
        }
        Ok(())
    }

    /// Delivers the oldest frame of the first non-empty link.
    ///
    /// Returns false if nothing was queued.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Codec`] if the frame cannot be decoded.
    pub fn deliver_next(&self) -> TransportResult<bool> {
        let (frame, duplicate) = {
            let mut guard = self.links.lock();
            let links = &mut *guard;
            let Some(frame) = links.mailboxes.values_mut().find_map(Mailbox::pop) else {
                return Ok(false);
            };
            links.queued -= 1;
            let duplicate = self.roll_duplicate(&mut links.rng);
            (frame, duplicate)
        };

        self.dispatch(&frame)?;
        if duplicate {
            self.stats.record_duplicated();
            self.dispatch(&frame)?;
        }
        Ok(true)
    }

    /// Delivers rounds of frames until every mailbox is empty.
    ///
    /// Each round takes every queued frame in link order, shuffled if
    /// reordering is enabled. Returns the number of frames taken off the
    /// queues; injected duplicates are not counted. Frames that fail to
    /// decode are counted as malformed, logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Codec`] only if a duplicate of a frame that
    /// already decoded once fails to decode.
    pub fn deliver_all(&self) -> TransportResult<usize> {
        let mut total = 0;
        loop {
            let round = self.take_round();
            if round.is_empty() {
                return Ok(total);
            }
            total += round.len();
            for (frame, duplicate) in round {
                // The round is already off the queues; one bad frame must
                // not cost the frames behind it.
                if let Err(e) = self.dispatch(&frame) {
                    warn!(error = %e, len = frame.len(), "discarding malformed frame");
                    continue;
                }
                if duplicate {
                    self.stats.record_duplicated();
                    self.dispatch(&frame)?;
                }
            }
        }
    }

    /// Starts a tokio task that delivers frames as they are queued.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn_delivery(self: &Arc<Self>) -> DeliveryHandle {
        let (stop, mut stopped) = watch::channel(false);
        let network = Arc::clone(self);
        let task = tokio::spawn(async move {
            debug!("delivery task started");
            loop {
                if let Err(e) = network.deliver_all() {
                    warn!(error = %e, "delivery round failed");
                }
                tokio::select! {
                    _ = stopped.changed() => break,
                    () = network.data_to_send.notified() => {}
                }
            }
            debug!("delivery task stopped");
        });
        DeliveryHandle { stop, task }
    }

    fn take_round(&self) -> Vec<(Vec<u8>, bool)> {
        let mut guard = self.links.lock();
        let links = &mut *guard;
        if links.queued == 0 {
            return Vec::new();
        }
        let mut frames: Vec<Vec<u8>> = Vec::with_capacity(links.queued);
        for mailbox in links.mailboxes.values_mut() {
            frames.extend(mailbox.drain());
        }
        links.queued = 0;

        if self.config.fault.reorder {
            frames.shuffle(&mut links.rng);
        }
        frames
            .into_iter()
            .map(|frame| {
                let duplicate = self.roll_duplicate(&mut links.rng);
                (frame, duplicate)
            })
            .collect()
    }

    fn roll_duplicate(&self, rng: &mut StdRng) -> bool {
        let p = self.config.fault.duplicate_probability;
        p > 0.0 && rng.gen_bool(p)
    }

    fn dispatch(&self, frame: &[u8]) -> TransportResult<()> {
        let envelope = NotifyEnvelope::decode(frame).inspect_err(|_| {
            self.stats.record_malformed();
        })?;
        let endpoint = self
            .endpoints
            .read()
            .get(&envelope.to)
            .and_then(Weak::upgrade);
        let Some(endpoint) = endpoint else {
            self.stats.record_undeliverable();
            warn!(from = %envelope.from, to = %envelope.to, "destination gone, frame discarded");
            return Ok(());
        };

        self.stats.record_delivered();
        let NotifyEnvelope { from, to, notify } = envelope;
        if let Err(e) = endpoint.receive_notify(&from, notify) {
            self.stats.record_receive_failure();
            warn!(from = %from, to = %to, error = %e, "receiver rejected notify");
        }
        Ok(())
    }
}

/// Handle to a background delivery task.
///
/// Dropping the handle also stops the task, without waiting for it.
pub struct DeliveryHandle {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl DeliveryHandle {
    /// Stops the task and waits for it to exit.
    pub async fn shutdown(self) {
        let _ = self.stop.send(true);
        if let Err(e) = self.task.await {
            warn!(error = %e, "delivery task ended abnormally");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FaultConfig, OverflowPolicy};
    use nbta_core::{
        Controller, CoreError, Key, MemoryStore, Peer, StaticDirectory, Timestamp, Write,
    };
    use std::time::Duration;

    type Replica = Controller<MemoryStore, NetworkPeer>;

    fn addr(s: &str) -> ReplicaAddr {
        ReplicaAddr::from(s)
    }

    fn setup(names: &[&str], config: TransportConfig) -> (Arc<Network>, Vec<Arc<Replica>>) {
        let directory = StaticDirectory::full(names.iter().map(|n| addr(n))).unwrap();
        let network = Network::new(directory, config).unwrap();
        let replicas = names
            .iter()
            .map(|n| {
                let replica = Arc::new(Controller::new(
                    MemoryStore::new(),
                    network.peer(addr(n)),
                ));
                network.register(addr(n), &replica);
                replica
            })
            .collect();
        (network, replicas)
    }

    fn notify(ts: u64) -> Notify {
        Notify {
            to_key: Key::from("x"),
            from_key: Key::from("x"),
            ts: Timestamp::new(ts),
            acks_needed: 1,
        }
    }

    #[test]
    fn delivery_promotes_a_single_replica_write() {
        let (network, replicas) = setup(&["r1"], TransportConfig::default());
        let w = Write::single(Key::from("x"), Some(b"xxx".to_vec()), Timestamp::new(10));
        replicas[0].set(w).unwrap();
        assert_eq!(network.queued(), 1);

        assert_eq!(network.deliver_all().unwrap(), 1);
        let found = replicas[0].get(&Key::from("x"), Timestamp::NONE).unwrap();
        assert_eq!(found.unwrap().val(), Some(&b"xxx"[..]));
        assert_eq!(network.stats().snapshot().delivered, 1);
    }

    #[test]
    fn deliver_next_pumps_one_frame() {
        let (network, _replicas) = setup(&["r1", "r2"], TransportConfig::default());
        network.send(&addr("r1"), &addr("r2"), notify(1)).unwrap();
        network.send(&addr("r2"), &addr("r1"), notify(1)).unwrap();

        assert!(network.deliver_next().unwrap());
        assert_eq!(network.queued(), 1);
        assert!(network.deliver_next().unwrap());
        assert!(!network.deliver_next().unwrap());
    }

    #[test]
    fn reject_policy_reports_backpressure() {
        let config = TransportConfig::new().with_mailbox_capacity(1);
        let (network, _replicas) = setup(&["r1", "r2"], config);
        let peer = network.peer(addr("r1"));

        peer.async_notify(&addr("r2"), notify(1)).unwrap();
        let err = peer.async_notify(&addr("r2"), notify(2)).unwrap_err();
        assert!(err.is_retryable());
        assert!(matches!(err, CoreError::Transport { .. }));

        // Other links are unaffected.
        peer.async_notify(&addr("r1"), notify(3)).unwrap();
        let snap = network.stats().snapshot();
        assert_eq!(snap.rejected, 1);
        assert_eq!(snap.enqueued, 2);
    }

    #[test]
    fn drop_oldest_policy_evicts() {
        let config = TransportConfig::new()
            .with_mailbox_capacity(1)
            .with_overflow(OverflowPolicy::DropOldest);
        let (network, _replicas) = setup(&["r1", "r2"], config);

        network.send(&addr("r1"), &addr("r2"), notify(1)).unwrap();
        network.send(&addr("r1"), &addr("r2"), notify(2)).unwrap();
        assert_eq!(network.queued(), 1);
        assert_eq!(network.stats().snapshot().dropped, 1);
    }

    #[test]
    fn unknown_destination_is_rejected_at_send() {
        let (network, _replicas) = setup(&["r1"], TransportConfig::default());
        let err = network
            .send(&addr("r1"), &addr("nowhere"), notify(1))
            .unwrap_err();
        assert_eq!(err, TransportError::UnknownReplica(addr("nowhere")));
    }

    #[test]
    fn frames_for_dropped_replica_are_discarded() {
        let (network, mut replicas) = setup(&["r1", "r2"], TransportConfig::default());
        network.send(&addr("r1"), &addr("r2"), notify(1)).unwrap();
        drop(replicas.pop());

        assert_eq!(network.deliver_all().unwrap(), 1);
        let snap = network.stats().snapshot();
        assert_eq!(snap.undeliverable, 1);
        assert_eq!(snap.delivered, 0);
        assert!(network.endpoint(&addr("r2")).is_err());
    }

    #[test]
    fn malformed_frame_does_not_cost_the_rest_of_the_round() {
        let (network, replicas) = setup(&["r1"], TransportConfig::default());
        {
            let mut links = network.links.lock();
            let offered = links
                .mailboxes
                .entry((addr("r0"), addr("r1")))
                .or_insert_with(|| Mailbox::new(8))
                .offer(vec![0xFF, 0x00, 0x13], OverflowPolicy::Reject);
            assert!(matches!(offered, Offer::Queued));
            links.queued += 1;
        }
        let w = Write::single(Key::from("x"), Some(b"xxx".to_vec()), Timestamp::new(10));
        replicas[0].set(w).unwrap();

        assert_eq!(network.deliver_all().unwrap(), 2);
        assert_eq!(network.queued(), 0);
        let found = replicas[0].get(&Key::from("x"), Timestamp::NONE).unwrap();
        assert!(found.is_some());
        let snap = network.stats().snapshot();
        assert_eq!(snap.malformed, 1);
        assert_eq!(snap.delivered, 1);
    }

    #[test]
    fn duplicated_frames_promote_once() {
        let config = TransportConfig::new().with_fault(
            FaultConfig::none()
                .with_duplicate_probability(1.0)
                .with_reorder(true)
                .with_seed(3),
        );
        let (network, replicas) = setup(&["r1", "r2"], config);
        let w = Write::single(Key::from("x"), Some(b"v".to_vec()), Timestamp::new(5));
        for replica in &replicas {
            replica.set(w.clone()).unwrap();
        }

        assert_eq!(network.deliver_all().unwrap(), 4);
        let snap = network.stats().snapshot();
        assert_eq!(snap.duplicated, 4);
        assert_eq!(snap.delivered, 8);
        assert_eq!(snap.receive_failures, 0);
        for replica in &replicas {
            let stats = replica.stats().snapshot();
            assert_eq!(stats.promotions, 1);
            assert_eq!(stats.duplicate_promotions, 1);
        }
    }

    #[test]
    fn invalid_config_is_refused() {
        let directory = StaticDirectory::full([addr("r1")]).unwrap();
        let config = TransportConfig::new().with_mailbox_capacity(0);
        assert!(matches!(
            Network::new(directory, config),
            Err(TransportError::InvalidConfig(_))
        ));
    }

    #[tokio::test]
    async fn background_delivery_reaches_quorum() {
        let (network, replicas) = setup(&["r1", "r2", "r3"], TransportConfig::default());
        let handle = network.spawn_delivery();

        let w = Write::single(Key::from("x"), Some(b"bg".to_vec()), Timestamp::new(9));
        for replica in &replicas {
            replica.set(w.clone()).unwrap();
        }

        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let all_visible = replicas.iter().all(|r| {
                    r.get(&Key::from("x"), Timestamp::NONE)
                        .map(|found| found.is_some())
                        .unwrap_or(false)
                });
                if all_visible {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        })
        .await
        .unwrap();

        handle.shutdown().await;
        assert_eq!(network.queued(), 0);
    }
}
