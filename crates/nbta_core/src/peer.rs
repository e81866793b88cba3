//! Inter-replica messaging contracts.

use crate::error::CoreResult;
use crate::types::{Key, ReplicaAddr, Timestamp};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Notification that `from_key@ts` (one piece of a multi-key write)
/// must be acknowledged against `to_key`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notify {
    /// Key the receiving replica credits the acknowledgment to.
    pub to_key: Key,
    /// Key whose write triggered the notification.
    pub from_key: Key,
    /// Timestamp of the multi-key write.
    pub ts: Timestamp,
    /// Distinct acknowledgers required before `to_key@ts` is promoted.
    pub acks_needed: usize,
}

/// Resolves which replicas are responsible for a key.
///
/// Placement is external to the protocol; implementations are injected
/// explicitly rather than looked up from process-wide state.
pub trait ReplicaDirectory: Send + Sync {
    /// Returns the replicas responsible for `key`, in a stable order.
    fn replicas_for(&self, key: &Key) -> Vec<ReplicaAddr>;
}

impl<D: ReplicaDirectory + ?Sized> ReplicaDirectory for Arc<D> {
    fn replicas_for(&self, key: &Key) -> Vec<ReplicaAddr> {
        (**self).replicas_for(key)
    }
}

/// The sending half of inter-replica messaging, bound to one local replica.
pub trait Peer: Send + Sync {
    /// Returns the replicas responsible for `key`.
    fn replicas_for(&self, key: &Key) -> Vec<ReplicaAddr>;

    /// Queues `notify` for `to_replica` without waiting for delivery.
    ///
    /// Delivery is at-least-once and may be delayed, duplicated or
    /// reordered.
    ///
    /// # Errors
    ///
    /// Returns an error if the message could not be enqueued.
    fn async_notify(&self, to_replica: &ReplicaAddr, notify: Notify) -> CoreResult<()>;
}

impl<P: Peer + ?Sized> Peer for Arc<P> {
    fn replicas_for(&self, key: &Key) -> Vec<ReplicaAddr> {
        (**self).replicas_for(key)
    }

    fn async_notify(&self, to_replica: &ReplicaAddr, notify: Notify) -> CoreResult<()> {
        (**self).async_notify(to_replica, notify)
    }
}

/// The receiving half of inter-replica messaging.
pub trait NotifyReceiver: Send + Sync {
    /// Handles a notification sent by `from_replica`.
    ///
    /// # Errors
    ///
    /// Returns store failures and genuine missing-write promotions.
    fn receive_notify(&self, from_replica: &ReplicaAddr, notify: Notify) -> CoreResult<()>;
}
