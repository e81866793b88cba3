//! Protocol counters for a replica's controller.

use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic counters updated by [`crate::Controller`].
///
/// Counters are atomic and may be read while operations are in flight.
#[derive(Debug, Default)]
pub struct ControllerStats {
    /// Writes accepted into the pending set.
    sets: AtomicU64,
    /// Writes rejected by `pending_add`.
    rejected_sets: AtomicU64,
    /// Notifications enqueued.
    notifies_sent: AtomicU64,
    /// Notifications that failed to enqueue.
    notify_failures: AtomicU64,
    /// Notifications received.
    acks_received: AtomicU64,
    /// Pending writes promoted to stable.
    promotions: AtomicU64,
    /// Promotions skipped because the write was already stable.
    duplicate_promotions: AtomicU64,
}

impl ControllerStats {
    /// Creates zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_set(&self) {
        self.sets.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_rejected_set(&self) {
        self.rejected_sets.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_notify_sent(&self) {
        self.notifies_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_notify_failure(&self) {
        self.notify_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_ack_received(&self) {
        self.acks_received.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_promotion(&self) {
        self.promotions.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_duplicate_promotion(&self) {
        self.duplicate_promotions.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns a snapshot of all counters.
    pub fn snapshot(&self) -> ControllerStatsSnapshot {
        ControllerStatsSnapshot {
            sets: self.sets.load(Ordering::Relaxed),
            rejected_sets: self.rejected_sets.load(Ordering::Relaxed),
            notifies_sent: self.notifies_sent.load(Ordering::Relaxed),
            notify_failures: self.notify_failures.load(Ordering::Relaxed),
            acks_received: self.acks_received.load(Ordering::Relaxed),
            promotions: self.promotions.load(Ordering::Relaxed),
            duplicate_promotions: self.duplicate_promotions.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`ControllerStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControllerStatsSnapshot {
    /// Writes accepted into the pending set.
    pub sets: u64,
    /// Writes rejected by `pending_add`.
    pub rejected_sets: u64,
    /// Notifications enqueued.
    pub notifies_sent: u64,
    /// Notifications that failed to enqueue.
    pub notify_failures: u64,
    /// Notifications received.
    pub acks_received: u64,
    /// Pending writes promoted to stable.
    pub promotions: u64,
    /// Promotions skipped because the write was already stable.
    pub duplicate_promotions: u64,
}
