//! Transport counters.

use std::sync::atomic::{AtomicU64, Ordering};

/// Frame counters for a [`crate::Network`].
#[derive(Debug, Default)]
pub struct NetworkStats {
    enqueued: AtomicU64,
    delivered: AtomicU64,
    duplicated: AtomicU64,
    dropped: AtomicU64,
    rejected: AtomicU64,
    undeliverable: AtomicU64,
    receive_failures: AtomicU64,
    malformed: AtomicU64,
}

impl NetworkStats {
    pub(crate) fn record_enqueued(&self) {
        self.enqueued.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_delivered(&self) {
        self.delivered.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_duplicated(&self) {
        self.duplicated.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_undeliverable(&self) {
        self.undeliverable.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_receive_failure(&self) {
        self.receive_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_malformed(&self) {
        self.malformed.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns a snapshot of all counters.
    pub fn snapshot(&self) -> NetworkStatsSnapshot {
        NetworkStatsSnapshot {
            enqueued: self.enqueued.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            duplicated: self.duplicated.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            undeliverable: self.undeliverable.load(Ordering::Relaxed),
            receive_failures: self.receive_failures.load(Ordering::Relaxed),
            malformed: self.malformed.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`NetworkStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NetworkStatsSnapshot {
    /// Frames accepted into a mailbox.
    pub enqueued: u64,
    /// Frames handed to a receiver, including duplicates.
    pub delivered: u64,
    /// Extra deliveries injected by fault config.
    pub duplicated: u64,
    /// Frames evicted by [`crate::OverflowPolicy::DropOldest`].
    pub dropped: u64,
    /// Frames refused by [`crate::OverflowPolicy::Reject`].
    pub rejected: u64,
    /// Frames whose destination was gone at delivery time.
    pub undeliverable: u64,
    /// Deliveries the receiver returned an error for.
    pub receive_failures: u64,
    /// Frames that failed to decode and were discarded.
    pub malformed: u64,
}
