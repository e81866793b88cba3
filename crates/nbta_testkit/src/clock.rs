//! Client-side timestamp generation.

use nbta_core::Timestamp;
use std::sync::atomic::{AtomicU64, Ordering};

/// A Lamport-style clock stamping every timestamp with a fixed client tag.
///
/// Two sources never produce the same timestamp unless they share a tag.
/// Observing a timestamp from elsewhere moves the clock past it, so writes
/// issued after a read always sort after what was read.
#[derive(Debug)]
pub struct TimestampSource {
    logical: AtomicU64,
    entropy: u16,
}

impl TimestampSource {
    /// Creates a source with a random client tag.
    pub fn new() -> Self {
        Self::with_entropy(rand::random())
    }

    /// Creates a source with a fixed client tag.
    pub fn with_entropy(entropy: u16) -> Self {
        Self {
            logical: AtomicU64::new(0),
            entropy,
        }
    }

    /// The client tag.
    pub fn entropy(&self) -> u16 {
        self.entropy
    }

    /// Returns a timestamp greater than every one issued or observed.
    pub fn next(&self) -> Timestamp {
        let logical = self.logical.fetch_add(1, Ordering::SeqCst) + 1;
        Timestamp::compose(logical, self.entropy)
    }

    /// Advances the clock to at least the logical part of `ts`.
    pub fn observe(&self, ts: Timestamp) {
        self.logical.fetch_max(ts.logical(), Ordering::SeqCst);
    }
}

impl Default for TimestampSource {
    fn default() -> Self {
        Self::new()
    }
}
