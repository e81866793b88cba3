//! Transport configuration.

use crate::error::{TransportError, TransportResult};

/// What a full mailbox does with a new frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverflowPolicy {
    /// Refuse the new frame with [`TransportError::Backpressure`].
    #[default]
    Reject,
    /// Evict the oldest queued frame to make room.
    ///
    /// Delivery is then best effort only; a write whose notify was evicted
    /// stays pending until repaired out of band.
    DropOldest,
}

/// Fault injection applied by the delivery pump.
#[derive(Debug, Clone, PartialEq)]
pub struct FaultConfig {
    /// Probability in `[0, 1]` that a delivered frame is delivered twice.
    pub duplicate_probability: f64,
    /// Shuffle the frames of each delivery round.
    pub reorder: bool,
    /// Seed for the fault RNG, so runs are reproducible.
    pub seed: u64,
}

impl FaultConfig {
    /// No faults.
    pub fn none() -> Self {
        Self {
            duplicate_probability: 0.0,
            reorder: false,
            seed: 0,
        }
    }

    /// Sets the duplicate probability.
    pub fn with_duplicate_probability(mut self, p: f64) -> Self {
        self.duplicate_probability = p;
        self
    }

    /// Enables or disables reordering.
    pub fn with_reorder(mut self, reorder: bool) -> Self {
        self.reorder = reorder;
        self
    }

    /// Sets the RNG seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Returns true if any fault is enabled.
    pub fn is_active(&self) -> bool {
        self.duplicate_probability > 0.0 || self.reorder
    }
}

impl Default for FaultConfig {
    fn default() -> Self {
        Self::none()
    }
}

/// Configuration for a [`crate::Network`].
#[derive(Debug, Clone, PartialEq)]
pub struct TransportConfig {
    /// Maximum frames queued per `(from, to)` link.
    pub mailbox_capacity: usize,
    /// Behaviour when a link's mailbox is full.
    pub overflow: OverflowPolicy,
    /// Fault injection.
    pub fault: FaultConfig,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            mailbox_capacity: 1024,
            overflow: OverflowPolicy::Reject,
            fault: FaultConfig::none(),
        }
    }
}

impl TransportConfig {
    /// Creates the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the per-link mailbox capacity.
    pub fn with_mailbox_capacity(mut self, capacity: usize) -> Self {
        self.mailbox_capacity = capacity;
        self
    }

    /// Sets the overflow policy.
    pub fn with_overflow(mut self, overflow: OverflowPolicy) -> Self {
        self.overflow = overflow;
        self
    }

    /// Sets fault injection.
    pub fn with_fault(mut self, fault: FaultConfig) -> Self {
        self.fault = fault;
        self
    }

    /// Checks the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::InvalidConfig`] for a zero capacity or a
    /// duplicate probability outside `[0, 1]`.
    pub fn validate(&self) -> TransportResult<()> {
        if self.mailbox_capacity == 0 {
            return Err(TransportError::InvalidConfig(
                "mailbox_capacity must be at least 1".into(),
            ));
        }
        let p = self.fault.duplicate_probability;
        if !(0.0..=1.0).contains(&p) {
            return Err(TransportError::InvalidConfig(format!(
                "duplicate_probability {p} is outside [0, 1]"
            )));
        }
        Ok(())
    }
}
