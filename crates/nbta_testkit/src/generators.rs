//! Property-based test generators using proptest.

use nbta_core::{Key, ReplicaAddr, Timestamp};
use proptest::prelude::*;

/// Strategy for keys drawn from a small alphabet, so generated
/// transactions overlap often.
pub fn key_strategy() -> impl Strategy<Value = Key> {
    prop::string::string_regex("[a-f]{1,2}")
        .expect("Invalid regex")
        .prop_map(Key::from)
}

/// Strategy for values.
pub fn value_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..64)
}

/// Strategy for non-sentinel timestamps.
pub fn timestamp_strategy() -> impl Strategy<Value = Timestamp> {
    (1u64..1_000_000).prop_map(Timestamp::new)
}

/// Strategy for replica addresses out of a fixed pool of eight.
pub fn replica_strategy() -> impl Strategy<Value = ReplicaAddr> {
    (0u8..8).prop_map(|i| ReplicaAddr::new(format!("r{i}")))
}

/// Strategy for the writes of one transaction: distinct keys, sorted.
pub fn write_batch_strategy() -> impl Strategy<Value = Vec<(Key, Vec<u8>)>> {
    prop::collection::btree_map(key_strategy(), value_strategy(), 1..5)
        .prop_map(|writes| writes.into_iter().collect())
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}
