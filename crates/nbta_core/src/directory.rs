//! Static replica placement.
//!
//! Keys are placed with rendezvous (highest random weight) hashing: every
//! replica scores `sha256(replica || 0x00 || key)` and the top
//! `replication_factor` scores own the key. Any process computes the same
//! placement from the same replica list, and adding a replica only moves
//! the keys it wins.

use crate::error::{CoreError, CoreResult};
use crate::peer::ReplicaDirectory;
use crate::types::{Key, ReplicaAddr};
use sha2::{Digest, Sha256};
use std::collections::HashMap;

/// A fixed replica set with a uniform replication factor.
///
/// A uniform factor keeps `|sibs| × |replicas|` equal to the number of
/// distinct acknowledgers a multi-key write actually produces. Per-key
/// overrides set with [`StaticDirectory::with_placement`] must therefore
/// name exactly `replication_factor` replicas.
#[derive(Debug, Clone)]
pub struct StaticDirectory {
    replicas: Vec<ReplicaAddr>,
    replication_factor: usize,
    pinned: HashMap<Key, Vec<ReplicaAddr>>,
}

impl StaticDirectory {
    /// Creates a directory over `replicas` placing each key on
    /// `replication_factor` of them.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidArgument`] if the replica list is empty,
    /// has duplicates, or is smaller than the replication factor, or if the
    /// factor is zero.
    pub fn new(
        replicas: impl IntoIterator<Item = ReplicaAddr>,
        replication_factor: usize,
    ) -> CoreResult<Self> {
        let mut replicas: Vec<ReplicaAddr> = replicas.into_iter().collect();
        let count = replicas.len();
        replicas.sort();
        replicas.dedup();
        if replicas.len() != count {
            return Err(CoreError::invalid_argument("duplicate replica address"));
        }
        if replication_factor == 0 || replication_factor > replicas.len() {
            return Err(CoreError::invalid_argument(format!(
                "replication factor {replication_factor} invalid for {} replicas",
                replicas.len()
            )));
        }
        Ok(Self {
            replicas,
            replication_factor,
            pinned: HashMap::new(),
        })
    }

    /// Places every key on every replica.
    ///
    /// # Errors
    ///
    /// Same as [`StaticDirectory::new`].
    pub fn full(replicas: impl IntoIterator<Item = ReplicaAddr>) -> CoreResult<Self> {
        let replicas: Vec<ReplicaAddr> = replicas.into_iter().collect();
        let factor = replicas.len();
        Self::new(replicas, factor)
    }

    /// Pins `key` to an explicit replica list.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidArgument`] if the list length differs
    /// from the replication factor or names an unknown replica.
    pub fn with_placement(
        mut self,
        key: Key,
        replicas: impl IntoIterator<Item = ReplicaAddr>,
    ) -> CoreResult<Self> {
        let replicas: Vec<ReplicaAddr> = replicas.into_iter().collect();
        if replicas.len() != self.replication_factor {
            return Err(CoreError::invalid_argument(format!(
                "placement for {key} names {} replicas, factor is {}",
                replicas.len(),
                self.replication_factor
            )));
        }
        if let Some(unknown) = replicas.iter().find(|r| !self.replicas.contains(r)) {
            return Err(CoreError::invalid_argument(format!(
                "placement for {key} names unknown replica {unknown}"
            )));
        }
        let mut replicas = replicas;
        replicas.sort();
        replicas.dedup();
        if replicas.len() != self.replication_factor {
            return Err(CoreError::invalid_argument(format!(
                "placement for {key} repeats a replica"
            )));
        }
        self.pinned.insert(key, replicas);
        Ok(self)
    }

    /// Every replica in the directory, sorted.
    pub fn replicas(&self) -> &[ReplicaAddr] {
        &self.replicas
    }

    /// Replicas per key.
    pub fn replication_factor(&self) -> usize {
        self.replication_factor
    }
}

fn score(replica: &ReplicaAddr, key: &Key) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(replica.as_str().as_bytes());
    hasher.update([0u8]);
    hasher.update(key.as_bytes());
    let mut out = [0u8; 32];
    out.copy_from_slice(&hasher.finalize());
    out
}

impl ReplicaDirectory for StaticDirectory {
    fn replicas_for(&self, key: &Key) -> Vec<ReplicaAddr> {
        if let Some(pinned) = self.pinned.get(key) {
            return pinned.clone();
        }
        if self.replication_factor == self.replicas.len() {
            return self.replicas.clone();
        }
        let mut scored: Vec<([u8; 32], &ReplicaAddr)> =
            self.replicas.iter().map(|r| (score(r, key), r)).collect();
        scored.sort_by(|a, b| b.0.cmp(&a.0));
        let mut chosen: Vec<ReplicaAddr> = scored
            .into_iter()
            .take(self.replication_factor)
            .map(|(_, r)| r.clone())
            .collect();
        chosen.sort();
        chosen
    }
}
