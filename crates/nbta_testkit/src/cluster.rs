//! Multi-replica test deployments.
//!
//! A [`Cluster`] wires one [`Controller`] over a [`MemoryStore`] per replica
//! onto a shared [`Network`], and hands out transactions routed through a
//! [`ClusterClient`]. Nothing is delivered until [`Cluster::settle`] (or a
//! background delivery task) pumps the network, so tests can observe the
//! pending window directly.

use nbta_core::{
    Controller, CoreResult, Key, MemoryStore, ReplicaAddr, StaticDirectory, Timestamp,
    Transaction,
};
use nbta_transport::{ClusterClient, Network, NetworkPeer, TransportConfig};
use std::collections::BTreeMap;
use std::sync::Arc;

/// The controller type every cluster replica runs.
pub type ReplicaController = Controller<MemoryStore, NetworkPeer>;

/// Builder for [`Cluster`].
#[derive(Debug, Clone)]
pub struct ClusterBuilder {
    replicas: Vec<ReplicaAddr>,
    replication_factor: Option<usize>,
    placements: Vec<(Key, Vec<ReplicaAddr>)>,
    transport: TransportConfig,
}

impl Default for ClusterBuilder {
    fn default() -> Self {
        Self {
            replicas: ["r1", "r2", "r3"].map(ReplicaAddr::from).to_vec(),
            replication_factor: None,
            placements: Vec::new(),
            transport: TransportConfig::default(),
        }
    }
}

impl ClusterBuilder {
    /// Sets the replica addresses.
    pub fn replicas<I, A>(mut self, addrs: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: AsRef<str>,
    {
        self.replicas = addrs
            .into_iter()
            .map(|a| ReplicaAddr::new(a.as_ref()))
            .collect();
        self
    }

    /// Sets replicas per key. Defaults to every replica.
    pub fn replication_factor(mut self, factor: usize) -> Self {
        self.replication_factor = Some(factor);
        self
    }

    /// Pins `key` to explicit replicas.
    pub fn placement<A: AsRef<str>>(
        mut self,
        key: &str,
        replicas: impl IntoIterator<Item = A>,
    ) -> Self {
        let replicas = replicas
            .into_iter()
            .map(|a| ReplicaAddr::new(a.as_ref()))
            .collect();
        self.placements.push((Key::from(key), replicas));
        self
    }

    /// Sets the transport configuration.
    pub fn transport(mut self, config: TransportConfig) -> Self {
        self.transport = config;
        self
    }

    /// Builds the cluster.
    ///
    /// # Errors
    ///
    /// Invalid replica lists, placements or transport configuration.
    pub fn build(self) -> CoreResult<Cluster> {
        let factor = self.replication_factor.unwrap_or(self.replicas.len());
        let mut directory = StaticDirectory::new(self.replicas.clone(), factor)?;
        for (key, replicas) in self.placements {
            directory = directory.with_placement(key, replicas)?;
        }

        let network = Network::new(directory.clone(), self.transport)?;
        let mut replicas = BTreeMap::new();
        for addr in self.replicas {
            let controller = Arc::new(Controller::new(
                MemoryStore::new(),
                network.peer(addr.clone()),
            ));
            network.register(addr.clone(), &controller);
            replicas.insert(addr, controller);
        }

        Ok(Cluster {
            client: ClusterClient::new(Arc::clone(&network)),
            network,
            directory,
            replicas,
        })
    }
}

/// A set of replicas sharing one network.
pub struct Cluster {
    network: Arc<Network>,
    directory: StaticDirectory,
    replicas: BTreeMap<ReplicaAddr, Arc<ReplicaController>>,
    client: ClusterClient,
}

impl Cluster {
    /// Returns a builder with three replicas and full replication.
    pub fn builder() -> ClusterBuilder {
        ClusterBuilder::default()
    }

    /// The routing client.
    pub fn client(&self) -> &ClusterClient {
        &self.client
    }

    /// The shared network.
    pub fn network(&self) -> &Arc<Network> {
        &self.network
    }

    /// The placement directory.
    pub fn directory(&self) -> &StaticDirectory {
        &self.directory
    }

    /// Every replica address, sorted.
    pub fn addrs(&self) -> impl Iterator<Item = &ReplicaAddr> {
        self.replicas.keys()
    }

    /// The controller of replica `addr`.
    pub fn controller(&self, addr: &str) -> Option<&Arc<ReplicaController>> {
        self.replicas.get(&ReplicaAddr::from(addr))
    }

    /// The store of replica `addr`.
    pub fn store(&self, addr: &str) -> Option<&MemoryStore> {
        self.controller(addr).map(|c| c.store())
    }

    /// Starts a transaction at `ts` routed through the cluster client.
    ///
    /// # Errors
    ///
    /// Rejects `ts == 0`.
    pub fn begin(&self, ts: u64) -> CoreResult<Transaction<&ClusterClient>> {
        Transaction::begin(&self.client, Timestamp::new(ts))
    }

    /// Commits `pairs` in one transaction at `ts`, with conflict checking.
    ///
    /// # Errors
    ///
    /// The commit error, if any.
    pub fn commit<K, V>(&self, ts: u64, pairs: impl IntoIterator<Item = (K, V)>) -> CoreResult<()>
    where
        K: Into<Key>,
        V: AsRef<[u8]>,
    {
        let mut txn = self.begin(ts)?;
        for (key, val) in pairs {
            txn.set(key, val.as_ref().to_vec())?;
        }
        txn.commit(true)
    }

    /// Reads `key` in a fresh transaction at `ts`.
    ///
    /// # Errors
    ///
    /// The read error, if any.
    pub fn read(&self, ts: u64, key: &str) -> CoreResult<Option<Vec<u8>>> {
        self.begin(ts)?.get(&Key::from(key))
    }

    /// Delivers every queued notification, including ones queued while
    /// delivering. Returns the number of frames delivered.
    ///
    /// # Errors
    ///
    /// Frame decoding failures.
    pub fn settle(&self) -> CoreResult<usize> {
        Ok(self.network.deliver_all()?)
    }

    /// Total promotions across every replica.
    pub fn promotions(&self) -> u64 {
        self.replicas
            .values()
            .map(|c| c.stats().snapshot().promotions)
            .sum()
    }
}
