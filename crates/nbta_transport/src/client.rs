//! A [`Server`] that routes requests to the replicas of each key.

use crate::network::Network;
use nbta_core::{CoreResult, Key, Server, Timestamp, Write};
use std::sync::Arc;
use tracing::{debug, trace};

/// Routes transaction traffic across a [`Network`].
///
/// `set` proposes the write on every replica of its key, in directory
/// order, and stops at the first failure; replicas before it keep their
/// pending copy. `get` asks the same replicas in order, skipping any that
/// are not registered, and returns the first write any of them has; it
/// fails only if no replica could be asked.
#[derive(Clone)]
pub struct ClusterClient {
    network: Arc<Network>,
}

impl ClusterClient {
    /// Creates a client over `network`.
    pub fn new(network: Arc<Network>) -> Self {
        Self { network }
    }
}

impl Server for ClusterClient {
    fn get(&self, key: &Key, ts_required: Timestamp) -> CoreResult<Option<Write>> {
        let mut answered = false;
        let mut unavailable = None;
        for replica in self.network.directory().replicas_for(key) {
            let endpoint = match self.network.endpoint(&replica) {
                Ok(endpoint) => endpoint,
                Err(e) => {
                    debug!(key = %key, replica = %replica, "replica unavailable for read");
                    unavailable = Some(e);
                    continue;
                }
            };
            answered = true;
            if let Some(write) = endpoint.get(key, ts_required)? {
                trace!(key = %key, replica = %replica, ts = %write.ts(), "read served");
                return Ok(Some(write));
            }
        }
        match unavailable {
            Some(e) if !answered => Err(e.into()),
            _ => Ok(None),
        }
    }

    fn set(&self, write: Write) -> CoreResult<()> {
        for replica in self.network.directory().replicas_for(write.key()) {
            let endpoint = self.network.endpoint(&replica)?;
            endpoint.set(write.clone())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TransportConfig;
    use nbta_core::{Controller, MemoryStore, ReplicaAddr, StaticDirectory, Transaction};

    #[test]
    fn commit_through_client_reaches_every_replica() {
        let names = ["r1", "r2", "r3"];
        let directory = StaticDirectory::new(names.map(ReplicaAddr::from), 2).unwrap();
        let network = Network::new(directory, TransportConfig::default()).unwrap();
        let replicas: Vec<_> = names
            .iter()
            .map(|n| {
                let replica = Arc::new(Controller::new(
                    MemoryStore::new(),
                    network.peer(ReplicaAddr::from(*n)),
                ));
                network.register(ReplicaAddr::from(*n), &replica);
                replica
            })
            .collect();
        let client = ClusterClient::new(Arc::clone(&network));

        let mut txn = Transaction::begin(&client, Timestamp::new(10)).unwrap();
        txn.set("x", b"xx".to_vec()).unwrap();
        txn.set("y", b"yy".to_vec()).unwrap();
        txn.commit(true).unwrap();

        let mut reader = Transaction::begin(&client, Timestamp::new(11)).unwrap();
        assert_eq!(reader.get(&Key::from("x")).unwrap(), None);

        network.deliver_all().unwrap();
        let mut reader = Transaction::begin(&client, Timestamp::new(12)).unwrap();
        assert_eq!(reader.get(&Key::from("x")).unwrap(), Some(b"xx".to_vec()));
        assert_eq!(reader.get(&Key::from("y")).unwrap(), Some(b"yy".to_vec()));

        let promotions: u64 = replicas
            .iter()
            .map(|r| r.stats().snapshot().promotions)
            .sum();
        assert_eq!(promotions, 4);
    }

    #[test]
    fn read_skips_a_departed_replica() {
        let names = ["r1", "r2"];
        let directory = StaticDirectory::full(names.map(ReplicaAddr::from)).unwrap();
        let network = Network::new(directory, TransportConfig::default()).unwrap();
        let replicas: Vec<_> = names
            .iter()
            .map(|n| {
                let replica = Arc::new(Controller::new(
                    MemoryStore::new(),
                    network.peer(ReplicaAddr::from(*n)),
                ));
                network.register(ReplicaAddr::from(*n), &replica);
                replica
            })
            .collect();
        let client = ClusterClient::new(Arc::clone(&network));

        let w = Write::single(Key::from("x"), Some(b"xx".to_vec()), Timestamp::new(5));
        client.set(w).unwrap();
        network.deliver_all().unwrap();

        assert!(network.deregister(&ReplicaAddr::from("r1")));
        let found = client.get(&Key::from("x"), Timestamp::NONE).unwrap();
        assert_eq!(found.unwrap().val(), Some(&b"xx"[..]));

        let again = Write::single(Key::from("x"), None, Timestamp::new(6));
        assert!(client.set(again).is_err());

        assert!(network.deregister(&ReplicaAddr::from("r2")));
        assert!(client.get(&Key::from("x"), Timestamp::NONE).is_err());
        drop(replicas);
    }

    #[test]
    fn unregistered_replica_fails_the_set() {
        let directory = StaticDirectory::full([ReplicaAddr::from("r1")]).unwrap();
        let network = Network::new(directory, TransportConfig::default()).unwrap();
        let client = ClusterClient::new(network);

        let err = client
            .set(Write::single(Key::from("x"), None, Timestamp::new(1)))
            .unwrap_err();
        assert!(!err.is_retryable());
    }
}
