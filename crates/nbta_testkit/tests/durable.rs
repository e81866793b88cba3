//! Replicas over the durable store survive a restart.

use nbta_core::{
    Controller, DurableStore, DurableStoreConfig, Key, ReplicaAddr, Server, StaticDirectory,
    Store, Timestamp, Transaction, Write,
};
use nbta_storage::FileBackend;
use nbta_transport::{ClusterClient, Network, TransportConfig};
use std::path::Path;
use std::sync::Arc;
use tempfile::tempdir;

fn open_store(dir: &Path, name: &str) -> DurableStore<FileBackend> {
    let backend = FileBackend::open(&dir.join(format!("{name}.log"))).unwrap();
    DurableStore::open(backend, DurableStoreConfig::default()).unwrap()
}

#[test]
fn promoted_writes_survive_reopen() {
    let dir = tempdir().unwrap();
    let names = ["r1", "r2"];

    {
        let directory = StaticDirectory::full(names.map(ReplicaAddr::from)).unwrap();
        let network = Network::new(directory, TransportConfig::default()).unwrap();
        let replicas: Vec<_> = names
            .iter()
            .map(|n| {
                let addr = ReplicaAddr::from(*n);
                let replica = Arc::new(Controller::new(
                    open_store(dir.path(), n),
                    network.peer(addr.clone()),
                ));
                network.register(addr, &replica);
                replica
            })
            .collect();
        let client = ClusterClient::new(Arc::clone(&network));

        let mut txn = Transaction::begin(&client, Timestamp::new(10)).unwrap();
        txn.set("x", b"xx".to_vec()).unwrap();
        txn.set("y", b"yy".to_vec()).unwrap();
        txn.commit(true).unwrap();

        // Each of the 2 keys is set on 2 replicas, and every set notifies
        // both replicas of both sibs.
        assert_eq!(network.deliver_all().unwrap(), 16);

        // Never delivered, so it stays pending.
        client
            .set(Write::single(
                Key::from("x"),
                Some(b"late".to_vec()),
                Timestamp::new(20),
            ))
            .unwrap();
        drop(replicas);
    }

    for name in names {
        let store = open_store(dir.path(), name);
        let x = store.stable_find(&Key::from("x"), Timestamp::NONE).unwrap().unwrap();
        assert_eq!(x.ts(), Timestamp::new(10));
        assert_eq!(x.val(), Some(&b"xx"[..]));
        assert!(store
            .pending_get(&Key::from("x"), Timestamp::new(20))
            .unwrap()
            .is_some());
    }
}
