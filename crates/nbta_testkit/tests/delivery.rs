//! Delivery under faults and in the background.

use nbta_core::{Key, Timestamp};
use nbta_testkit::{
    init_tracing, read_counter, run_conflicting_increments, seed_counter, Cluster,
};
use nbta_transport::{FaultConfig, OverflowPolicy, TransportConfig};
use std::time::Duration;

fn faulty(seed: u64) -> TransportConfig {
    TransportConfig::new().with_fault(
        FaultConfig::none()
            .with_duplicate_probability(0.5)
            .with_reorder(true)
            .with_seed(seed),
    )
}

#[test]
fn duplicated_and_reordered_delivery_promotes_exactly_once() {
    init_tracing();
    for seed in 0..8 {
        let cluster = Cluster::builder()
            .replicas(["r1", "r2", "r3"])
            .replication_factor(2)
            .transport(faulty(seed))
            .build()
            .unwrap();

        cluster.commit(10, [("x", "xx"), ("y", "yy")]).unwrap();
        cluster.commit(11, [("x", "xxx"), ("y", "yyy")]).unwrap();
        cluster.settle().unwrap();

        // Two writes, two keys, two replicas per key.
        assert_eq!(cluster.promotions(), 8, "seed {seed}");
        for addr in ["r1", "r2", "r3"] {
            let store = cluster.store(addr).unwrap();
            for k in ["x", "y"] {
                for ts in [10, 11] {
                    let acks = store.ack_count(&Key::from(k), Timestamp::new(ts));
                    assert!(acks == 0 || acks == 4, "seed {seed}: {addr} {k}@{ts} has {acks}");
                }
            }
        }
        assert_eq!(cluster.read(12, "x").unwrap(), Some(b"xxx".to_vec()));
        assert_eq!(cluster.read(12, "y").unwrap(), Some(b"yyy".to_vec()));
    }
}

#[test]
fn rejected_notify_fails_the_commit_but_keeps_the_write_pending() {
    let cluster = Cluster::builder()
        .replicas(["r1"])
        .transport(
            TransportConfig::new()
                .with_mailbox_capacity(1)
                .with_overflow(OverflowPolicy::Reject),
        )
        .build()
        .unwrap();

    // Two sibling keys on one replica need two frames on the same link.
    let err = cluster.commit(10, [("x", "xx"), ("y", "yy")]).unwrap_err();
    assert!(err.is_retryable());

    let store = cluster.store("r1").unwrap();
    assert_eq!(store.pending_count(&Key::from("x")), 1);
    assert_eq!(store.pending_count(&Key::from("y")), 0);
    assert_eq!(cluster.network().stats().snapshot().rejected, 1);
}

#[test]
fn concurrent_increments_lose_no_update() {
    let cluster = Cluster::builder().build().unwrap();
    seed_counter(&cluster).unwrap();
    let report = run_conflicting_increments(&cluster, 4, 25);

    assert_eq!(report.attempts(), 100);
    assert_eq!(report.failures, 0);
    assert!(report.committed >= 1);
    cluster.settle().unwrap();
    assert_eq!(
        read_counter(&cluster, u64::MAX).unwrap(),
        report.committed as u64
    );
}

#[tokio::test]
async fn background_delivery_settles_commits() {
    let cluster = Cluster::builder()
        .replicas(["r1", "r2", "r3"])
        .replication_factor(2)
        .build()
        .unwrap();
    let handle = cluster.network().spawn_delivery();

    cluster.commit(10, [("x", "xx"), ("y", "yy")]).unwrap();

    tokio::time::timeout(Duration::from_secs(5), async {
        while cluster.promotions() < 4 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    })
    .await
    .unwrap();

    handle.shutdown().await;
    assert_eq!(cluster.read(11, "y").unwrap(), Some(b"yy".to_vec()));
}
