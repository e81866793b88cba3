//! End-to-end protocol scenarios on a multi-replica cluster.

use nbta_core::{CoreError, Key, Notify, NotifyReceiver, ReplicaAddr, Store, Timestamp, Write};
use nbta_testkit::{init_tracing, Cluster};

fn key(s: &str) -> Key {
    Key::from(s)
}

#[test]
fn single_key_write_visible_after_quorum() {
    init_tracing();
    let cluster = Cluster::builder().build().unwrap();

    cluster.commit(10, [("x", "xxx")]).unwrap();
    assert_eq!(cluster.read(11, "x").unwrap(), None);

    cluster.settle().unwrap();
    for ts in [11, 50, 1_000_000] {
        assert_eq!(cluster.read(ts, "x").unwrap(), Some(b"xxx".to_vec()));
    }
}

#[test]
fn consecutive_multi_key_writes_do_not_interleave() {
    let cluster = Cluster::builder()
        .replicas(["r1", "r2", "r3", "r4"])
        .replication_factor(2)
        .build()
        .unwrap();

    cluster.commit(10, [("x", "xx"), ("y", "yy")]).unwrap();
    cluster.commit(11, [("x", "xxx"), ("y", "yyy")]).unwrap();
    cluster.settle().unwrap();

    let mut txn = cluster.begin(12).unwrap();
    assert_eq!(txn.get(&key("x")).unwrap(), Some(b"xxx".to_vec()));
    assert_eq!(txn.get(&key("y")).unwrap(), Some(b"yyy".to_vec()));
    assert_eq!(txn.read_timestamp(&key("y")), Timestamp::new(11));
}

#[test]
fn second_of_two_racing_commits_conflicts() {
    let cluster = Cluster::builder().build().unwrap();
    cluster.commit(5, [("k", "v0")]).unwrap();
    cluster.settle().unwrap();

    let mut t1 = cluster.begin(10).unwrap();
    let mut t2 = cluster.begin(11).unwrap();
    assert_eq!(t1.get(&key("k")).unwrap(), Some(b"v0".to_vec()));
    assert_eq!(t2.get(&key("k")).unwrap(), Some(b"v0".to_vec()));

    t1.set("k", b"v1".to_vec()).unwrap();
    t1.commit(true).unwrap();

    t2.set("k", b"v2".to_vec()).unwrap();
    let err = t2.commit(true).unwrap_err();
    assert!(matches!(
        err,
        CoreError::ConcurrentWrite { ref key, prev, found }
            if key.as_str() == "k" && prev == Timestamp::new(5) && found == Timestamp::new(10)
    ));
    assert!(err.is_retryable());

    cluster.settle().unwrap();
    assert_eq!(cluster.read(12, "k").unwrap(), Some(b"v1".to_vec()));
}

#[test]
fn blind_commit_ignores_concurrent_writes() {
    let cluster = Cluster::builder().build().unwrap();
    cluster.commit(5, [("k", "v0")]).unwrap();
    cluster.settle().unwrap();

    let mut t1 = cluster.begin(10).unwrap();
    let mut t2 = cluster.begin(11).unwrap();
    t1.get(&key("k")).unwrap();
    t2.get(&key("k")).unwrap();
    t1.set("k", b"v1".to_vec()).unwrap();
    t1.commit(true).unwrap();
    t2.set("k", b"v2".to_vec()).unwrap();
    t2.commit(false).unwrap();

    cluster.settle().unwrap();
    assert_eq!(cluster.read(12, "k").unwrap(), Some(b"v2".to_vec()));
}

#[test]
fn read_your_writes_stays_local() {
    let cluster = Cluster::builder().build().unwrap();
    let mut txn = cluster.begin(3).unwrap();
    txn.set("x", b"mine".to_vec()).unwrap();
    txn.del("y").unwrap();

    assert_eq!(txn.get(&key("x")).unwrap(), Some(b"mine".to_vec()));
    assert_eq!(txn.get(&key("y")).unwrap(), None);
    assert_eq!(cluster.network().queued(), 0);
    assert_eq!(cluster.store("r1").unwrap().key_count(), 0);
}

/// x lives on r1 and y on r2. Acknowledges y at r2 by hand so only y
/// becomes stable.
fn half_promoted_cluster(propose_x: bool) -> Cluster {
    let cluster = Cluster::builder()
        .replicas(["r1", "r2"])
        .replication_factor(1)
        .placement("x", ["r1"])
        .placement("y", ["r2"])
        .build()
        .unwrap();

    let ts = Timestamp::new(10);
    let r2 = cluster.controller("r2").unwrap();
    if propose_x {
        cluster.commit(10, [("x", "xx"), ("y", "yy")]).unwrap();
    } else {
        let y = Write::new(key("y"), Some(b"yy".to_vec()), ts, [key("x")], Timestamp::NONE);
        r2.store().pending_add(&y).unwrap();
    }

    for (from, from_key) in [("r1", "x"), ("r2", "y")] {
        let notify = Notify {
            to_key: key("y"),
            from_key: key(from_key),
            ts,
            acks_needed: 2,
        };
        r2.receive_notify(&ReplicaAddr::from(from), notify).unwrap();
    }
    cluster
}

#[test]
fn sibling_read_reaches_partner_in_pending() {
    let cluster = half_promoted_cluster(true);

    // x is not stable anywhere yet.
    assert_eq!(cluster.read(11, "x").unwrap(), None);

    let mut txn = cluster.begin(11).unwrap();
    assert_eq!(txn.get(&key("y")).unwrap(), Some(b"yy".to_vec()));
    assert_eq!(txn.required_timestamp(&key("x")), Timestamp::new(10));
    assert_eq!(txn.get(&key("x")).unwrap(), Some(b"xx".to_vec()));
}

#[test]
fn sibling_read_without_partner_fails() {
    let cluster = half_promoted_cluster(false);

    let mut txn = cluster.begin(11).unwrap();
    assert_eq!(txn.get(&key("y")).unwrap(), Some(b"yy".to_vec()));
    let err = txn.get(&key("x")).unwrap_err();
    assert!(matches!(
        err,
        CoreError::MissingRequiredWrite { ref key, ts } if key.as_str() == "x" && ts == Timestamp::new(10)
    ));
}

#[test]
fn promotion_waits_for_every_sibling_replica() {
    let cluster = Cluster::builder()
        .replicas(["r1", "r2"])
        .replication_factor(1)
        .placement("x", ["r1"])
        .placement("y", ["r2"])
        .build()
        .unwrap();
    cluster.commit(10, [("x", "xx"), ("y", "yy")]).unwrap();

    // Deliver only the frames queued on r1's outbound links.
    let r1 = cluster.store("r1").unwrap();
    let ts = Timestamp::new(10);
    while cluster.network().deliver_next().unwrap() {
        if r1.ack_count(&key("x"), ts) == 1 {
            break;
        }
    }
    assert_eq!(r1.stable_count(&key("x")), 0);

    cluster.settle().unwrap();
    assert_eq!(r1.stable_count(&key("x")), 1);
    assert_eq!(r1.ack_count(&key("x"), ts), 2);
}
