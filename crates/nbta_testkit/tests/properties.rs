//! Property tests for acknowledgment, visibility and conflict detection.

use nbta_core::{CoreError, Key, MemoryStore, ReplicaAddr, Store, Timestamp, Write};
use nbta_testkit::{
    key_strategy, replica_strategy, write_batch_strategy, Cluster, PropTestConfig,
};
use proptest::prelude::*;
use std::collections::HashSet;

proptest! {
    #![proptest_config(PropTestConfig::quick().to_proptest_config())]

    #[test]
    fn ack_count_is_number_of_distinct_acknowledgers(
        acks in prop::collection::vec((replica_strategy(), key_strategy()), 1..40)
    ) {
        let store = MemoryStore::new();
        let to_key = Key::from("target");
        let ts = Timestamp::new(7);
        let mut seen = HashSet::new();

        for (replica, from_key) in &acks {
            let count = store.ack(&to_key, from_key, ts, replica).unwrap();
            seen.insert((replica.clone(), from_key.clone()));
            prop_assert_eq!(count, seen.len());

            // A second identical ack changes nothing.
            let again = store.ack(&to_key, from_key, ts, replica).unwrap();
            prop_assert_eq!(again, count);
        }
    }

    #[test]
    fn stable_visibility_is_monotonic(
        order in Just((1u64..=12).collect::<Vec<_>>()).prop_shuffle()
    ) {
        let store = MemoryStore::new();
        let k = Key::from("k");
        for ts in 1..=12 {
            let w = Write::single(k.clone(), Some(vec![ts as u8]), Timestamp::new(ts));
            store.pending_add(&w).unwrap();
        }

        let mut observed: Vec<Timestamp> = Vec::new();
        for ts in order {
            store.pending_promote(&k, Timestamp::new(ts)).unwrap();
            let newest = store.stable_find(&k, Timestamp::NONE).unwrap().unwrap().ts();
            observed.push(newest);

            for earlier in &observed {
                let found = store.stable_find(&k, *earlier).unwrap().unwrap();
                prop_assert!(found.ts() >= *earlier);
            }
        }
        prop_assert!(observed.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn later_of_two_readers_conflicts(batch in write_batch_strategy()) {
        let cluster = Cluster::builder().build().unwrap();
        cluster.commit(5, batch.iter().map(|(k, v)| (k.clone(), v.clone()))).unwrap();
        cluster.settle().unwrap();

        let mut t1 = cluster.begin(10).unwrap();
        let mut t2 = cluster.begin(11).unwrap();
        for (k, v) in &batch {
            prop_assert_eq!(t1.get(k).unwrap(), Some(v.clone()));
            prop_assert_eq!(t2.get(k).unwrap(), Some(v.clone()));
            t1.set(k.clone(), b"one".to_vec()).unwrap();
            t2.set(k.clone(), b"two".to_vec()).unwrap();
        }

        t1.commit(true).unwrap();
        let err = t2.commit(true).unwrap_err();
        let is_conflict = matches!(err, CoreError::ConcurrentWrite { .. });
        prop_assert!(is_conflict);
    }

    #[test]
    fn settled_batches_read_back_whole(
        batches in prop::collection::vec(write_batch_strategy(), 1..4)
    ) {
        let cluster = Cluster::builder()
            .replicas(["a", "b", "c"])
            .replication_factor(2)
            .build()
            .unwrap();

        let mut expected = std::collections::BTreeMap::new();
        for (i, batch) in batches.iter().enumerate() {
            let ts = 10 + i as u64;
            cluster.commit(ts, batch.iter().map(|(k, v)| (k.clone(), v.clone()))).unwrap();
            for (k, v) in batch {
                expected.insert(k.clone(), v.clone());
            }
        }
        cluster.settle().unwrap();

        let mut reader = cluster.begin(100).unwrap();
        for (k, v) in &expected {
            prop_assert_eq!(reader.get(k).unwrap(), Some(v.clone()));
        }
    }
}

#[test]
fn ack_before_pending_add_still_counts() {
    let store = MemoryStore::new();
    let k = Key::from("k");
    let ts = Timestamp::new(3);
    store.ack(&k, &k, ts, &ReplicaAddr::from("r1")).unwrap();
    store
        .pending_add(&Write::single(k.clone(), Some(b"v".to_vec()), ts))
        .unwrap();
    assert_eq!(store.ack(&k, &k, ts, &ReplicaAddr::from("r2")).unwrap(), 2);
}
