//! Drops flow to the GC worker and release replica state

use crate::common::*;

#[test]
fn dropped_collection_released_after_drain() {
    let node = TestNode::started();
    node.produce(vec![create_collection(7, 50), create_partition(7, 70, 60)]);
    node.produce(vec![drop_collection(7, 100)]);
    node.wait(100);

    node.service.close();
    assert!(!node.replica.has_collection(0, 7));
    assert_eq!(node.service.gc_stats().released, 1);
    assert_eq!(node.service.gc_stats().pending, 0);
}

#[test]
fn dropped_partition_leaves_siblings() {
    let node = TestNode::started();
    node.produce(vec![
        create_collection(1, 10),
        create_partition(1, 11, 11),
        create_partition(1, 12, 12),
    ]);
    node.produce(vec![drop_partition(1, 11, 20)]);
    node.wait(20);
    node.service.close();

    let mut ids = node
        .replica
        .get_collection_by_id(0, 1)
        .unwrap()
        .partition_ids();
    ids.sort_unstable();
    assert_eq!(ids, vec![12, querynode::types::DEFAULT_PARTITION_ID]);
}

#[test]
fn repeated_drops_release_once() {
    let node = TestNode::started();
    node.produce(vec![create_collection(5, 10)]);
    node.produce(vec![drop_collection(5, 20), drop_collection(5, 21)]);
    node.wait(21);
    node.service.close();

    let stats = node.service.gc_stats();
    assert_eq!(stats.released, 1);
    assert_eq!(stats.skipped, 1);
}
