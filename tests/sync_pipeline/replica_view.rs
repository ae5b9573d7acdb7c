//! Readers observe the replica while the pipeline writes to it

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use crate::common::*;
use querynode::PartitionState;

#[test]
fn readers_run_alongside_pipeline_writes() {
    let node = TestNode::started();
    let done = Arc::new(AtomicBool::new(false));

    let reader = {
        let replica = Arc::clone(&node.replica);
        let done = Arc::clone(&done);
        thread::spawn(move || {
            let mut last_seen = 0usize;
            while !done.load(Ordering::Acquire) {
                let collections = replica.get_collections(0).unwrap();
                // Creation is append-only here, so the view only grows.
                assert!(collections.len() >= last_seen);
                last_seen = collections.len();
                for collection in collections {
                    assert!(collection.partitions.len() <= 1);
                }
            }
            last_seen
        })
    };

    for id in 1..=50i64 {
        node.produce(vec![create_collection(id, id as Timestamp)]);
    }
    node.wait(50);
    done.store(true, Ordering::Release);
    reader.join().unwrap();

    assert_eq!(node.replica.get_collections(0).unwrap().len(), 50);
    node.service.close();
}

#[test]
fn partition_states_for_pipeline_created_partitions() {
    let node = TestNode::started();
    node.produce(vec![create_collection(1, 10), create_partition(1, 11, 11)]);
    node.wait(11);

    node.replica
        .update_partition_state(0, 1, 11, PartitionState::InMemory)
        .unwrap();
    let states = node.replica.get_partition_states(0, 1, &[11, 99]).unwrap();
    assert_eq!(states[0].state, PartitionState::InMemory);
    assert_eq!(states[1].state, PartitionState::NotPresent);
    node.service.close();
}

#[test]
fn channels_on_pipeline_created_collection() {
    let node = TestNode::started();
    node.produce(vec![create_collection(1, 10)]);
    node.wait(10);

    let channels = [("dml-0".to_string(), 3i64)].into_iter().collect();
    node.replica.add_dm_channels(0, 1, channels).unwrap();
    assert_eq!(
        node.replica
            .get_assigned_node_id_by_channel_name(0, 1, "dml-0")
            .unwrap(),
        3
    );
    node.service.close();
}
