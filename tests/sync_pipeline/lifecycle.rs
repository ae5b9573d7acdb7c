//! Start, seek and close semantics of the sync service

use crate::common::*;
use querynode::Error;

#[test]
fn service_time_tracks_latest_pack() {
    let node = TestNode::started();
    node.produce(vec![create_collection(1, 10)]);
    node.produce(vec![create_partition(1, 11, 25)]);
    node.wait(25);
    assert_eq!(node.service.tsafe().get(), 25);
    node.service.close();
}

#[test]
fn double_start_rejected() {
    let node = TestNode::started();
    assert!(matches!(node.service.start(), Err(Error::AlreadyStarted)));
    node.service.close();
}

#[test]
fn seek_before_start_skips_earlier_packs() {
    let node = TestNode::new();
    node.produce(vec![create_collection(1, 10)]);
    let second = node.produce(vec![create_collection(2, 20)]);
    node.produce(vec![create_collection(3, 30)]);

    node.service.seek_segment(&second).unwrap();
    node.service.start().unwrap();
    node.wait(30);

    assert!(!node.replica.has_collection(0, 1));
    assert!(node.replica.has_collection(0, 2));
    assert!(node.replica.has_collection(0, 3));
    node.service.close();
}

#[test]
fn seek_while_running_rejected() {
    let node = TestNode::started();
    let position = node.produce(vec![create_collection(1, 10)]);
    node.wait(10);
    let err = node.service.seek_segment(&position).unwrap_err();
    assert!(matches!(err, Error::InvalidState(_)));
    node.service.close();
}

#[test]
fn close_is_idempotent_and_final() {
    let node = TestNode::started();
    node.service.close();
    node.service.close();
    assert!(!node.service.is_running());
    assert!(node.stream.is_closed());
    assert!(matches!(node.service.start(), Err(Error::GraphClosed)));
}

#[test]
fn stats_cover_every_stage() {
    // Serial stages so the last tick implies every earlier batch was counted.
    let mut config = QueryNodeConfig::default();
    config.flow_graph.max_parallelism = 1;
    let node = TestNode::with_config(config);
    node.service.start().unwrap();
    node.produce(vec![create_collection(1, 10)]);
    node.produce(vec![create_collection(2, 20)]);
    node.wait(20);
    node.service.close();

    let stats = node.service.graph_stats();
    assert_eq!(stats.len(), 5);
    for stage in stats.iter().filter(|s| s.name != "dm_input_node") {
        assert_eq!(stage.processed_batches, 2, "stage {}", stage.name);
        assert_eq!(stage.failed_batches, 0, "stage {}", stage.name);
        assert_eq!(stage.watermark, 20, "stage {}", stage.name);
    }
}
