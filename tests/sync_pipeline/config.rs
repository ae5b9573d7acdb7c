//! Nodes built from `querynode.toml`

use std::io::Write;

use crate::common::*;
use querynode::MalformedInputPolicy;

#[test]
fn node_from_config_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        "[flow_graph]\nmax_queue_length = 2\nmax_parallelism = 3\nmalformed_input = \"reject\"\n\n[data_sync]\ngc_queue_length = 1\n"
    )
    .unwrap();
    let config = QueryNodeConfig::from_file(file.path()).unwrap();
    assert_eq!(config.flow_graph.malformed_input, MalformedInputPolicy::Reject);

    let node = TestNode::with_config(config);
    for stage in node.service.graph_stats() {
        let expected = match stage.name.as_str() {
            "insert_node" | "service_time_node" => 3,
            _ => 1,
        };
        assert_eq!(stage.max_parallelism, expected, "stage {}", stage.name);
    }

    // Small queues still make progress, including through a one-slot GC queue.
    node.service.start().unwrap();
    for id in 1..=10i64 {
        node.produce(vec![create_collection(id, id as Timestamp)]);
    }
    node.produce(vec![
        drop_collection(1, 20),
        drop_collection(2, 20),
        drop_collection(3, 20),
    ]);
    node.wait(20);
    node.service.close();
    assert_eq!(node.service.gc_stats().released, 3);
    assert_eq!(node.replica.get_collections(0).unwrap().len(), 7);
}

#[test]
fn non_default_database() {
    let config = QueryNodeConfig::from_toml_str("[data_sync]\ndb_id = 9\n").unwrap();
    let node = TestNode::with_config(config);
    assert!(node.replica.add_database(9));
    node.service.start().unwrap();
    node.produce(vec![create_collection(1, 10)]);
    node.wait(10);

    assert!(node.replica.has_collection(9, 1));
    assert!(!node.replica.has_collection(0, 1));
    node.service.close();
}
