//! Shared test utilities for the integration test suites.
//!
//! Import via `#[path = "../common/mod.rs"] mod common;` from a suite's main.rs.

#![allow(dead_code)]
#![allow(unused_imports)]

use std::sync::{Arc, Once};
use std::time::Duration;

pub use querynode::types::{CollectionSchema, DdlMsg, TimeRange, Timestamp, UniqueId};
pub use querynode::{
    DataSyncService, MemMsgStream, MetaReplica, MsgPosition, QueryNodeConfig, Replica,
};

/// Upper bound for waiting on the service-time watermark.
pub const WAIT: Duration = Duration::from_secs(5);

static INIT_TRACING: Once = Once::new();

/// Route pipeline logs to the test harness.
pub fn init_tracing() {
    INIT_TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    });
}

// ============================================================================
// TestNode - replica, stream and service wired together
// ============================================================================

/// A query node with an in-memory stream
pub struct TestNode {
    pub replica: Arc<MetaReplica>,
    pub stream: Arc<MemMsgStream>,
    pub service: DataSyncService,
}

impl TestNode {
    /// Node with the default config, not yet started.
    pub fn new() -> Self {
        Self::with_config(QueryNodeConfig::default())
    }

    /// Node built from `config`, not yet started.
    pub fn with_config(config: QueryNodeConfig) -> Self {
        init_tracing();
        let replica = Arc::new(MetaReplica::new());
        let stream = Arc::new(MemMsgStream::new("dml-0"));
        let service = DataSyncService::new(replica.clone(), stream.clone(), &config);
        Self {
            replica,
            stream,
            service,
        }
    }

    /// Node already started.
    pub fn started() -> Self {
        let node = Self::new();
        node.service.start().expect("start");
        node
    }

    /// Produce one pack whose range spans the message timestamps.
    pub fn produce(&self, msgs: Vec<DdlMsg>) -> MsgPosition {
        let range = TimeRange::merge_all(msgs.iter().map(|m| TimeRange::new(m.timestamp(), m.timestamp())))
            .unwrap_or_default();
        self.stream.produce(msgs, range)
    }

    /// Block until service time reaches `ts`.
    pub fn wait(&self, ts: Timestamp) {
        assert!(
            self.service.tsafe().wait_for(ts, WAIT),
            "service time stuck at {} waiting for {}",
            self.service.tsafe().get(),
            ts
        );
    }
}

// ============================================================================
// Message builders
// ============================================================================

/// Encoded schema named after `id` with the given description.
pub fn schema_bytes(id: UniqueId, description: &str) -> Vec<u8> {
    let mut schema = CollectionSchema::new(format!("collection_{}", id));
    schema.description = description.to_string();
    schema.encode().expect("encode schema")
}

pub fn create_collection(id: UniqueId, ts: Timestamp) -> DdlMsg {
    DdlMsg::CreateCollection {
        collection_id: id,
        schema: schema_bytes(id, ""),
        timestamp: ts,
    }
}

pub fn drop_collection(id: UniqueId, ts: Timestamp) -> DdlMsg {
    DdlMsg::DropCollection {
        collection_id: id,
        timestamp: ts,
    }
}

pub fn create_partition(collection_id: UniqueId, partition_id: UniqueId, ts: Timestamp) -> DdlMsg {
    DdlMsg::CreatePartition {
        collection_id,
        partition_id,
        timestamp: ts,
    }
}

pub fn drop_partition(collection_id: UniqueId, partition_id: UniqueId, ts: Timestamp) -> DdlMsg {
    DdlMsg::DropPartition {
        collection_id,
        partition_id,
        timestamp: ts,
    }
}
