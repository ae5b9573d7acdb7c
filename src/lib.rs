//! Querynode - ingest and metadata core of a vector database query node
//!
//! A query node tracks which collections, partitions and segments it holds
//! and keeps that view current by replaying data-definition traffic from a
//! message stream through a staged flow graph.
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use querynode::{DataSyncService, MemMsgStream, MetaReplica, QueryNodeConfig};
//!
//! let replica = Arc::new(MetaReplica::new());
//! let stream = Arc::new(MemMsgStream::new("dml-0"));
//! let service = DataSyncService::new(replica.clone(), stream.clone(), &QueryNodeConfig::default());
//! service.start()?;
//!
//! // ... produce packs into the stream, read the replica ...
//!
//! service.close();
//! ```
//!
//! # Architecture
//!
//! - [`types`]: ids, timestamps, schema, data-definition messages, config, errors
//! - [`replica`]: the thread-safe metadata registry
//! - [`flowgraph`]: generic DAG runtime with bounded queues and per-stage workers
//! - [`engine`]: the concrete pipeline, GC worker and service-time watermark

pub use querynode_core as types;
pub use querynode_engine as engine;
pub use querynode_flowgraph as flowgraph;
pub use querynode_replica as replica;

pub use querynode_core::{
    CollectionSchema, DdlMsg, Error, MalformedInputPolicy, PartitionState, QueryNodeConfig,
    Result, TimeRange, Timestamp, UniqueId,
};
pub use querynode_engine::{DataSyncService, MemMsgStream, MsgPosition, MsgStream, TSafe};
pub use querynode_flowgraph::{FlowGraph, Message, Node};
pub use querynode_replica::{MetaReplica, Replica};
