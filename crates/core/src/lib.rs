//! Core types for the query node
//!
//! This crate defines the foundational types shared by every layer:
//! - Identifiers: UniqueId, NodeId, Timestamp
//! - TimeRange: (min, max) timestamp bounds carried by every batch
//! - PartitionState: partition lifecycle state
//! - CollectionSchema: schema blob decoded at collection creation
//! - DdlMsg: tagged data-definition operations read from the stream
//! - Error: error taxonomy shared by the replica, flow graph and engine
//! - QueryNodeConfig: explicit configuration read once at graph-build time

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod ddl;
pub mod error;
pub mod schema;
pub mod types;

pub use config::{DataSyncConfig, FlowGraphConfig, MalformedInputPolicy, NodeConfig, QueryNodeConfig};
pub use ddl::DdlMsg;
pub use error::{Error, NotFound, Result};
pub use schema::{CollectionSchema, DataType, FieldSchema};
pub use types::{
    NodeId, PartitionState, TimeRange, Timestamp, UniqueId, DEFAULT_DB_ID, DEFAULT_PARTITION_ID,
};
