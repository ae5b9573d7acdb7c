//! Metadata replica for the query node
//!
//! This crate implements the in-memory source of truth for topology and
//! partition lifecycle state:
//! - Replica: the store contract, so sharded or persistent backends can be
//!   substituted without touching the data-definition stage
//! - MetaReplica: whole-store `parking_lot::RwLock` implementation
//! - Collection / Partition / Segment snapshots returned to readers

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod meta;
pub mod meta_replica;
pub mod traits;

pub use meta::{Collection, Partition, PartitionStates, Segment};
pub use meta_replica::MetaReplica;
pub use traits::Replica;
