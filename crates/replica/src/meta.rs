//! Entities held by the replica
//!
//! Ownership is strictly top-down: database → collection → partition →
//! segment. Readers receive clones, so a snapshot never observes a later
//! mutation.

use std::collections::HashMap;
use std::sync::Arc;

use querynode_core::{CollectionSchema, NodeId, PartitionState, UniqueId};

/// Smallest unit of stored data within a partition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// Segment id
    pub id: UniqueId,
}

/// A subdivision of a collection
#[derive(Debug, Clone, PartialEq)]
pub struct Partition {
    /// Partition id, unique within its collection
    pub id: UniqueId,
    /// Lifecycle state
    pub state: PartitionState,
    /// Owned segments keyed by id
    pub segments: HashMap<UniqueId, Segment>,
}

impl Partition {
    pub(crate) fn new(id: UniqueId) -> Self {
        Self {
            id,
            state: PartitionState::NotPresent,
            segments: HashMap::new(),
        }
    }
}

/// A schema-bound container of partitions
#[derive(Debug, Clone, PartialEq)]
pub struct Collection {
    /// Collection id
    pub id: UniqueId,
    /// Schema, fixed at creation
    pub schema: Arc<CollectionSchema>,
    /// Ingest channel name → owning node
    pub dm_channels: HashMap<String, NodeId>,
    /// Partitions keyed by id
    pub partitions: HashMap<UniqueId, Partition>,
}

impl Collection {
    pub(crate) fn new(id: UniqueId, schema: CollectionSchema) -> Self {
        Self {
            id,
            schema: Arc::new(schema),
            dm_channels: HashMap::new(),
            partitions: HashMap::new(),
        }
    }

    /// Ids of all partitions, unordered.
    pub fn partition_ids(&self) -> Vec<UniqueId> {
        self.partitions.keys().copied().collect()
    }
}

/// State of one requested partition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionStates {
    /// Requested partition id
    pub partition_id: UniqueId,
    /// Its state, `NotPresent` when untracked
    pub state: PartitionState,
}
