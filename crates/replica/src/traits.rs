//! Replica store contract
//!
//! Every operation is addressed by `(db_id, collection_id[, partition_id[, segment_id]])`
//! and fails with `Error::NotFound` when the path does not resolve.

use std::collections::HashMap;

use querynode_core::{CollectionSchema, NodeId, PartitionState, Result, UniqueId};

use crate::meta::{Collection, Partition, PartitionStates, Segment};

/// Store abstraction for collection/partition/segment topology
///
/// Thread safety: all methods must be safe to call concurrently from the
/// data-definition stage (writer) and control-plane callers (readers).
pub trait Replica: Send + Sync {
    /// Register an empty database. Returns false if it already existed.
    fn add_database(&self, db_id: UniqueId) -> bool;

    /// Snapshot of every collection in `db_id`. Order is unspecified.
    fn get_collections(&self, db_id: UniqueId) -> Result<Vec<Collection>>;

    /// Snapshot of every partition of a collection. Order is unspecified.
    fn get_partitions(&self, db_id: UniqueId, collection_id: UniqueId) -> Result<Vec<Partition>>;

    /// Snapshot of every segment of a partition. Order is unspecified.
    fn get_segments(
        &self,
        db_id: UniqueId,
        collection_id: UniqueId,
        partition_id: UniqueId,
    ) -> Result<Vec<Segment>>;

    /// Point lookup of a collection.
    fn get_collection_by_id(&self, db_id: UniqueId, collection_id: UniqueId) -> Result<Collection>;

    /// Point lookup of a partition.
    fn get_partition_by_id(
        &self,
        db_id: UniqueId,
        collection_id: UniqueId,
        partition_id: UniqueId,
    ) -> Result<Partition>;

    /// Whether the collection is tracked.
    fn has_collection(&self, db_id: UniqueId, collection_id: UniqueId) -> bool;

    /// Add a collection.
    ///
    /// Does not check for duplicates; suppressing re-creation is the caller's job.
    fn add_collection(
        &self,
        db_id: UniqueId,
        collection_id: UniqueId,
        schema: CollectionSchema,
    ) -> Result<()>;

    /// Add a partition in state `NotPresent`.
    fn add_partition(
        &self,
        db_id: UniqueId,
        collection_id: UniqueId,
        partition_id: UniqueId,
    ) -> Result<()>;

    /// Add a segment to a partition.
    fn add_segment(
        &self,
        db_id: UniqueId,
        collection_id: UniqueId,
        partition_id: UniqueId,
        segment_id: UniqueId,
    ) -> Result<()>;

    /// Remove a segment from a partition.
    fn remove_segment(
        &self,
        db_id: UniqueId,
        collection_id: UniqueId,
        partition_id: UniqueId,
        segment_id: UniqueId,
    ) -> Result<()>;

    /// Set a partition's lifecycle state in place.
    fn update_partition_state(
        &self,
        db_id: UniqueId,
        collection_id: UniqueId,
        partition_id: UniqueId,
        state: PartitionState,
    ) -> Result<()>;

    /// One state per requested id, `NotPresent` for anything untracked.
    fn get_partition_states(
        &self,
        db_id: UniqueId,
        collection_id: UniqueId,
        partition_ids: &[UniqueId],
    ) -> Result<Vec<PartitionStates>>;

    /// Remove a collection and everything it owns.
    fn release_collection(&self, db_id: UniqueId, collection_id: UniqueId) -> Result<()>;

    /// Remove a partition and its segments.
    fn release_partition(
        &self,
        db_id: UniqueId,
        collection_id: UniqueId,
        partition_id: UniqueId,
    ) -> Result<()>;

    /// Merge channel assignments into the collection; later calls win on conflicting keys.
    fn add_dm_channels(
        &self,
        db_id: UniqueId,
        collection_id: UniqueId,
        channels_to_node: HashMap<String, NodeId>,
    ) -> Result<()>;

    /// Node a channel is assigned to.
    fn get_assigned_node_id_by_channel_name(
        &self,
        db_id: UniqueId,
        collection_id: UniqueId,
        channel: &str,
    ) -> Result<NodeId>;
}
