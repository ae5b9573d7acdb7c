//! MetaReplica: in-memory replica backed by a single RwLock
//!
//! This module implements the Replica trait using:
//! - `HashMap<db_id, Vec<Collection>>` for the per-database collection sequence
//! - `parking_lot::RwLock` over the whole store, serializing every mutation
//!   against every other mutation and every reader
//!
//! # Design Notes
//!
//! - **No duplicate check on add_collection**: the data-definition stage
//!   suppresses re-creation. Lookups resolve to the first matching entry.
//! - **Snapshots by clone**: readers get owned copies; the schema is shared
//!   behind an `Arc` so cloning a collection stays cheap.
//! - **Release by position**: `Vec::remove` keeps every sibling in the
//!   sequence, wherever the removed collection sat.

use std::collections::HashMap;

use parking_lot::RwLock;
use tracing::debug;

use querynode_core::{
    CollectionSchema, Error, NodeId, NotFound, PartitionState, Result, UniqueId, DEFAULT_DB_ID,
};

use crate::meta::{Collection, Partition, PartitionStates, Segment};
use crate::traits::Replica;

type Databases = HashMap<UniqueId, Vec<Collection>>;

/// In-memory replica of collection/partition/segment topology
#[derive(Debug)]
pub struct MetaReplica {
    databases: RwLock<Databases>,
}

impl Default for MetaReplica {
    fn default() -> Self {
        Self::new()
    }
}

impl MetaReplica {
    /// Create a replica containing only the empty default database.
    pub fn new() -> Self {
        let mut databases = HashMap::new();
        databases.insert(DEFAULT_DB_ID, Vec::new());
        Self {
            databases: RwLock::new(databases),
        }
    }

    /// Ids of every known database, unordered.
    pub fn database_ids(&self) -> Vec<UniqueId> {
        self.databases.read().keys().copied().collect()
    }
}

fn collection<'a>(
    dbs: &'a Databases,
    op: &'static str,
    db_id: UniqueId,
    collection_id: UniqueId,
) -> Result<&'a Collection> {
    let collections = dbs
        .get(&db_id)
        .ok_or_else(|| Error::not_found(op, NotFound::Database { db_id }))?;
    collections
        .iter()
        .find(|c| c.id == collection_id)
        .ok_or_else(|| {
            Error::not_found(
                op,
                NotFound::Collection {
                    db_id,
                    collection_id,
                },
            )
        })
}

fn collection_mut<'a>(
    dbs: &'a mut Databases,
    op: &'static str,
    db_id: UniqueId,
    collection_id: UniqueId,
) -> Result<&'a mut Collection> {
    let collections = dbs
        .get_mut(&db_id)
        .ok_or_else(|| Error::not_found(op, NotFound::Database { db_id }))?;
    collections
        .iter_mut()
        .find(|c| c.id == collection_id)
        .ok_or_else(|| {
            Error::not_found(
                op,
                NotFound::Collection {
                    db_id,
                    collection_id,
                },
            )
        })
}

fn partition_not_found(
    op: &'static str,
    db_id: UniqueId,
    collection_id: UniqueId,
    partition_id: UniqueId,
) -> Error {
    Error::not_found(
        op,
        NotFound::Partition {
            db_id,
            collection_id,
            partition_id,
        },
    )
}

fn partition_mut<'a>(
    dbs: &'a mut Databases,
    op: &'static str,
    db_id: UniqueId,
    collection_id: UniqueId,
    partition_id: UniqueId,
) -> Result<&'a mut Partition> {
    collection_mut(dbs, op, db_id, collection_id)?
        .partitions
        .get_mut(&partition_id)
        .ok_or_else(|| partition_not_found(op, db_id, collection_id, partition_id))
}

impl Replica for MetaReplica {
    fn add_database(&self, db_id: UniqueId) -> bool {
        let mut dbs = self.databases.write();
        if dbs.contains_key(&db_id) {
            return false;
        }
        dbs.insert(db_id, Vec::new());
        true
    }

    fn get_collections(&self, db_id: UniqueId) -> Result<Vec<Collection>> {
        let dbs = self.databases.read();
        dbs.get(&db_id)
            .cloned()
            .ok_or_else(|| Error::not_found("getCollections", NotFound::Database { db_id }))
    }

    fn get_partitions(&self, db_id: UniqueId, collection_id: UniqueId) -> Result<Vec<Partition>> {
        let dbs = self.databases.read();
        let c = collection(&dbs, "getPartitions", db_id, collection_id)?;
        Ok(c.partitions.values().cloned().collect())
    }

    fn get_segments(
        &self,
        db_id: UniqueId,
        collection_id: UniqueId,
        partition_id: UniqueId,
    ) -> Result<Vec<Segment>> {
        let op = "getSegments";
        let dbs = self.databases.read();
        let p = collection(&dbs, op, db_id, collection_id)?
            .partitions
            .get(&partition_id)
            .ok_or_else(|| partition_not_found(op, db_id, collection_id, partition_id))?;
        Ok(p.segments.values().cloned().collect())
    }

    fn get_collection_by_id(&self, db_id: UniqueId, collection_id: UniqueId) -> Result<Collection> {
        let dbs = self.databases.read();
        collection(&dbs, "getCollectionByID", db_id, collection_id).cloned()
    }

    fn get_partition_by_id(
        &self,
        db_id: UniqueId,
        collection_id: UniqueId,
        partition_id: UniqueId,
    ) -> Result<Partition> {
        let op = "getPartitionByID";
        let dbs = self.databases.read();
        collection(&dbs, op, db_id, collection_id)?
            .partitions
            .get(&partition_id)
            .cloned()
            .ok_or_else(|| partition_not_found(op, db_id, collection_id, partition_id))
    }

    fn has_collection(&self, db_id: UniqueId, collection_id: UniqueId) -> bool {
        let dbs = self.databases.read();
        collection(&dbs, "hasCollection", db_id, collection_id).is_ok()
    }

    fn add_collection(
        &self,
        db_id: UniqueId,
        collection_id: UniqueId,
        schema: CollectionSchema,
    ) -> Result<()> {
        let mut dbs = self.databases.write();
        let collections = dbs
            .get_mut(&db_id)
            .ok_or_else(|| Error::not_found("addCollection", NotFound::Database { db_id }))?;
        collections.push(Collection::new(collection_id, schema));
        debug!(target: "querynode::replica", db_id, collection_id, "Collection added");
        Ok(())
    }

    fn add_partition(
        &self,
        db_id: UniqueId,
        collection_id: UniqueId,
        partition_id: UniqueId,
    ) -> Result<()> {
        let mut dbs = self.databases.write();
        let c = collection_mut(&mut dbs, "addPartition", db_id, collection_id)?;
        c.partitions.insert(partition_id, Partition::new(partition_id));
        debug!(target: "querynode::replica", collection_id, partition_id, "Partition added");
        Ok(())
    }

    fn add_segment(
        &self,
        db_id: UniqueId,
        collection_id: UniqueId,
        partition_id: UniqueId,
        segment_id: UniqueId,
    ) -> Result<()> {
        let mut dbs = self.databases.write();
        let p = partition_mut(&mut dbs, "addSegment", db_id, collection_id, partition_id)?;
        p.segments.insert(segment_id, Segment { id: segment_id });
        Ok(())
    }

    fn remove_segment(
        &self,
        db_id: UniqueId,
        collection_id: UniqueId,
        partition_id: UniqueId,
        segment_id: UniqueId,
    ) -> Result<()> {
        let op = "removeSegment";
        let mut dbs = self.databases.write();
        let p = partition_mut(&mut dbs, op, db_id, collection_id, partition_id)?;
        p.segments.remove(&segment_id).map(|_| ()).ok_or_else(|| {
            Error::not_found(
                op,
                NotFound::Segment {
                    collection_id,
                    partition_id,
                    segment_id,
                },
            )
        })
    }

    fn update_partition_state(
        &self,
        db_id: UniqueId,
        collection_id: UniqueId,
        partition_id: UniqueId,
        state: PartitionState,
    ) -> Result<()> {
        let mut dbs = self.databases.write();
        let p = partition_mut(
            &mut dbs,
            "updatePartitionState",
            db_id,
            collection_id,
            partition_id,
        )?;
        p.state = state;
        Ok(())
    }

    fn get_partition_states(
        &self,
        db_id: UniqueId,
        collection_id: UniqueId,
        partition_ids: &[UniqueId],
    ) -> Result<Vec<PartitionStates>> {
        let dbs = self.databases.read();
        let tracked = collection(&dbs, "getPartitionStates", db_id, collection_id).ok();
        Ok(partition_ids
            .iter()
            .map(|&partition_id| PartitionStates {
                partition_id,
                state: tracked
                    .and_then(|c| c.partitions.get(&partition_id))
                    .map(|p| p.state)
                    .unwrap_or(PartitionState::NotPresent),
            })
            .collect())
    }

    fn release_collection(&self, db_id: UniqueId, collection_id: UniqueId) -> Result<()> {
        let mut dbs = self.databases.write();
        let collections = dbs.get_mut(&db_id).ok_or_else(|| {
            Error::not_found("releaseCollection", NotFound::Database { db_id })
        })?;
        let idx = collections
            .iter()
            .position(|c| c.id == collection_id)
            .ok_or_else(|| {
                Error::not_found(
                    "releaseCollection",
                    NotFound::Collection {
                        db_id,
                        collection_id,
                    },
                )
            })?;
        collections.remove(idx);
        debug!(target: "querynode::replica", db_id, collection_id, "Collection released");
        Ok(())
    }

    fn release_partition(
        &self,
        db_id: UniqueId,
        collection_id: UniqueId,
        partition_id: UniqueId,
    ) -> Result<()> {
        let op = "releasePartition";
        let mut dbs = self.databases.write();
        let c = collection_mut(&mut dbs, op, db_id, collection_id)?;
        c.partitions
            .remove(&partition_id)
            .ok_or_else(|| partition_not_found(op, db_id, collection_id, partition_id))?;
        debug!(target: "querynode::replica", collection_id, partition_id, "Partition released");
        Ok(())
    }

    fn add_dm_channels(
        &self,
        db_id: UniqueId,
        collection_id: UniqueId,
        channels_to_node: HashMap<String, NodeId>,
    ) -> Result<()> {
        let mut dbs = self.databases.write();
        let c = collection_mut(&mut dbs, "addDmChannels", db_id, collection_id)?;
        c.dm_channels.extend(channels_to_node);
        Ok(())
    }

    fn get_assigned_node_id_by_channel_name(
        &self,
        db_id: UniqueId,
        collection_id: UniqueId,
        channel: &str,
    ) -> Result<NodeId> {
        let op = "getAssignedNodeIDByChannelName";
        let dbs = self.databases.read();
        collection(&dbs, op, db_id, collection_id)?
            .dm_channels
            .get(channel)
            .copied()
            .ok_or_else(|| {
                Error::not_found(
                    op,
                    NotFound::Channel {
                        collection_id,
                        channel: channel.to_string(),
                    },
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn replica_with(ids: &[UniqueId]) -> MetaReplica {
        let replica = MetaReplica::new();
        for &id in ids {
            replica
                .add_collection(DEFAULT_DB_ID, id, CollectionSchema::new(format!("c{}", id)))
                .unwrap();
        }
        replica
    }

    #[test]
    fn test_default_database_exists() {
        let replica = MetaReplica::new();
        assert!(replica.get_collections(DEFAULT_DB_ID).unwrap().is_empty());
        assert_eq!(replica.database_ids(), vec![DEFAULT_DB_ID]);
    }

    #[test]
    fn test_add_collection_unknown_db() {
        let replica = MetaReplica::new();
        let err = replica
            .add_collection(9, 1, CollectionSchema::new("c"))
            .unwrap_err();
        assert!(err.is_not_found());
        assert!(err.to_string().contains("database 9"));
    }

    #[test]
    fn test_add_database_once() {
        let replica = MetaReplica::new();
        assert!(replica.add_database(3));
        assert!(!replica.add_database(3));
        replica.add_collection(3, 1, CollectionSchema::new("c")).unwrap();
        assert!(replica.has_collection(3, 1));
        assert!(!replica.has_collection(DEFAULT_DB_ID, 1));
    }

    #[test]
    fn test_new_partition_not_present() {
        let replica = replica_with(&[1]);
        replica.add_partition(DEFAULT_DB_ID, 1, 10).unwrap();
        let p = replica.get_partition_by_id(DEFAULT_DB_ID, 1, 10).unwrap();
        assert_eq!(p.state, PartitionState::NotPresent);
        assert!(p.segments.is_empty());
    }

    #[test]
    fn test_add_partition_unknown_collection() {
        let replica = MetaReplica::new();
        let err = replica.add_partition(DEFAULT_DB_ID, 1, 10).unwrap_err();
        assert!(err.to_string().contains("addPartition"));
        assert!(err.to_string().contains("collection 1"));
    }

    #[test]
    fn test_update_partition_state() {
        let replica = replica_with(&[1]);
        replica.add_partition(DEFAULT_DB_ID, 1, 10).unwrap();
        replica
            .update_partition_state(DEFAULT_DB_ID, 1, 10, PartitionState::InMemory)
            .unwrap();
        let states = replica
            .get_partition_states(DEFAULT_DB_ID, 1, &[10, 11])
            .unwrap();
        assert_eq!(
            states,
            vec![
                PartitionStates {
                    partition_id: 10,
                    state: PartitionState::InMemory
                },
                PartitionStates {
                    partition_id: 11,
                    state: PartitionState::NotPresent
                },
            ]
        );
    }

    #[test]
    fn test_update_state_missing_partition() {
        let replica = replica_with(&[1]);
        let err = replica
            .update_partition_state(DEFAULT_DB_ID, 1, 10, PartitionState::OnDisk)
            .unwrap_err();
        assert!(err.to_string().contains("partition 10"));
    }

    #[test]
    fn test_partition_states_untracked_collection() {
        let replica = MetaReplica::new();
        let states = replica.get_partition_states(DEFAULT_DB_ID, 5, &[1, 2, 3]).unwrap();
        assert_eq!(states.len(), 3);
        assert!(states.iter().all(|s| s.state == PartitionState::NotPresent));
    }

    #[test]
    fn test_segments() {
        let replica = replica_with(&[1]);
        replica.add_partition(DEFAULT_DB_ID, 1, 10).unwrap();
        replica.add_segment(DEFAULT_DB_ID, 1, 10, 100).unwrap();
        replica.add_segment(DEFAULT_DB_ID, 1, 10, 101).unwrap();
        let mut ids: Vec<_> = replica
            .get_segments(DEFAULT_DB_ID, 1, 10)
            .unwrap()
            .into_iter()
            .map(|s| s.id)
            .collect();
        ids.sort();
        assert_eq!(ids, vec![100, 101]);

        replica.remove_segment(DEFAULT_DB_ID, 1, 10, 100).unwrap();
        assert!(replica.remove_segment(DEFAULT_DB_ID, 1, 10, 100).unwrap_err().is_not_found());
        assert!(replica.get_segments(DEFAULT_DB_ID, 1, 11).unwrap_err().is_not_found());
    }

    #[test]
    fn test_release_partition() {
        let replica = replica_with(&[1]);
        replica.add_partition(DEFAULT_DB_ID, 1, 10).unwrap();
        replica.add_partition(DEFAULT_DB_ID, 1, 11).unwrap();
        replica.release_partition(DEFAULT_DB_ID, 1, 10).unwrap();
        let ids = replica.get_collection_by_id(DEFAULT_DB_ID, 1).unwrap().partition_ids();
        assert_eq!(ids, vec![11]);
        assert!(replica
            .release_partition(DEFAULT_DB_ID, 1, 10)
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn test_release_collection_missing() {
        let replica = replica_with(&[1]);
        let err = replica.release_collection(DEFAULT_DB_ID, 2).unwrap_err();
        assert!(err.is_not_found());
        assert!(err.to_string().contains("releaseCollection"));
        assert_eq!(replica.get_collections(DEFAULT_DB_ID).unwrap().len(), 1);
    }

    #[test]
    fn test_release_collection_unknown_db() {
        let replica = replica_with(&[1]);
        let err = replica.release_collection(9, 1).unwrap_err();
        assert!(matches!(
            err,
            Error::NotFound {
                what: NotFound::Database { db_id: 9 },
                ..
            }
        ));
    }

    #[test]
    fn test_snapshot_is_detached() {
        let replica = replica_with(&[1]);
        let before = replica.get_collection_by_id(DEFAULT_DB_ID, 1).unwrap();
        replica.add_partition(DEFAULT_DB_ID, 1, 10).unwrap();
        assert!(before.partitions.is_empty());
    }

    #[test]
    fn test_channel_lookup() {
        let replica = replica_with(&[1]);
        let mut channels = HashMap::new();
        channels.insert("dm-0".to_string(), 7);
        replica.add_dm_channels(DEFAULT_DB_ID, 1, channels).unwrap();
        assert_eq!(
            replica
                .get_assigned_node_id_by_channel_name(DEFAULT_DB_ID, 1, "dm-0")
                .unwrap(),
            7
        );
        let err = replica
            .get_assigned_node_id_by_channel_name(DEFAULT_DB_ID, 1, "dm-1")
            .unwrap_err();
        assert!(err.to_string().contains("'dm-1'"));
        assert!(replica
            .add_dm_channels(DEFAULT_DB_ID, 2, HashMap::new())
            .unwrap_err()
            .is_not_found());
    }
}
