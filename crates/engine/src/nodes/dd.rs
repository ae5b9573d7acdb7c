//! Data-definition stage
//!
//! Applies collection and partition creation to the replica and emits a
//! Change Record describing what it did. Drops are not applied here: they are
//! recorded and scheduled for the GC worker.
//!
//! # Design Notes
//!
//! - Runs with parallelism 1; reordering would break create-then-use sequences
//! - CreateCollection for a tracked id is logged and skipped
//! - Every created collection also gets the default partition
//! - A failing message is logged and skipped; the rest of the batch proceeds

use std::sync::Arc;

use querynode_core::{
    CollectionSchema, DdlMsg, NodeConfig, Result, Timestamp, UniqueId, DEFAULT_PARTITION_ID,
};
use querynode_flowgraph::Node;
use querynode_replica::Replica;
use tracing::{debug, warn};

use super::{expect_single, Checked, DD_NODE};
use crate::msg::{DdMsg, GcHint, MetaOperation, Msg, MsgStreamMsg};

/// Applies data-definition messages to the replica
pub struct DdNode {
    replica: Arc<dyn Replica>,
    db_id: UniqueId,
    config: NodeConfig,
}

impl DdNode {
    /// Stage writing to `db_id` in `replica`.
    ///
    /// A configured parallelism above 1 is overridden.
    pub fn new(replica: Arc<dyn Replica>, db_id: UniqueId, config: NodeConfig) -> Self {
        if config.max_parallelism > 1 {
            warn!(
                target: "querynode::dd",
                requested = config.max_parallelism,
                "Data-definition stage is order dependent, forcing parallelism 1"
            );
        }
        Self {
            replica,
            db_id,
            config: NodeConfig {
                max_parallelism: 1,
                ..config
            },
        }
    }

    /// Apply one batch and return its Change Record.
    pub fn apply(&self, batch: &MsgStreamMsg) -> DdMsg {
        let mut dd = DdMsg::new(batch.time_range);
        for msg in &batch.msgs {
            match msg {
                DdlMsg::CreateCollection {
                    collection_id,
                    schema,
                    timestamp,
                } => self.create_collection(&mut dd, *collection_id, schema, *timestamp),
                DdlMsg::DropCollection {
                    collection_id,
                    timestamp,
                } => self.drop_collection(&mut dd, *collection_id, *timestamp),
                DdlMsg::CreatePartition {
                    collection_id,
                    partition_id,
                    timestamp,
                } => self.create_partition(&mut dd, *collection_id, *partition_id, *timestamp),
                DdlMsg::DropPartition {
                    collection_id,
                    partition_id,
                    timestamp,
                } => self.drop_partition(&mut dd, *collection_id, *partition_id, *timestamp),
            }
        }
        dd
    }

    fn create_collection(
        &self,
        dd: &mut DdMsg,
        collection_id: UniqueId,
        schema: &[u8],
        timestamp: Timestamp,
    ) {
        if self.replica.has_collection(self.db_id, collection_id) {
            debug!(
                target: "querynode::dd",
                collection_id,
                "Collection already exists, skipping create"
            );
            return;
        }

        let schema = match CollectionSchema::decode(schema) {
            Ok(schema) => schema,
            Err(e) => {
                warn!(
                    target: "querynode::dd",
                    collection_id,
                    error = %e,
                    "Failed to decode collection schema"
                );
                return;
            }
        };

        if let Err(e) = self.replica.add_collection(self.db_id, collection_id, schema) {
            warn!(target: "querynode::dd", collection_id, error = %e, "Failed to add collection");
            return;
        }
        if let Err(e) = self
            .replica
            .add_partition(self.db_id, collection_id, DEFAULT_PARTITION_ID)
        {
            warn!(
                target: "querynode::dd",
                collection_id,
                error = %e,
                "Failed to add default partition"
            );
            return;
        }

        dd.record_collection(collection_id, MetaOperation::Create, timestamp);
    }

    fn drop_collection(&self, dd: &mut DdMsg, collection_id: UniqueId, timestamp: Timestamp) {
        dd.record_collection(collection_id, MetaOperation::Drop, timestamp);
        dd.gc_record.push(GcHint::Collection { collection_id });
    }

    fn create_partition(
        &self,
        dd: &mut DdMsg,
        collection_id: UniqueId,
        partition_id: UniqueId,
        timestamp: Timestamp,
    ) {
        if let Err(e) = self
            .replica
            .add_partition(self.db_id, collection_id, partition_id)
        {
            warn!(
                target: "querynode::dd",
                collection_id,
                partition_id,
                error = %e,
                "Failed to add partition"
            );
            return;
        }
        dd.record_partition(partition_id, MetaOperation::Create, timestamp);
    }

    fn drop_partition(
        &self,
        dd: &mut DdMsg,
        collection_id: UniqueId,
        partition_id: UniqueId,
        timestamp: Timestamp,
    ) {
        dd.record_partition(partition_id, MetaOperation::Drop, timestamp);
        dd.gc_record.push(GcHint::Partition {
            collection_id,
            partition_id,
        });
    }
}

impl Node<Msg> for DdNode {
    fn name(&self) -> &str {
        DD_NODE
    }

    fn max_queue_length(&self) -> usize {
        self.config.max_queue_length
    }

    fn max_parallelism(&self) -> usize {
        self.config.max_parallelism
    }

    fn operate(&self, input: Vec<Msg>) -> Result<Vec<Msg>> {
        let checked = expect_single(
            DD_NODE,
            self.config.malformed_input,
            input,
            "Stream",
            |msg| match msg {
                Msg::Stream(batch) => Ok(batch),
                other => Err(other),
            },
        )?;
        let dd = match checked {
            Checked::Ok(batch) => self.apply(&batch),
            Checked::Degraded(range) => DdMsg::new(range),
        };
        Ok(vec![Msg::Dd(dd)])
    }
}
