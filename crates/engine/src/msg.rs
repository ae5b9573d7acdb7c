//! Batches exchanged between pipeline stages

use std::collections::HashMap;

use querynode_core::{DdlMsg, TimeRange, Timestamp, UniqueId};
use querynode_flowgraph::Message;

use crate::msgstream::{MsgPack, MsgPosition};

/// Message flowing through the ingest flow graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// Raw batch read from the stream
    Stream(MsgStreamMsg),
    /// Change Record produced by the data-definition stage
    Dd(DdMsg),
    /// Time tick that advances service time
    TimeTick(TimeRange),
}

impl Msg {
    /// Short variant name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Msg::Stream(_) => "Stream",
            Msg::Dd(_) => "Dd",
            Msg::TimeTick(_) => "TimeTick",
        }
    }
}

impl Message for Msg {
    fn time_range(&self) -> TimeRange {
        match self {
            Msg::Stream(msg) => msg.time_range,
            Msg::Dd(msg) => msg.time_range,
            Msg::TimeTick(range) => *range,
        }
    }
}

/// Batch of data-definition messages from one stream pack
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MsgStreamMsg {
    /// Messages in arrival order
    pub msgs: Vec<DdlMsg>,
    /// Range covered by the pack
    pub time_range: TimeRange,
    /// Position the pack was read from
    pub start_position: MsgPosition,
}

impl From<MsgPack> for MsgStreamMsg {
    fn from(pack: MsgPack) -> Self {
        Self {
            time_range: pack.time_range(),
            msgs: pack.msgs,
            start_position: pack.start_position,
        }
    }
}

// ============================================================================
// Change Record
// ============================================================================

/// Create or drop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetaOperation {
    /// Entity was created
    Create,
    /// Entity was dropped
    Drop,
}

/// One applied (or scheduled) topology change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetaOperateRecord {
    /// What happened
    pub op: MetaOperation,
    /// Timestamp of the originating message
    pub timestamp: Timestamp,
}

/// Release work scheduled by a drop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GcHint {
    /// Release a collection and everything it owns
    Collection {
        /// Collection id
        collection_id: UniqueId,
    },
    /// Release one partition
    Partition {
        /// Owning collection id
        collection_id: UniqueId,
        /// Partition id
        partition_id: UniqueId,
    },
}

/// Drops seen in one batch, in message order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GcRecord {
    hints: Vec<GcHint>,
}

impl GcRecord {
    /// Append a hint.
    pub fn push(&mut self, hint: GcHint) {
        self.hints.push(hint);
    }

    /// All hints in message order.
    pub fn hints(&self) -> &[GcHint] {
        &self.hints
    }

    /// Dropped collection ids.
    pub fn collections(&self) -> Vec<UniqueId> {
        self.hints
            .iter()
            .filter_map(|hint| match hint {
                GcHint::Collection { collection_id } => Some(*collection_id),
                GcHint::Partition { .. } => None,
            })
            .collect()
    }

    /// Dropped `(partition_id, collection_id)` pairs.
    pub fn partitions(&self) -> Vec<(UniqueId, UniqueId)> {
        self.hints
            .iter()
            .filter_map(|hint| match hint {
                GcHint::Partition {
                    collection_id,
                    partition_id,
                } => Some((*partition_id, *collection_id)),
                GcHint::Collection { .. } => None,
            })
            .collect()
    }

    /// Whether no drops were recorded.
    pub fn is_empty(&self) -> bool {
        self.hints.is_empty()
    }

    /// Take the hints, leaving the record empty.
    pub fn take(&mut self) -> Vec<GcHint> {
        std::mem::take(&mut self.hints)
    }
}

/// Change Record: what the data-definition stage did with one batch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DdMsg {
    /// Per-collection operations, in message order
    pub collection_records: HashMap<UniqueId, Vec<MetaOperateRecord>>,
    /// Per-partition operations, in message order
    pub partition_records: HashMap<UniqueId, Vec<MetaOperateRecord>>,
    /// Drops to hand to the GC worker
    pub gc_record: GcRecord,
    /// Range of the originating batch
    pub time_range: TimeRange,
}

impl DdMsg {
    /// Empty record covering `time_range`.
    pub fn new(time_range: TimeRange) -> Self {
        Self {
            time_range,
            ..Default::default()
        }
    }

    pub(crate) fn record_collection(
        &mut self,
        collection_id: UniqueId,
        op: MetaOperation,
        timestamp: Timestamp,
    ) {
        self.collection_records
            .entry(collection_id)
            .or_default()
            .push(MetaOperateRecord { op, timestamp });
    }

    pub(crate) fn record_partition(
        &mut self,
        partition_id: UniqueId,
        op: MetaOperation,
        timestamp: Timestamp,
    ) {
        self.partition_records
            .entry(partition_id)
            .or_default()
            .push(MetaOperateRecord { op, timestamp });
    }

    /// Whether the record carries no operations and no drops.
    pub fn is_empty(&self) -> bool {
        self.collection_records.is_empty()
            && self.partition_records.is_empty()
            && self.gc_record.is_empty()
    }
}
