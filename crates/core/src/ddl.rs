//! Data-definition messages read from the ingest stream

use serde::{Deserialize, Serialize};

use crate::types::{Timestamp, UniqueId};

/// A data-definition operation
///
/// The schema of a CreateCollection stays an opaque blob here; it is decoded
/// by the data-definition stage when the collection is added.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DdlMsg {
    /// Create a collection together with its default partition
    CreateCollection {
        /// Collection id
        collection_id: UniqueId,
        /// Serialized `CollectionSchema`
        schema: Vec<u8>,
        /// Operation timestamp
        timestamp: Timestamp,
    },
    /// Drop a collection
    DropCollection {
        /// Collection id
        collection_id: UniqueId,
        /// Operation timestamp
        timestamp: Timestamp,
    },
    /// Create a partition in an existing collection
    CreatePartition {
        /// Owning collection id
        collection_id: UniqueId,
        /// Partition id
        partition_id: UniqueId,
        /// Operation timestamp
        timestamp: Timestamp,
    },
    /// Drop a partition
    DropPartition {
        /// Owning collection id
        collection_id: UniqueId,
        /// Partition id
        partition_id: UniqueId,
        /// Operation timestamp
        timestamp: Timestamp,
    },
}

impl DdlMsg {
    /// Timestamp of the operation.
    pub fn timestamp(&self) -> Timestamp {
        match self {
            DdlMsg::CreateCollection { timestamp, .. }
            | DdlMsg::DropCollection { timestamp, .. }
            | DdlMsg::CreatePartition { timestamp, .. }
            | DdlMsg::DropPartition { timestamp, .. } => *timestamp,
        }
    }

    /// Collection the operation addresses.
    pub fn collection_id(&self) -> UniqueId {
        match self {
            DdlMsg::CreateCollection { collection_id, .. }
            | DdlMsg::DropCollection { collection_id, .. }
            | DdlMsg::CreatePartition { collection_id, .. }
            | DdlMsg::DropPartition { collection_id, .. } => *collection_id,
        }
    }

    /// Short operation name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            DdlMsg::CreateCollection { .. } => "CreateCollection",
            DdlMsg::DropCollection { .. } => "DropCollection",
            DdlMsg::CreatePartition { .. } => "CreatePartition",
            DdlMsg::DropPartition { .. } => "DropPartition",
        }
    }
}
