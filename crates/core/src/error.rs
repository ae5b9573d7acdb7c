//! Error types for the query node
//!
//! This module defines all error types used throughout the system.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.
//!
//! # Taxonomy
//!
//! - `NotFound`: an addressed entity does not exist. Always recoverable.
//! - `Decode` / `Protocol`: malformed schema bytes or a malformed batch at a
//!   stage boundary. Absorbed by the stage, never unwinds the graph.
//! - Graph construction and lifecycle errors.

use crate::types::UniqueId;
use thiserror::Error;

/// Result type alias for query node operations
pub type Result<T> = std::result::Result<T, Error>;

/// The entity an addressed path failed to resolve to
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotFound {
    /// Unknown database
    #[error("database {db_id}")]
    Database {
        /// Database id
        db_id: UniqueId,
    },

    /// Unknown collection in a known database
    #[error("collection {collection_id} in database {db_id}")]
    Collection {
        /// Database id
        db_id: UniqueId,
        /// Collection id
        collection_id: UniqueId,
    },

    /// Unknown partition in a known collection
    #[error("partition {partition_id} of collection {collection_id} in database {db_id}")]
    Partition {
        /// Database id
        db_id: UniqueId,
        /// Collection id
        collection_id: UniqueId,
        /// Partition id
        partition_id: UniqueId,
    },

    /// Unknown segment in a known partition
    #[error("segment {segment_id} of partition {partition_id} of collection {collection_id}")]
    Segment {
        /// Collection id
        collection_id: UniqueId,
        /// Partition id
        partition_id: UniqueId,
        /// Segment id
        segment_id: UniqueId,
    },

    /// No node assigned for the channel
    #[error("channel '{channel}' of collection {collection_id}")]
    Channel {
        /// Collection id
        collection_id: UniqueId,
        /// Channel name
        channel: String,
    },
}

/// Error types for the query node
#[derive(Debug, Error)]
pub enum Error {
    /// Addressed entity does not exist
    #[error("{operation}: can't find {what}")]
    NotFound {
        /// The operation that failed to resolve its path
        operation: &'static str,
        /// What was missing
        what: NotFound,
    },

    /// Schema bytes (or another serialized payload) could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),

    /// Wrong arity or wrong message kind at a stage boundary
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// A node with this name is already registered
    #[error("Duplicate node: {0}")]
    DuplicateNode(String),

    /// No node with this name is registered
    #[error("Node not found: {0}")]
    NodeNotFound(String),

    /// The declared edges do not form a valid single-source DAG
    #[error("Invalid graph: {0}")]
    InvalidGraph(String),

    /// `start` was called twice
    #[error("Flow graph already started")]
    AlreadyStarted,

    /// The graph or queue has been closed
    #[error("Flow graph closed")]
    GraphClosed,

    /// Operation not permitted in the current lifecycle state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Configuration could not be read, parsed, or validated
    #[error("Config error: {0}")]
    Config(String),
}

impl Error {
    /// Build a `NotFound` error for `operation`.
    pub fn not_found(operation: &'static str, what: NotFound) -> Self {
        Error::NotFound { operation, what }
    }

    /// Whether this error reports a missing entity.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }
}

impl From<rmp_serde::decode::Error> for Error {
    fn from(e: rmp_serde::decode::Error) -> Self {
        Error::Decode(e.to_string())
    }
}

impl From<rmp_serde::encode::Error> for Error {
    fn from(e: rmp_serde::encode::Error) -> Self {
        Error::Decode(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_not_found_collection() {
        let err = Error::not_found(
            "getCollectionByID",
            NotFound::Collection {
                db_id: 0,
                collection_id: 42,
            },
        );
        let msg = err.to_string();
        assert!(msg.contains("getCollectionByID"));
        assert!(msg.contains("collection 42"));
        assert!(msg.contains("database 0"));
        assert!(err.is_not_found());
    }

    #[test]
    fn test_error_display_not_found_channel() {
        let err = Error::not_found(
            "getAssignedNodeIDByChannelName",
            NotFound::Channel {
                collection_id: 7,
                channel: "dm-0".to_string(),
            },
        );
        let msg = err.to_string();
        assert!(msg.contains("'dm-0'"));
        assert!(msg.contains("collection 7"));
    }

    #[test]
    fn test_error_display_protocol() {
        let err = Error::Protocol("expected 1 input, got 3".to_string());
        let msg = err.to_string();
        assert!(msg.contains("Protocol error"));
        assert!(msg.contains("got 3"));
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_decode_error_conversion() {
        let bad: std::result::Result<u64, _> = rmp_serde::from_slice(&[0xc1]);
        let err: Error = bad.unwrap_err().into();
        assert!(matches!(err, Error::Decode(_)));
    }
}
