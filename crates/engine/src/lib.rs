//! Ingest pipeline for the query node
//!
//! This crate wires the flow graph to the replica:
//! - msgstream: the message-source contract and an in-memory implementation
//! - msg: batches exchanged between stages, including the Change Record
//! - nodes: input, data-definition, filter, insert and service-time stages
//! - gc: the worker that turns GC hints into replica releases
//! - tsafe: the service-time watermark published by the terminal stage
//! - data_sync: builds the graph and owns its lifecycle
//!
//! The data-definition stage is the only writer of collection/partition
//! topology. Drops are never applied there; they travel as GC hints to the
//! GC worker.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod data_sync;
pub mod gc;
pub mod msg;
pub mod msgstream;
pub mod nodes;
pub mod tsafe;

pub use data_sync::DataSyncService;
pub use gc::{GcStats, GcWorker};
pub use msg::{DdMsg, GcHint, GcRecord, MetaOperateRecord, MetaOperation, Msg, MsgStreamMsg};
pub use msgstream::{MemMsgStream, MsgPack, MsgPosition, MsgStream};
pub use nodes::{DdNode, FilterDmNode, InputNode, InsertNode, ServiceTimeNode};
pub use tsafe::TSafe;
