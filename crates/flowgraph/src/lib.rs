//! Time-ticked flow graph for the query node
//!
//! This crate implements the dataflow engine that moves timestamped batches
//! from one source stage to terminal stages:
//! - Node / Message: the stage contract and the batch contract
//! - BoundedQueue: blocking bounded queue between stages (backpressure)
//! - FlowGraph: wiring, validation, and start/close lifecycle
//!
//! # Ordering
//!
//! A stage with `max_parallelism > 1` interleaves its invocations freely.
//! Stages whose correctness depends on timestamp order must be configured
//! with `max_parallelism = 1`.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod executor;
pub mod graph;
pub mod node;
pub mod queue;

pub use graph::{FlowGraph, NodeStats};
pub use node::{Message, Node};
pub use queue::BoundedQueue;
