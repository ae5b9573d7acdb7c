//! Sync Pipeline Integration Tests
//!
//! Drives complete query nodes from an in-memory stream and checks the
//! replica view, service time and GC behavior they end up with.

#[path = "../common/mod.rs"]
mod common;

mod config;
mod gc_release;
mod lifecycle;
mod replica_view;
