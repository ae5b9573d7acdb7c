//! GC worker
//!
//! Drains [`GcHint`]s scheduled by the pipeline and releases the named
//! collections and partitions from the replica.
//!
//! # Design Notes
//!
//! - One background thread; hints are applied in the order they were queued
//! - A hint naming something already gone is a no-op, not an error
//! - Shutdown closes the queue and waits until every queued hint is applied

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::Mutex;
use querynode_core::UniqueId;
use querynode_flowgraph::BoundedQueue;
use querynode_replica::Replica;
use tracing::{debug, info, warn};

use crate::msg::GcHint;

/// Counters reported by [`GcWorker::stats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GcStats {
    /// Hints that released something
    pub released: u64,
    /// Hints naming an entity that was already gone
    pub skipped: u64,
    /// Hints waiting in the queue
    pub pending: usize,
}

#[derive(Default)]
struct GcCounters {
    released: AtomicU64,
    skipped: AtomicU64,
}

/// Background release of dropped collections and partitions
///
/// # Example
///
/// ```ignore
/// let worker = GcWorker::new(replica, 0, 1024);
/// worker.start();
/// worker.queue().push(GcHint::Collection { collection_id: 7 })?;
/// worker.shutdown();
/// ```
pub struct GcWorker {
    replica: Arc<dyn Replica>,
    db_id: UniqueId,
    queue: Arc<BoundedQueue<GcHint>>,
    counters: Arc<GcCounters>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl GcWorker {
    /// Worker for `db_id` with a hint queue of `queue_length`.
    pub fn new(replica: Arc<dyn Replica>, db_id: UniqueId, queue_length: usize) -> Self {
        Self {
            replica,
            db_id,
            queue: Arc::new(BoundedQueue::new(queue_length)),
            counters: Arc::new(GcCounters::default()),
            handle: Mutex::new(None),
        }
    }

    /// Queue the pipeline publishes hints to.
    pub fn queue(&self) -> Arc<BoundedQueue<GcHint>> {
        Arc::clone(&self.queue)
    }

    /// Spawn the worker thread. Calling it again while running is a no-op.
    pub fn start(&self) {
        let mut handle = self.handle.lock();
        if handle.is_some() || self.queue.is_closed() {
            return;
        }

        let replica = Arc::clone(&self.replica);
        let queue = Arc::clone(&self.queue);
        let counters = Arc::clone(&self.counters);
        let db_id = self.db_id;

        *handle = Some(
            thread::Builder::new()
                .name("querynode-gc".to_string())
                .spawn(move || {
                    while let Some(hint) = queue.pop() {
                        apply(replica.as_ref(), db_id, hint, &counters);
                    }
                    debug!(target: "querynode::gc", "GC worker exiting");
                })
                .expect("Failed to spawn GC worker thread"),
        );
        info!(target: "querynode::gc", db_id, "GC worker started");
    }

    /// Stop accepting hints, apply what is queued and join the thread.
    pub fn shutdown(&self) {
        self.queue.close();
        if let Some(handle) = self.handle.lock().take() {
            if handle.join().is_err() {
                warn!(target: "querynode::gc", "GC worker panicked");
            }
            info!(
                target: "querynode::gc",
                released = self.counters.released.load(Ordering::Relaxed),
                skipped = self.counters.skipped.load(Ordering::Relaxed),
                "GC worker stopped"
            );
        }
    }

    /// Whether the worker thread is running.
    pub fn is_running(&self) -> bool {
        self.handle.lock().is_some()
    }

    /// Current counters.
    pub fn stats(&self) -> GcStats {
        GcStats {
            released: self.counters.released.load(Ordering::Relaxed),
            skipped: self.counters.skipped.load(Ordering::Relaxed),
            pending: self.queue.len(),
        }
    }
}

impl Drop for GcWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn apply(replica: &dyn Replica, db_id: UniqueId, hint: GcHint, counters: &GcCounters) {
    let result = match hint {
        GcHint::Collection { collection_id } => replica.release_collection(db_id, collection_id),
        GcHint::Partition {
            collection_id,
            partition_id,
        } => replica.release_partition(db_id, collection_id, partition_id),
    };
    match result {
        Ok(()) => {
            counters.released.fetch_add(1, Ordering::Relaxed);
            debug!(target: "querynode::gc", ?hint, "Released");
        }
        Err(e) if e.is_not_found() => {
            counters.skipped.fetch_add(1, Ordering::Relaxed);
            debug!(target: "querynode::gc", ?hint, error = %e, "Nothing to release");
        }
        Err(e) => {
            counters.skipped.fetch_add(1, Ordering::Relaxed);
            warn!(target: "querynode::gc", ?hint, error = %e, "Release failed");
        }
    }
}
