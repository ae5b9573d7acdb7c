//! Per-stage workers
//!
//! Each stage runs `max_parallelism` worker threads sharing its input queues.
//! A worker holds the stage's fetch lock while it pops one batch from every
//! predecessor queue, so a joined input always pairs the n-th batch of each
//! predecessor. The source stage runs a single driver thread instead.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use parking_lot::Mutex;
use querynode_core::{Error, TimeRange};
use tracing::{debug, error, warn};

use crate::node::{Message, Node};
use crate::queue::BoundedQueue;

/// Counters shared by a stage's workers and the graph's `stats()`
#[derive(Debug, Default)]
pub(crate) struct NodeCounters {
    pub(crate) processed: AtomicU64,
    pub(crate) failed: AtomicU64,
    pub(crate) watermark: AtomicU64,
}

pub(crate) struct NodeContext<M> {
    pub(crate) node: Arc<dyn Node<M>>,
    /// One queue per predecessor, in declared predecessor order
    pub(crate) inputs: Vec<Arc<BoundedQueue<M>>>,
    /// One queue per successor, in declared successor order
    pub(crate) outputs: Vec<Arc<BoundedQueue<M>>>,
    pub(crate) counters: Arc<NodeCounters>,
    fetch: Mutex<()>,
}

impl<M: Message> NodeContext<M> {
    pub(crate) fn new(
        node: Arc<dyn Node<M>>,
        inputs: Vec<Arc<BoundedQueue<M>>>,
        outputs: Vec<Arc<BoundedQueue<M>>>,
        counters: Arc<NodeCounters>,
    ) -> Self {
        Self {
            node,
            inputs,
            outputs,
            counters,
            fetch: Mutex::new(()),
        }
    }

    pub(crate) fn queue_depth(&self) -> usize {
        self.inputs.iter().map(|q| q.len()).sum()
    }

    /// Pop one batch per predecessor. `None` once any input is closed and drained.
    fn fetch(&self) -> Option<Vec<M>> {
        let _fetch = self.fetch.lock();
        let mut batch = Vec::with_capacity(self.inputs.len());
        for q in &self.inputs {
            batch.push(q.pop()?);
        }
        Some(batch)
    }

    fn observe(&self, range: TimeRange) {
        let prev = self
            .counters
            .watermark
            .fetch_max(range.timestamp_max, Ordering::AcqRel);
        if range.timestamp_max < prev {
            debug!(
                target: "querynode::flowgraph",
                node = self.node.name(),
                timestamp_max = range.timestamp_max,
                watermark = prev,
                "Batch behind stage watermark"
            );
        }
    }

    /// Run one invocation and route its outputs.
    ///
    /// Returns the outputs count, or `None` if the invocation failed.
    fn run(&self, input: Vec<M>) -> Option<usize> {
        if let Some(range) = TimeRange::merge_all(input.iter().map(Message::time_range)) {
            self.observe(range);
        }

        let node = Arc::clone(&self.node);
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || {
            node.operate(input)
        }));

        let outputs = match result {
            Ok(Ok(outputs)) => outputs,
            Ok(Err(e)) => {
                self.counters.failed.fetch_add(1, Ordering::Relaxed);
                warn!(
                    target: "querynode::flowgraph",
                    node = self.node.name(),
                    error = %e,
                    "Stage rejected batch"
                );
                return None;
            }
            Err(panic) => {
                self.counters.failed.fetch_add(1, Ordering::Relaxed);
                error!(
                    target: "querynode::flowgraph",
                    node = self.node.name(),
                    "Stage panicked: {:?}",
                    panic
                        .downcast_ref::<&str>()
                        .copied()
                        .unwrap_or("(non-string panic)")
                );
                return None;
            }
        };

        let produced = outputs.len();
        if !self.route(outputs) {
            self.counters.failed.fetch_add(1, Ordering::Relaxed);
            return None;
        }
        self.counters.processed.fetch_add(1, Ordering::Relaxed);
        Some(produced)
    }

    /// Deliver outputs to successors. Pushes block while a successor is full.
    ///
    /// Returns false if the output count fits neither a split nor a fan-out.
    fn route(&self, mut outputs: Vec<M>) -> bool {
        if self.outputs.is_empty() || outputs.is_empty() {
            return true;
        }

        let delivered = if outputs.len() == self.outputs.len() {
            self.outputs
                .iter()
                .zip(outputs)
                .try_for_each(|(q, msg)| q.push(msg))
        } else if outputs.len() == 1 {
            let msg = outputs.remove(0);
            match self.outputs.split_last() {
                Some((last, rest)) => rest
                    .iter()
                    .try_for_each(|q| q.push(msg.clone()))
                    .and_then(|_| last.push(msg)),
                None => Ok(()),
            }
        } else {
            error!(
                target: "querynode::flowgraph",
                node = self.node.name(),
                outputs = outputs.len(),
                successors = self.outputs.len(),
                "Output count matches neither successor count nor fan-out"
            );
            return false;
        };

        if let Err(Error::GraphClosed) = delivered {
            debug!(
                target: "querynode::flowgraph",
                node = self.node.name(),
                "Successor closed, output dropped"
            );
        }
        true
    }
}

fn worker_loop<M: Message>(ctx: &NodeContext<M>) {
    while let Some(input) = ctx.fetch() {
        ctx.run(input);
    }
}

fn source_loop<M: Message>(ctx: &NodeContext<M>, closed: &AtomicBool) {
    while !closed.load(Ordering::Acquire) {
        match ctx.run(Vec::new()) {
            Some(0) => {
                debug!(
                    target: "querynode::flowgraph",
                    node = ctx.node.name(),
                    "Source exhausted"
                );
                return;
            }
            Some(_) | None => {}
        }
    }
}

/// Spawn the threads for one stage.
pub(crate) fn spawn<M: Message>(
    ctx: Arc<NodeContext<M>>,
    is_source: bool,
    closed: Arc<AtomicBool>,
) -> Vec<JoinHandle<()>> {
    let name = ctx.node.name().to_string();
    if is_source {
        let handle = std::thread::Builder::new()
            .name(format!("fg-{}", name))
            .spawn(move || source_loop(&ctx, &closed))
            .expect("failed to spawn flow graph source thread");
        return vec![handle];
    }

    let parallelism = ctx.node.max_parallelism().max(1);
    (0..parallelism)
        .map(|i| {
            let ctx = Arc::clone(&ctx);
            std::thread::Builder::new()
                .name(format!("fg-{}-{}", name, i))
                .spawn(move || worker_loop(&ctx))
                .expect("failed to spawn flow graph worker thread")
        })
        .collect()
}
