//! FlowGraph: stage registry, edge wiring and lifecycle
//!
//! Edges are declared per stage as (predecessors, successors), the same way
//! construction code thinks about them. Nothing is cross-checked when edges
//! are recorded; `start` validates the whole wiring before any thread is
//! spawned:
//! - every referenced stage exists and no list repeats a name
//! - `A` lists `B` as successor iff `B` lists `A` as predecessor
//! - exactly one source, at least one sink, no cycles
//!
//! # Lifecycle
//!
//! Idle → Running → Closed. `close` is idempotent and valid from any state.
//!
//! `close` stops the source, then walks the stages in topological order: it
//! closes a stage's input queues, lets the stage drain them and joins its
//! workers before moving on. Every batch the source emitted is processed by
//! every downstream stage before `close` returns.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use parking_lot::Mutex;
use querynode_core::{Error, Result};
use tracing::{debug, info, warn};

use crate::executor::{self, NodeContext, NodeCounters};
use crate::node::{Message, Node};
use crate::queue::BoundedQueue;

/// Snapshot of one stage's counters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeStats {
    /// Stage name
    pub name: String,
    /// Successful `operate` invocations
    pub processed_batches: u64,
    /// Rejected, panicked, or unroutable invocations
    pub failed_batches: u64,
    /// Batches waiting in the stage's input queues
    pub queue_depth: usize,
    /// Largest `timestamp_max` seen on the stage's input
    pub watermark: u64,
    /// Configured parallelism
    pub max_parallelism: usize,
}

#[derive(Debug, Clone, Default)]
struct Edges {
    predecessors: Vec<String>,
    successors: Vec<String>,
}

struct Runtime<M> {
    contexts: HashMap<String, Arc<NodeContext<M>>>,
    /// Stages in topological order, with their worker threads
    stages: Vec<(String, Vec<JoinHandle<()>>)>,
    closed: Arc<AtomicBool>,
}

enum State<M> {
    Idle,
    Running(Runtime<M>),
    Closed,
}

/// A DAG of stages driven from a single source
pub struct FlowGraph<M: Message> {
    nodes: HashMap<String, Arc<dyn Node<M>>>,
    /// Registration order, for deterministic validation messages and stats
    order: Vec<String>,
    edges: HashMap<String, Edges>,
    counters: HashMap<String, Arc<NodeCounters>>,
    state: Mutex<State<M>>,
}

impl<M: Message> Default for FlowGraph<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: Message> FlowGraph<M> {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            order: Vec::new(),
            edges: HashMap::new(),
            counters: HashMap::new(),
            state: Mutex::new(State::Idle),
        }
    }

    /// Register a stage. Fails with `DuplicateNode` if the name is taken.
    pub fn add_node(&mut self, node: Arc<dyn Node<M>>) -> Result<()> {
        let name = node.name().to_string();
        if self.nodes.contains_key(&name) {
            return Err(Error::DuplicateNode(name));
        }
        self.order.push(name.clone());
        self.counters
            .insert(name.clone(), Arc::new(NodeCounters::default()));
        self.nodes.insert(name, node);
        Ok(())
    }

    /// Record the wiring of `name`. Fails with `NodeNotFound` if `name` is unknown.
    ///
    /// Replaces any earlier declaration for the same stage.
    pub fn set_edges(
        &mut self,
        name: &str,
        predecessors: &[&str],
        successors: &[&str],
    ) -> Result<()> {
        if !self.nodes.contains_key(name) {
            return Err(Error::NodeNotFound(name.to_string()));
        }
        self.edges.insert(
            name.to_string(),
            Edges {
                predecessors: predecessors.iter().map(|s| s.to_string()).collect(),
                successors: successors.iter().map(|s| s.to_string()).collect(),
            },
        );
        Ok(())
    }

    fn edges_of(&self, name: &str) -> Edges {
        self.edges.get(name).cloned().unwrap_or_default()
    }

    /// Check the wiring and return the stages in topological order.
    pub fn validate(&self) -> Result<Vec<String>> {
        if self.nodes.is_empty() {
            return Err(Error::InvalidGraph("graph has no nodes".to_string()));
        }

        for name in &self.order {
            let edges = self.edges_of(name);
            for (kind, list) in [
                ("predecessor", &edges.predecessors),
                ("successor", &edges.successors),
            ] {
                let mut seen = HashSet::new();
                for other in list {
                    if !self.nodes.contains_key(other) {
                        return Err(Error::InvalidGraph(format!(
                            "node '{}' references unknown {} '{}'",
                            name, kind, other
                        )));
                    }
                    if !seen.insert(other) {
                        return Err(Error::InvalidGraph(format!(
                            "node '{}' lists {} '{}' twice",
                            name, kind, other
                        )));
                    }
                }
            }
            for succ in &edges.successors {
                if !self.edges_of(succ).predecessors.contains(name) {
                    return Err(Error::InvalidGraph(format!(
                        "edge '{}' -> '{}' is not declared as a predecessor of '{}'",
                        name, succ, succ
                    )));
                }
            }
            for pred in &edges.predecessors {
                if !self.edges_of(pred).successors.contains(name) {
                    return Err(Error::InvalidGraph(format!(
                        "edge '{}' -> '{}' is not declared as a successor of '{}'",
                        pred, name, pred
                    )));
                }
            }
        }

        let sources: Vec<&String> = self
            .order
            .iter()
            .filter(|n| self.edges_of(n).predecessors.is_empty())
            .collect();
        if sources.len() != 1 {
            return Err(Error::InvalidGraph(format!(
                "expected exactly one source, found {:?}",
                sources
            )));
        }
        if !self
            .order
            .iter()
            .any(|n| self.edges_of(n).successors.is_empty())
        {
            return Err(Error::InvalidGraph("graph has no sink".to_string()));
        }

        // Kahn's algorithm
        let mut in_degree: HashMap<&str, usize> = self
            .order
            .iter()
            .map(|n| (n.as_str(), self.edges_of(n).predecessors.len()))
            .collect();
        let mut ready: VecDeque<String> = sources.into_iter().cloned().collect();
        let mut topo = Vec::with_capacity(self.order.len());
        while let Some(name) = ready.pop_front() {
            for succ in self.edges_of(&name).successors {
                if let Some(d) = in_degree.get_mut(succ.as_str()) {
                    *d -= 1;
                    if *d == 0 {
                        ready.push_back(succ);
                    }
                }
            }
            topo.push(name);
        }
        if topo.len() != self.order.len() {
            return Err(Error::InvalidGraph("graph contains a cycle".to_string()));
        }
        Ok(topo)
    }

    /// Validate the wiring and start every stage.
    pub fn start(&self) -> Result<()> {
        let mut state = self.state.lock();
        match *state {
            State::Running(_) => return Err(Error::AlreadyStarted),
            State::Closed => return Err(Error::GraphClosed),
            State::Idle => {}
        }

        let topo = self.validate()?;

        // One queue per edge, sized by the consuming stage.
        let mut edge_queues: HashMap<(String, String), Arc<BoundedQueue<M>>> = HashMap::new();
        for name in &topo {
            let capacity = self.nodes[name].max_queue_length();
            for pred in self.edges_of(name).predecessors {
                edge_queues.insert((pred, name.clone()), Arc::new(BoundedQueue::new(capacity)));
            }
        }

        let closed = Arc::new(AtomicBool::new(false));
        let mut contexts = HashMap::new();
        let mut stages = Vec::with_capacity(topo.len());
        let mut threads = 0;
        // Sinks first so every consumer is running before its producer.
        for name in topo.iter().rev() {
            let edges = self.edges_of(name);
            let inputs = edges
                .predecessors
                .iter()
                .map(|p| Arc::clone(&edge_queues[&(p.clone(), name.clone())]))
                .collect();
            let outputs = edges
                .successors
                .iter()
                .map(|s| Arc::clone(&edge_queues[&(name.clone(), s.clone())]))
                .collect();
            let ctx = Arc::new(NodeContext::new(
                Arc::clone(&self.nodes[name]),
                inputs,
                outputs,
                Arc::clone(&self.counters[name]),
            ));
            let handles = executor::spawn(
                Arc::clone(&ctx),
                edges.predecessors.is_empty(),
                Arc::clone(&closed),
            );
            threads += handles.len();
            stages.push((name.clone(), handles));
            contexts.insert(name.clone(), ctx);
        }
        stages.reverse();

        info!(
            target: "querynode::flowgraph",
            nodes = topo.len(),
            threads,
            "Flow graph started"
        );
        *state = State::Running(Runtime {
            contexts,
            stages,
            closed,
        });
        Ok(())
    }

    /// Stop the source, drain every stage in topological order and join its
    /// threads. Idempotent.
    ///
    /// Batches already emitted by the source are processed to the sinks;
    /// nothing queued is discarded. Blocks for as long as the remaining
    /// stages take to work through their queues.
    pub fn close(&self) {
        let previous = std::mem::replace(&mut *self.state.lock(), State::Closed);
        let runtime = match previous {
            State::Running(runtime) => runtime,
            State::Idle | State::Closed => return,
        };

        runtime.closed.store(true, Ordering::Release);
        let queued: usize = runtime.contexts.values().map(|c| c.queue_depth()).sum();
        debug!(target: "querynode::flowgraph", queued, "Draining flow graph");

        for (name, handles) in runtime.stages {
            if let Some(ctx) = runtime.contexts.get(&name) {
                for q in &ctx.inputs {
                    q.close();
                }
            }
            self.nodes[&name].close();
            for handle in handles {
                if handle.join().is_err() {
                    warn!(target: "querynode::flowgraph", node = %name, "Stage thread panicked");
                }
            }
            debug!(target: "querynode::flowgraph", node = %name, "Stage stopped");
        }
        info!(target: "querynode::flowgraph", "Flow graph closed");
    }

    /// Whether `start` succeeded and `close` has not been called.
    pub fn is_running(&self) -> bool {
        matches!(*self.state.lock(), State::Running(_))
    }

    /// Whether `close` has been called.
    pub fn is_closed(&self) -> bool {
        matches!(*self.state.lock(), State::Closed)
    }

    /// Names of registered stages in registration order.
    pub fn node_names(&self) -> Vec<String> {
        self.order.clone()
    }

    /// Counters for every stage, in registration order.
    pub fn stats(&self) -> Vec<NodeStats> {
        let state = self.state.lock();
        self.order
            .iter()
            .map(|name| {
                let counters = &self.counters[name];
                let queue_depth = match &*state {
                    State::Running(rt) => rt.contexts.get(name).map_or(0, |c| c.queue_depth()),
                    _ => 0,
                };
                NodeStats {
                    name: name.clone(),
                    processed_batches: counters.processed.load(Ordering::Relaxed),
                    failed_batches: counters.failed.load(Ordering::Relaxed),
                    queue_depth,
                    watermark: counters.watermark.load(Ordering::Relaxed),
                    max_parallelism: self.nodes[name].max_parallelism(),
                }
            })
            .collect()
    }
}

impl<M: Message> Drop for FlowGraph<M> {
    fn drop(&mut self) {
        self.close();
    }
}
