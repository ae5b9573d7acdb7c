use std::sync::Arc;

use querynode_core::{NodeConfig, Result, TimeRange};
use querynode_flowgraph::{Message, Node};
use tracing::debug;

use super::SERVICE_TIME_NODE;
use crate::msg::Msg;
use crate::tsafe::TSafe;

/// Terminal stage: advances the service-time watermark
///
/// Accepts any arity; the watermark moves to the largest timestamp seen.
pub struct ServiceTimeNode {
    tsafe: Arc<TSafe>,
    config: NodeConfig,
}

impl ServiceTimeNode {
    /// Sink publishing to `tsafe`.
    pub fn new(tsafe: Arc<TSafe>, config: NodeConfig) -> Self {
        Self { tsafe, config }
    }
}

impl Node<Msg> for ServiceTimeNode {
    fn name(&self) -> &str {
        SERVICE_TIME_NODE
    }

    fn max_queue_length(&self) -> usize {
        self.config.max_queue_length
    }

    fn max_parallelism(&self) -> usize {
        self.config.max_parallelism
    }

    fn operate(&self, input: Vec<Msg>) -> Result<Vec<Msg>> {
        if let Some(range) = TimeRange::merge_all(input.iter().map(Message::time_range)) {
            if self.tsafe.set(range.timestamp_max) {
                debug!(
                    target: "querynode::pipeline",
                    service_time = range.timestamp_max,
                    "Service time advanced"
                );
            }
        }
        Ok(Vec::new())
    }
}
