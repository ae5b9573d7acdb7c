use querynode_core::{NodeConfig, Result};
use querynode_flowgraph::Node;

use super::{expect_single, Checked, INSERT_NODE};
use crate::msg::Msg;

/// Turns a Change Record into a time tick for the terminal stage
///
/// Order-insensitive, so it runs with the configured parallelism.
pub struct InsertNode {
    config: NodeConfig,
}

impl InsertNode {
    /// Stage with the given limits.
    pub fn new(config: NodeConfig) -> Self {
        Self { config }
    }
}

impl Node<Msg> for InsertNode {
    fn name(&self) -> &str {
        INSERT_NODE
    }

    fn max_queue_length(&self) -> usize {
        self.config.max_queue_length
    }

    fn max_parallelism(&self) -> usize {
        self.config.max_parallelism
    }

    fn operate(&self, input: Vec<Msg>) -> Result<Vec<Msg>> {
        let checked = expect_single(
            INSERT_NODE,
            self.config.malformed_input,
            input,
            "Dd",
            |msg| match msg {
                Msg::Dd(dd) => Ok(dd.time_range),
                other => Err(other),
            },
        )?;
        let range = match checked {
            Checked::Ok(range) | Checked::Degraded(range) => range,
        };
        Ok(vec![Msg::TimeTick(range)])
    }
}
