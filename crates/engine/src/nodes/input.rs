use std::sync::Arc;

use querynode_core::{NodeConfig, Result};
use querynode_flowgraph::Node;
use tracing::debug;

use super::DM_INPUT_NODE;
use crate::msg::{Msg, MsgStreamMsg};
use crate::msgstream::MsgStream;

/// Source stage: pulls packs from a [`MsgStream`]
pub struct InputNode {
    stream: Arc<dyn MsgStream>,
    config: NodeConfig,
}

impl InputNode {
    /// Source reading `stream`. Runs with parallelism 1.
    pub fn new(stream: Arc<dyn MsgStream>, config: NodeConfig) -> Self {
        Self {
            stream,
            config: NodeConfig {
                max_parallelism: 1,
                ..config
            },
        }
    }
}

impl Node<Msg> for InputNode {
    fn name(&self) -> &str {
        DM_INPUT_NODE
    }

    fn max_queue_length(&self) -> usize {
        self.config.max_queue_length
    }

    fn max_parallelism(&self) -> usize {
        self.config.max_parallelism
    }

    fn operate(&self, _input: Vec<Msg>) -> Result<Vec<Msg>> {
        match self.stream.consume() {
            Some(pack) => {
                debug!(
                    target: "querynode::pipeline",
                    msg_id = pack.start_position.msg_id,
                    msgs = pack.msgs.len(),
                    "Consumed pack"
                );
                Ok(vec![Msg::Stream(MsgStreamMsg::from(pack))])
            }
            None => Ok(Vec::new()),
        }
    }

    fn close(&self) {
        self.stream.close();
    }
}
