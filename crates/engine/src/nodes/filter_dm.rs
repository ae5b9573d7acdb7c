use std::sync::Arc;

use querynode_core::{NodeConfig, Result};
use querynode_flowgraph::{BoundedQueue, Node};
use tracing::{debug, warn};

use super::{expect_single, Checked, FILTER_DM_NODE};
use crate::msg::{DdMsg, GcHint, Msg};

/// Hands GC hints from Change Records to the GC worker
///
/// Hints are pushed in record order and the push blocks while the GC queue is
/// full, so a slow worker backpressures the pipeline. The record is forwarded
/// with its GC part stripped.
pub struct FilterDmNode {
    gc_queue: Arc<BoundedQueue<GcHint>>,
    config: NodeConfig,
}

impl FilterDmNode {
    /// Stage publishing to `gc_queue`. Runs with parallelism 1.
    pub fn new(gc_queue: Arc<BoundedQueue<GcHint>>, config: NodeConfig) -> Self {
        Self {
            gc_queue,
            config: NodeConfig {
                max_parallelism: 1,
                ..config
            },
        }
    }
}

impl Node<Msg> for FilterDmNode {
    fn name(&self) -> &str {
        FILTER_DM_NODE
    }

    fn max_queue_length(&self) -> usize {
        self.config.max_queue_length
    }

    fn max_parallelism(&self) -> usize {
        self.config.max_parallelism
    }

    fn operate(&self, input: Vec<Msg>) -> Result<Vec<Msg>> {
        let checked = expect_single(
            FILTER_DM_NODE,
            self.config.malformed_input,
            input,
            "Dd",
            |msg| match msg {
                Msg::Dd(dd) => Ok(dd),
                other => Err(other),
            },
        )?;
        let mut dd = match checked {
            Checked::Ok(dd) => dd,
            Checked::Degraded(range) => return Ok(vec![Msg::Dd(DdMsg::new(range))]),
        };

        for hint in dd.gc_record.take() {
            debug!(target: "querynode::gc", ?hint, "Scheduling release");
            if self.gc_queue.push(hint).is_err() {
                warn!(target: "querynode::gc", ?hint, "GC queue closed, dropping hint");
            }
        }
        Ok(vec![Msg::Dd(dd)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use querynode_core::{FlowGraphConfig, TimeRange};

    #[test]
    fn test_hints_forwarded_in_order() {
        let queue = Arc::new(BoundedQueue::new(8));
        let node = FilterDmNode::new(queue.clone(), FlowGraphConfig::default().node());

        let mut dd = DdMsg::new(TimeRange::new(1, 2));
        dd.gc_record.push(GcHint::Collection { collection_id: 3 });
        dd.gc_record.push(GcHint::Partition {
            collection_id: 4,
            partition_id: 40,
        });
        let out = node.operate(vec![Msg::Dd(dd)]).unwrap();

        match &out[..] {
            [Msg::Dd(forwarded)] => assert!(forwarded.gc_record.is_empty()),
            other => panic!("unexpected output {:?}", other),
        }
        assert_eq!(queue.pop(), Some(GcHint::Collection { collection_id: 3 }));
        assert_eq!(
            queue.pop(),
            Some(GcHint::Partition {
                collection_id: 4,
                partition_id: 40
            })
        );
    }

    #[test]
    fn test_closed_queue_does_not_fail_batch() {
        let queue = Arc::new(BoundedQueue::new(1));
        queue.close();
        let node = FilterDmNode::new(queue, FlowGraphConfig::default().node());

        let mut dd = DdMsg::new(TimeRange::new(1, 2));
        dd.gc_record.push(GcHint::Collection { collection_id: 3 });
        assert_eq!(node.operate(vec![Msg::Dd(dd)]).unwrap().len(), 1);
    }
}
