//! Sync service: builds the ingest flow graph and owns its lifecycle
//!
//! # Design Notes
//!
//! - The graph is built once in `new`; wiring errors are logged there and
//!   surface again from `start` through graph validation
//! - `start` launches the GC worker before the graph so the filter stage never
//!   publishes into a queue nobody drains
//! - `close` stops the graph first, then drains outstanding GC hints
//! - `seek_segment` is only accepted while the graph is not running; start,
//!   close and seek serialize on one lifecycle lock

use std::sync::Arc;

use parking_lot::Mutex;
use querynode_core::{Error, QueryNodeConfig, Result, UniqueId};
use querynode_flowgraph::{FlowGraph, NodeStats};
use querynode_replica::Replica;
use tracing::{error, info};

use crate::gc::{GcStats, GcWorker};
use crate::msg::Msg;
use crate::msgstream::{MsgPosition, MsgStream};
use crate::nodes::{
    DdNode, FilterDmNode, InputNode, InsertNode, ServiceTimeNode, DD_NODE, DM_INPUT_NODE,
    FILTER_DM_NODE, INSERT_NODE, SERVICE_TIME_NODE,
};
use crate::tsafe::TSafe;

/// Replicates data-definition traffic from a stream into a replica
pub struct DataSyncService {
    graph: FlowGraph<Msg>,
    stream: Arc<dyn MsgStream>,
    tsafe: Arc<TSafe>,
    gc: GcWorker,
    db_id: UniqueId,
    lifecycle: Mutex<()>,
}

impl DataSyncService {
    /// Build the pipeline reading `stream` and writing to `replica`.
    pub fn new(
        replica: Arc<dyn Replica>,
        stream: Arc<dyn MsgStream>,
        config: &QueryNodeConfig,
    ) -> Self {
        let db_id = config.data_sync.db_id;
        let tsafe = Arc::new(TSafe::new());
        let gc = GcWorker::new(Arc::clone(&replica), db_id, config.data_sync.gc_queue_length);

        let mut graph = FlowGraph::new();
        if let Err(e) = init_nodes(
            &mut graph,
            replica,
            Arc::clone(&stream),
            &gc,
            Arc::clone(&tsafe),
            config,
        ) {
            error!(target: "querynode::sync", error = %e, "Failed to wire flow graph");
        }

        Self {
            graph,
            stream,
            tsafe,
            gc,
            db_id,
            lifecycle: Mutex::new(()),
        }
    }

    /// Start the GC worker and the flow graph.
    pub fn start(&self) -> Result<()> {
        let _lifecycle = self.lifecycle.lock();
        if self.graph.is_closed() {
            return Err(Error::GraphClosed);
        }
        self.gc.start();
        self.graph.start()?;
        info!(target: "querynode::sync", db_id = self.db_id, "Data sync service started");
        Ok(())
    }

    /// Stop the pipeline and drain pending GC hints. Idempotent.
    ///
    /// Every batch already read from the stream is carried through the graph
    /// and every drop it scheduled is applied before this returns.
    pub fn close(&self) {
        let _lifecycle = self.lifecycle.lock();
        let was_running = self.graph.is_running();
        self.graph.close();
        self.gc.shutdown();
        if was_running {
            info!(target: "querynode::sync", db_id = self.db_id, "Data sync service closed");
        }
    }

    /// Reposition the input stream. Rejected while the pipeline runs.
    pub fn seek_segment(&self, position: &MsgPosition) -> Result<()> {
        let _lifecycle = self.lifecycle.lock();
        if self.graph.is_running() {
            return Err(Error::InvalidState(
                "seek_segment: data sync service is running".to_string(),
            ));
        }
        self.stream.seek(position)
    }

    /// Service-time watermark advanced by the terminal stage.
    pub fn tsafe(&self) -> Arc<TSafe> {
        Arc::clone(&self.tsafe)
    }

    /// Whether the pipeline is running.
    pub fn is_running(&self) -> bool {
        self.graph.is_running()
    }

    /// Per-stage counters.
    pub fn graph_stats(&self) -> Vec<NodeStats> {
        self.graph.stats()
    }

    /// GC worker counters.
    pub fn gc_stats(&self) -> GcStats {
        self.gc.stats()
    }
}

impl Drop for DataSyncService {
    fn drop(&mut self) {
        self.close();
    }
}

fn init_nodes(
    graph: &mut FlowGraph<Msg>,
    replica: Arc<dyn Replica>,
    stream: Arc<dyn MsgStream>,
    gc: &GcWorker,
    tsafe: Arc<TSafe>,
    config: &QueryNodeConfig,
) -> Result<()> {
    let fg = &config.flow_graph;

    graph.add_node(Arc::new(InputNode::new(stream, fg.ordered())))?;
    graph.add_node(Arc::new(DdNode::new(
        replica,
        config.data_sync.db_id,
        fg.ordered(),
    )))?;
    graph.add_node(Arc::new(FilterDmNode::new(gc.queue(), fg.ordered())))?;
    graph.add_node(Arc::new(InsertNode::new(fg.node())))?;
    graph.add_node(Arc::new(ServiceTimeNode::new(tsafe, fg.node())))?;

    graph.set_edges(DM_INPUT_NODE, &[], &[DD_NODE])?;
    graph.set_edges(DD_NODE, &[DM_INPUT_NODE], &[FILTER_DM_NODE])?;
    graph.set_edges(FILTER_DM_NODE, &[DD_NODE], &[INSERT_NODE])?;
    graph.set_edges(INSERT_NODE, &[FILTER_DM_NODE], &[SERVICE_TIME_NODE])?;
    graph.set_edges(SERVICE_TIME_NODE, &[INSERT_NODE], &[])?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::msgstream::MemMsgStream;
    use querynode_replica::MetaReplica;

    fn service() -> (Arc<MemMsgStream>, DataSyncService) {
        let stream = Arc::new(MemMsgStream::new("dml-0"));
        let replica = Arc::new(MetaReplica::new());
        let service = DataSyncService::new(replica, stream.clone(), &QueryNodeConfig::default());
        (stream, service)
    }

    #[test]
    fn test_graph_wiring() {
        let (_, service) = service();
        let names: Vec<_> = service.graph_stats().into_iter().map(|s| s.name).collect();
        assert_eq!(
            names,
            vec![
                DM_INPUT_NODE,
                DD_NODE,
                FILTER_DM_NODE,
                INSERT_NODE,
                SERVICE_TIME_NODE
            ]
        );
        assert!(service.graph.validate().is_ok());
    }

    #[test]
    fn test_order_dependent_stages_are_serial() {
        let (_, service) = service();
        for stats in service.graph_stats() {
            match stats.name.as_str() {
                DM_INPUT_NODE | DD_NODE | FILTER_DM_NODE => assert_eq!(stats.max_parallelism, 1),
                _ => assert_eq!(stats.max_parallelism, 8),
            }
        }
    }

    #[test]
    fn test_restart_after_close_rejected() {
        let (_, service) = service();
        service.start().unwrap();
        assert!(service.is_running());
        service.close();
        service.close();
        assert!(matches!(service.start(), Err(Error::GraphClosed)));
    }
}
