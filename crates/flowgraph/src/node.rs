//! Stage and batch contracts

use querynode_core::{Result, TimeRange};

/// A batch flowing between stages
///
/// Clone is required because a single output is fanned out to every
/// successor of a stage.
pub trait Message: Clone + Send + 'static {
    /// Time range the batch covers.
    fn time_range(&self) -> TimeRange;
}

/// A named unit of computation in a flow graph
///
/// `operate` takes `&self` because up to `max_parallelism` invocations may run
/// at once; stages that keep state use interior mutability.
pub trait Node<M>: Send + Sync {
    /// Name, unique among the stages of one graph.
    fn name(&self) -> &str;

    /// Capacity of the stage's pending-input queue (one queue per predecessor).
    fn max_queue_length(&self) -> usize;

    /// Maximum concurrently in-flight `operate` invocations.
    fn max_parallelism(&self) -> usize;

    /// Transform one batch per predecessor into the stage's outputs.
    ///
    /// The source stage is called with an empty input; returning no output
    /// from the source signals end of stream. A returned error is logged and
    /// counted by the graph and the batch is dropped.
    fn operate(&self, input: Vec<M>) -> Result<Vec<M>>;

    /// Called once when the graph closes, before worker threads are joined.
    ///
    /// A source blocked on an external stream must unblock here.
    fn close(&self) {}
}
