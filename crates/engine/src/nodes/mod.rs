//! Pipeline stages
//!
//! ```text
//! dm_input_node -> dd_node -> filter_dm_node -> insert_node -> service_time_node
//!                                  |
//!                                  +-- GC hints --> GcWorker
//! ```
//!
//! The data-definition, filter and insert stages expect exactly one batch of a
//! specific kind. What happens otherwise is decided by [`MalformedInputPolicy`].

mod dd;
mod filter_dm;
mod input;
mod insert;
mod service_time;

pub use dd::DdNode;
pub use filter_dm::FilterDmNode;
pub use input::InputNode;
pub use insert::InsertNode;
pub use service_time::ServiceTimeNode;

use querynode_core::{Error, MalformedInputPolicy, Result, TimeRange};
use querynode_flowgraph::Message;
use tracing::warn;

use crate::msg::Msg;

/// Source stage
pub const DM_INPUT_NODE: &str = "dm_input_node";
/// Data-definition stage
pub const DD_NODE: &str = "dd_node";
/// GC hint filter stage
pub const FILTER_DM_NODE: &str = "filter_dm_node";
/// Insert stage
pub const INSERT_NODE: &str = "insert_node";
/// Terminal stage
pub const SERVICE_TIME_NODE: &str = "service_time_node";

/// Outcome of checking a stage's input
pub(crate) enum Checked<T> {
    /// The single well-formed payload
    Ok(T),
    /// Input was malformed and the policy is Degrade; carries the merged observed range
    Degraded(TimeRange),
}

/// Expect exactly one batch and extract its payload with `extract`.
///
/// Logs and returns `Checked::Degraded` or `Error::Protocol` per `policy`.
pub(crate) fn expect_single<T>(
    node: &str,
    policy: MalformedInputPolicy,
    mut input: Vec<Msg>,
    expected: &'static str,
    extract: impl FnOnce(Msg) -> std::result::Result<T, Msg>,
) -> Result<Checked<T>> {
    let observed = TimeRange::merge_all(input.iter().map(Message::time_range)).unwrap_or_default();
    let detail = if input.len() != 1 {
        format!("expected 1 input, got {}", input.len())
    } else {
        match input.pop().map(extract) {
            Some(Ok(payload)) => return Ok(Checked::Ok(payload)),
            Some(Err(other)) => format!("expected {} message, got {}", expected, other.kind()),
            None => "expected 1 input, got 0".to_string(),
        }
    };

    match policy {
        MalformedInputPolicy::Degrade => {
            warn!(
                target: "querynode::pipeline",
                node,
                detail = %detail,
                "Malformed input, emitting degraded output"
            );
            Ok(Checked::Degraded(observed))
        }
        MalformedInputPolicy::Reject => Err(Error::Protocol(format!("{}: {}", node, detail))),
    }
}
