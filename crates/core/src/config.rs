//! Query node configuration via `querynode.toml`
//!
//! Replaces process-wide mutable parameters with an explicit struct. The
//! config is read once when the sync service builds its flow graph and is
//! immutable afterwards; stage constructors receive a [`NodeConfig`].

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::{UniqueId, DEFAULT_DB_ID};

/// How a stage treats a batch with the wrong arity or message kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MalformedInputPolicy {
    /// Log and emit a degraded but well-formed output so the pipeline keeps moving
    #[default]
    Degrade,
    /// Return `Error::Protocol`; the graph counts and drops the batch
    Reject,
}

/// Queue and parallelism limits handed to one stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeConfig {
    /// Capacity of the stage's pending-input queue
    pub max_queue_length: usize,
    /// Maximum concurrently in-flight operate invocations
    pub max_parallelism: usize,
    /// Treatment of malformed input
    pub malformed_input: MalformedInputPolicy,
}

/// `[flow_graph]` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowGraphConfig {
    /// Capacity of each stage's pending-input queue
    #[serde(default = "default_max_queue_length")]
    pub max_queue_length: usize,
    /// Concurrent operate invocations for stages that tolerate reordering
    #[serde(default = "default_max_parallelism")]
    pub max_parallelism: usize,
    /// Treatment of malformed input at stage boundaries
    #[serde(default)]
    pub malformed_input: MalformedInputPolicy,
}

fn default_max_queue_length() -> usize {
    1024
}

fn default_max_parallelism() -> usize {
    8
}

impl Default for FlowGraphConfig {
    fn default() -> Self {
        Self {
            max_queue_length: default_max_queue_length(),
            max_parallelism: default_max_parallelism(),
            malformed_input: MalformedInputPolicy::default(),
        }
    }
}

impl FlowGraphConfig {
    /// Limits for a stage whose invocations may interleave.
    pub fn node(&self) -> NodeConfig {
        NodeConfig {
            max_queue_length: self.max_queue_length,
            max_parallelism: self.max_parallelism,
            malformed_input: self.malformed_input,
        }
    }

    /// Limits for a stage whose correctness depends on arrival order.
    ///
    /// Parallelism is pinned to 1 whatever `max_parallelism` says.
    pub fn ordered(&self) -> NodeConfig {
        NodeConfig {
            max_parallelism: 1,
            ..self.node()
        }
    }
}

/// `[data_sync]` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSyncConfig {
    /// Database the data-definition stage applies operations to
    #[serde(default)]
    pub db_id: UniqueId,
    /// Capacity of the GC hint queue between the pipeline and the GC worker
    #[serde(default = "default_gc_queue_length")]
    pub gc_queue_length: usize,
}

fn default_gc_queue_length() -> usize {
    1024
}

impl Default for DataSyncConfig {
    fn default() -> Self {
        Self {
            db_id: DEFAULT_DB_ID,
            gc_queue_length: default_gc_queue_length(),
        }
    }
}

/// Query node configuration loaded from `querynode.toml`.
///
/// # Example
///
/// ```toml
/// [flow_graph]
/// max_queue_length = 1024
/// max_parallelism = 8
/// malformed_input = "degrade"
///
/// [data_sync]
/// db_id = 0
/// gc_queue_length = 1024
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct QueryNodeConfig {
    /// Flow graph limits
    #[serde(default)]
    pub flow_graph: FlowGraphConfig,
    /// Sync service settings
    #[serde(default)]
    pub data_sync: DataSyncConfig,
}

impl QueryNodeConfig {
    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# Query node configuration

[flow_graph]
# Capacity of each stage's input queue. Producers block once it is full.
max_queue_length = 1024
# Worker threads per stage. Order-dependent stages always run with 1.
max_parallelism = 8
# "degrade" = log and keep going with a well-formed empty output
# "reject"  = drop the batch and count it as failed
malformed_input = "degrade"

[data_sync]
db_id = 0
gc_queue_length = 1024
"#
    }

    /// Parse and validate TOML content.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: QueryNodeConfig = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a config file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&content)
    }

    /// Reject limits that would deadlock the pipeline.
    pub fn validate(&self) -> Result<()> {
        if self.flow_graph.max_queue_length == 0 {
            return Err(Error::Config(
                "flow_graph.max_queue_length must be at least 1".to_string(),
            ));
        }
        if self.flow_graph.max_parallelism == 0 {
            return Err(Error::Config(
                "flow_graph.max_parallelism must be at least 1".to_string(),
            ));
        }
        if self.data_sync.gc_queue_length == 0 {
            return Err(Error::Config(
                "data_sync.gc_queue_length must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
