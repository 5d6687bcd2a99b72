//! Declarative pipeline configuration: typed nodes, directed edges, and the
//! fluent builder used to assemble them.

mod builder;
mod node;
mod pipeline;
mod types;

pub use builder::{NodeBuilder, PipelineBuilder};
pub use node::{EdgeConfig, EdgeEndpoint, NodeConfig};
pub use pipeline::PipelineConfig;
pub use types::{EdgeType, NodeType};

/// Errors from loading or parsing pipeline configuration files.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}
