use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::builder::PipelineBuilder;
use crate::node::{EdgeConfig, EdgeEndpoint, NodeConfig};
use crate::types::EdgeType;
use crate::ConfigError;

/// A named, persistent description of a directed graph of typed nodes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub nodes: Vec<NodeConfig>,
    pub edges: Vec<EdgeConfig>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub entry_node: String,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, Value>,
}

impl PipelineConfig {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            nodes: Vec::new(),
            edges: Vec::new(),
            entry_node: String::new(),
            metadata: HashMap::new(),
        }
    }

    /// Starts a fluent builder for a new pipeline.
    pub fn builder(id: impl Into<String>, name: impl Into<String>) -> PipelineBuilder {
        PipelineBuilder::new(id, name)
    }

    pub fn add_node(&mut self, node: NodeConfig) -> &mut Self {
        self.nodes.push(node);
        self
    }

    pub fn add_edge(&mut self, from: impl Into<String>, to: impl Into<String>) -> &mut Self {
        self.edges.push(EdgeConfig {
            from: EdgeEndpoint::node(from),
            to: EdgeEndpoint::node(to),
            edge_type: EdgeType::Default,
            condition: None,
        });
        self
    }

    pub fn get_node(&self, id: &str) -> Option<&NodeConfig> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let data = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}
