use std::collections::HashMap;

use gantry_core::ModelConfig;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::{EdgeType, NodeType};

/// One end of a directed edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeEndpoint {
    pub node: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<String>,
}

impl EdgeEndpoint {
    pub fn node(id: impl Into<String>) -> Self {
        Self { node: id.into(), port: None }
    }
}

/// A directed edge between two declared nodes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeConfig {
    pub from: EdgeEndpoint,
    pub to: EdgeEndpoint,
    #[serde(default, rename = "type")]
    pub edge_type: EdgeType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
}

/// Configuration for a single pipeline node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub prompt: String,
    #[serde(default, skip_serializing_if = "model_is_unset")]
    pub model: ModelConfig,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<String>,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub max_iter: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub next_nodes: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub target_nodes: Vec<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, Value>,
}

fn model_is_unset(m: &ModelConfig) -> bool {
    m.name.is_empty()
}

fn is_zero(v: &u32) -> bool {
    *v == 0
}

impl NodeConfig {
    pub fn new(id: impl Into<String>, node_type: NodeType) -> Self {
        let mut cfg = Self {
            id: id.into(),
            node_type,
            prompt: String::new(),
            model: ModelConfig::default(),
            tools: Vec::new(),
            max_iter: 0,
            next_nodes: Vec::new(),
            target_nodes: Vec::new(),
            metadata: HashMap::new(),
        };
        // Every worker carries a positive iteration bound.
        if node_type == NodeType::Worker {
            cfg.max_iter = 10;
        }
        cfg
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worker_gets_default_iteration_bound() {
        let node = NodeConfig::new("w", NodeType::Worker);
        assert_eq!(node.max_iter, 10);

        let node = NodeConfig::new("a", NodeType::Llm);
        assert_eq!(node.max_iter, 0);
    }

    #[test]
    fn node_config_deserializes_minimal_json() {
        let node: NodeConfig =
            serde_json::from_str(r#"{"id": "a", "type": "llm"}"#).unwrap();
        assert_eq!(node.id, "a");
        assert_eq!(node.node_type, NodeType::Llm);
        assert!(node.prompt.is_empty());
        assert!(node.model.name.is_empty());
    }
}
