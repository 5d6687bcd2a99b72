use gantry_core::ModelConfig;
use serde_json::Value;

use crate::node::{EdgeConfig, EdgeEndpoint, NodeConfig};
use crate::pipeline::PipelineConfig;
use crate::types::{EdgeType, NodeType};

/// Fluent builder for [`PipelineConfig`].
pub struct PipelineBuilder {
    config: PipelineConfig,
}

/// Builder for one node; `done()` returns to the pipeline builder.
pub struct NodeBuilder {
    pipeline: PipelineBuilder,
    node: NodeConfig,
}

impl PipelineBuilder {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self { config: PipelineConfig::new(id, name) }
    }

    pub fn description(mut self, desc: impl Into<String>) -> Self {
        self.config.description = desc.into();
        self
    }

    pub fn node(self, id: impl Into<String>, node_type: NodeType) -> NodeBuilder {
        NodeBuilder { pipeline: self, node: NodeConfig::new(id, node_type) }
    }

    pub fn edge(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.config.add_edge(from, to);
        self
    }

    pub fn conditional_edge(
        mut self,
        from: impl Into<String>,
        to: impl Into<String>,
        condition: impl Into<String>,
    ) -> Self {
        self.config.edges.push(EdgeConfig {
            from: EdgeEndpoint::node(from),
            to: EdgeEndpoint::node(to),
            edge_type: EdgeType::Conditional,
            condition: Some(condition.into()),
        });
        self
    }

    pub fn entry_node(mut self, id: impl Into<String>) -> Self {
        self.config.entry_node = id.into();
        self
    }

    pub fn build(self) -> PipelineConfig {
        self.config
    }
}

impl NodeBuilder {
    pub fn prompt(mut self, prompt: impl Into<String>) -> Self {
        self.node.prompt = prompt.into();
        self
    }

    pub fn model(mut self, name: impl Into<String>) -> Self {
        self.node.model = ModelConfig::new(name);
        self
    }

    pub fn model_config(mut self, cfg: ModelConfig) -> Self {
        self.node.model = cfg;
        self
    }

    pub fn tools<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.node.tools.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn max_iterations(mut self, max: u32) -> Self {
        self.node.max_iter = max;
        self
    }

    pub fn next_nodes<I, S>(mut self, nodes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.node.next_nodes.extend(nodes.into_iter().map(Into::into));
        self
    }

    pub fn target_nodes<I, S>(mut self, nodes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.node.target_nodes.extend(nodes.into_iter().map(Into::into));
        self
    }

    pub fn meta(mut self, key: impl Into<String>, val: Value) -> Self {
        self.node.metadata.insert(key.into(), val);
        self
    }

    /// Finishes this node and returns to the pipeline builder.
    pub fn done(mut self) -> PipelineBuilder {
        self.pipeline.config.add_node(self.node);
        self.pipeline
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_assembles_pipeline() {
        let cfg = PipelineConfig::builder("support", "Customer Support")
            .node("router", NodeType::Router)
            .prompt("Classify the request.")
            .next_nodes(["technical", "billing"])
            .done()
            .node("technical", NodeType::Llm)
            .prompt("You are a technical specialist.")
            .done()
            .node("billing", NodeType::Llm)
            .prompt("You are a billing specialist.")
            .done()
            .conditional_edge("router", "technical", "topic == technical")
            .conditional_edge("router", "billing", "topic == billing")
            .entry_node("router")
            .build();

        assert_eq!(cfg.nodes.len(), 3);
        assert_eq!(cfg.edges.len(), 2);
        assert_eq!(cfg.entry_node, "router");
        assert_eq!(cfg.edges[0].edge_type, EdgeType::Conditional);
        assert_eq!(cfg.nodes[0].next_nodes, vec!["technical", "billing"]);
    }
}
