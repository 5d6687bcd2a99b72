use std::collections::HashMap;

use gantry_config::NodeConfig;
use gantry_core::ModelConfig;

/// Picks the effective model config for a node: per-node override, then
/// the model attached to the node config, then the engine default.
pub struct ModelResolver {
    default_model: ModelConfig,
    overrides: HashMap<String, ModelConfig>,
}

impl ModelResolver {
    pub fn new(default_model: ModelConfig) -> Self {
        Self { default_model, overrides: HashMap::new() }
    }

    pub fn set_override(&mut self, node_id: impl Into<String>, model: ModelConfig) {
        self.overrides.insert(node_id.into(), model);
    }

    pub fn resolve<'a>(&'a self, node: &'a NodeConfig) -> &'a ModelConfig {
        if let Some(over) = self.overrides.get(&node.id) {
            return over;
        }

        if !node.model.name.is_empty() {
            return &node.model;
        }

        &self.default_model
    }

    pub fn resolve_model_name(&self, node: &NodeConfig) -> String {
        self.resolve(node).name.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gantry_config::NodeType;

    #[test]
    fn resolution_order() {
        let mut resolver = ModelResolver::new(ModelConfig::new("default-model"));

        let plain = NodeConfig::new("plain", NodeType::Llm);
        assert_eq!(resolver.resolve_model_name(&plain), "default-model");

        let mut attached = NodeConfig::new("attached", NodeType::Llm);
        attached.model = ModelConfig::new("node-model");
        assert_eq!(resolver.resolve_model_name(&attached), "node-model");

        resolver.set_override("attached", ModelConfig::new("override-model"));
        assert_eq!(resolver.resolve_model_name(&attached), "override-model");
    }

    #[test]
    fn resolve_returns_full_config() {
        let resolver =
            ModelResolver::new(ModelConfig::new("default-model").with_temperature(0.2));
        let node = NodeConfig::new("n", NodeType::Llm);
        let cfg = resolver.resolve(&node);
        assert_eq!(cfg.name, "default-model");
        assert_eq!(cfg.temperature, 0.2);
    }
}
