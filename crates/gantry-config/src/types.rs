use serde::{Deserialize, Serialize};

/// The nine compute-unit kinds a pipeline node can be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    Llm,
    Worker,
    Router,
    Gate,
    Aggregator,
    Orchestrator,
    Evaluator,
    Synthesizer,
    Coordinator,
}

impl NodeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::Llm => "llm",
            NodeType::Worker => "worker",
            NodeType::Router => "router",
            NodeType::Gate => "gate",
            NodeType::Aggregator => "aggregator",
            NodeType::Orchestrator => "orchestrator",
            NodeType::Evaluator => "evaluator",
            NodeType::Synthesizer => "synthesizer",
            NodeType::Coordinator => "coordinator",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "llm" => Some(NodeType::Llm),
            "worker" => Some(NodeType::Worker),
            "router" => Some(NodeType::Router),
            "gate" => Some(NodeType::Gate),
            "aggregator" => Some(NodeType::Aggregator),
            "orchestrator" => Some(NodeType::Orchestrator),
            "evaluator" => Some(NodeType::Evaluator),
            "synthesizer" => Some(NodeType::Synthesizer),
            "coordinator" => Some(NodeType::Coordinator),
            _ => None,
        }
    }

    /// Whether executing this node type involves a model call.
    pub fn requires_llm(&self) -> bool {
        matches!(
            self,
            NodeType::Llm
                | NodeType::Worker
                | NodeType::Router
                | NodeType::Orchestrator
                | NodeType::Evaluator
                | NodeType::Synthesizer
        )
    }
}

/// How an edge is traversed.
///
/// Conditional and Loop edges are recognized in configuration but the
/// engine traverses them as Default edges; the visited set keeps the
/// traversal forward-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeType {
    #[default]
    Default,
    Conditional,
    Loop,
}

impl EdgeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeType::Default => "default",
            EdgeType::Conditional => "conditional",
            EdgeType::Loop => "loop",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_type_round_trip() {
        for s in [
            "llm",
            "worker",
            "router",
            "gate",
            "aggregator",
            "orchestrator",
            "evaluator",
            "synthesizer",
            "coordinator",
        ] {
            let nt = NodeType::parse(s).expect(s);
            assert_eq!(nt.as_str(), s);
        }
        assert!(NodeType::parse("bogus").is_none());
    }

    #[test]
    fn llm_requirement() {
        assert!(NodeType::Worker.requires_llm());
        assert!(!NodeType::Gate.requires_llm());
        assert!(!NodeType::Coordinator.requires_llm());
    }
}
