use std::collections::HashMap;
use std::time::Duration;

use gantry_core::AgentError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The input handed to one node: merged predecessor content plus the ids
/// it came from.
#[derive(Debug, Clone, Default)]
pub struct NodeInput {
    pub node_id: String,
    pub content: String,
    pub sources: Vec<String>,
    pub metadata: HashMap<String, Value>,
}

impl NodeInput {
    pub fn from_content(content: impl Into<String>) -> Self {
        Self { content: content.into(), ..Default::default() }
    }
}

/// What one node produced.
#[derive(Debug, Clone, Default)]
pub struct NodeOutput {
    pub node_id: String,
    pub content: String,
    /// Non-empty when the node directs the traversal itself (router,
    /// orchestrator, coordinator).
    pub next_nodes: Vec<String>,
    pub tokens_in: u32,
    pub tokens_out: u32,
    pub tool_calls: u32,
    pub iterations: u32,
    pub duration: Duration,
    pub metadata: HashMap<String, Value>,
}

/// A record of one node's execution within a run. Append-only; embedded
/// into the trace on persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Span {
    pub span_id: String,
    pub node_id: String,
    pub node_type: String,
    /// Milliseconds since epoch.
    pub start_time: i64,
    pub end_time: i64,
    pub input: String,
    pub output: String,
    pub tokens_in: u32,
    pub tokens_out: u32,
    pub tool_call_count: u32,
    pub iteration_count: u32,
}

/// The outcome of a pipeline run.
#[derive(Debug, Default)]
pub struct EngineOutput {
    pub success: bool,
    pub final_node: String,
    pub content: String,
    pub outputs: HashMap<String, NodeOutput>,
    pub spans: Vec<Span>,
    pub error: Option<AgentError>,
    pub duration: Duration,
}

/// Per-run state: the original input and every output in visit order.
#[derive(Debug, Default)]
pub struct ExecutionContext {
    pub input: NodeInput,
    pub history: Vec<NodeOutput>,
    pub variables: HashMap<String, Value>,
}

impl ExecutionContext {
    pub fn new(input: NodeInput) -> Self {
        Self { input, history: Vec::new(), variables: HashMap::new() }
    }

    pub fn add_output(&mut self, out: NodeOutput) {
        self.history.push(out);
    }

    /// Latest output recorded for a node, if any.
    pub fn get_output(&self, node_id: &str) -> Option<&NodeOutput> {
        self.history.iter().rev().find(|o| o.node_id == node_id)
    }
}

/// A node failure plus whatever accounting accumulated before the abort.
#[derive(Debug)]
pub struct NodeFailure {
    pub error: AgentError,
    pub tokens_in: u32,
    pub tokens_out: u32,
    pub tool_calls: u32,
    pub iterations: u32,
}

impl From<AgentError> for NodeFailure {
    fn from(error: AgentError) -> Self {
        Self { error, tokens_in: 0, tokens_out: 0, tool_calls: 0, iterations: 0 }
    }
}
