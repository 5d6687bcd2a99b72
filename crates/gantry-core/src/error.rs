use std::fmt;

use thiserror::Error;

/// The failure categories recognized across the framework.
#[derive(Debug, Error)]
pub enum ErrorKind {
    /// Entry-node resolution yielded nothing, or a referenced node id is missing.
    #[error("node not found")]
    NodeNotFound,

    /// A declared tool is absent from the registry.
    #[error("tool not found: {0}")]
    ToolNotFound(String),

    /// Malformed pipeline, unknown node type, or schema mismatch.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Provider or tool transport failure.
    #[error("execution failed: {0}")]
    ExecutionFailed(String),

    /// Worker loop exhausted its iteration bound.
    #[error("max iterations exceeded")]
    MaxIterations,

    /// Reserved for graph validators.
    #[error("cyclic dependency detected")]
    CyclicDependency,

    /// Edge endpoints do not resolve to declared nodes.
    #[error("invalid edge configuration: {0}")]
    InvalidEdge(String),

    /// A deadline fired in a chat, tool, or store call.
    #[error("operation timed out")]
    Timeout,

    /// The run's cancellation signal was triggered.
    #[error("operation cancelled")]
    Cancelled,

    /// The provider returned a non-2xx status or an undecodable body.
    #[error("LLM request failed: {0}")]
    LlmRequest(String),
}

/// An error tagged with the operation that produced it and, where relevant,
/// the node it occurred in.
#[derive(Debug)]
pub struct AgentError {
    pub op: &'static str,
    pub node: Option<String>,
    pub kind: ErrorKind,
}

impl AgentError {
    pub fn new(op: &'static str, kind: ErrorKind) -> Self {
        Self { op, node: None, kind }
    }

    pub fn for_node(op: &'static str, node: impl Into<String>, kind: ErrorKind) -> Self {
        Self { op, node: Some(node.into()), kind }
    }

    /// Returns the node id this error is tagged with, if any.
    pub fn node_id(&self) -> Option<&str> {
        self.node.as_deref()
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.kind, ErrorKind::Cancelled)
    }
}

impl fmt::Display for AgentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.node {
            Some(node) => write!(f, "{} [node={}]: {}", self.op, node, self.kind),
            None => write!(f, "{}: {}", self.op, self.kind),
        }
    }
}

impl std::error::Error for AgentError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.kind)
    }
}

impl From<serde_json::Error> for AgentError {
    fn from(err: serde_json::Error) -> Self {
        AgentError::new("json", ErrorKind::ExecutionFailed(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_node_tag() {
        let err = AgentError::for_node("executor.worker", "researcher", ErrorKind::MaxIterations);
        assert_eq!(
            err.to_string(),
            "executor.worker [node=researcher]: max iterations exceeded"
        );
    }

    #[test]
    fn display_without_node() {
        let err = AgentError::new("engine.run", ErrorKind::NodeNotFound);
        assert_eq!(err.to_string(), "engine.run: node not found");
    }
}
