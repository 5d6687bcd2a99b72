//! Named, schema-described capabilities the model may invoke, and the
//! registry that holds them.

mod fetch_url;
mod index_document;
mod registry;
mod similarity_search;
mod web_search;

pub use fetch_url::FetchUrl;
pub use index_document::IndexDocument;
pub use registry::{default_registry, get, register, Registry};
pub use similarity_search::SimilaritySearch;
pub use web_search::WebSearch;

use std::sync::Arc;

use async_trait::async_trait;
use gantry_core::{AgentError, ToolSchema};
use serde_json::Value;

/// An opaque capability: a name, a description, a JSON-schema parameter
/// document, and an invocation returning text or an error.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON-schema document describing the tool's parameters; embedded
    /// verbatim into provider tool descriptors.
    fn parameters(&self) -> Value;

    async fn execute(&self, args: Value) -> Result<String, AgentError>;
}

/// Builds the provider-facing descriptor for one tool.
pub fn to_schema(tool: &dyn Tool) -> ToolSchema {
    ToolSchema {
        name: tool.name().to_string(),
        description: tool.description().to_string(),
        parameters: tool.parameters(),
    }
}

/// Builds descriptors for a set of tools.
pub fn to_schemas(tools: &[Arc<dyn Tool>]) -> Vec<ToolSchema> {
    tools.iter().map(|t| to_schema(t.as_ref())).collect()
}
