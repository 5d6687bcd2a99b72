//! Declarative agent framework for building LLM pipelines.
//!
//! A pipeline is a directed graph of typed nodes executed against a
//! user input by the [`Engine`]. Models are reached through the
//! [`UnifiedClient`], tools through a [`ToolRegistry`].
//!
//! # Example
//!
//! ```no_run
//! use gantry::prelude::*;
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = PipelineConfig::builder("research", "Research Pipeline")
//!     .node("researcher", NodeType::Worker)
//!         .prompt("You are a research assistant.")
//!         .tools(["web_search", "fetch_url"])
//!         .done()
//!     .node("summarizer", NodeType::Llm)
//!         .prompt("Summarize findings.")
//!         .model("gpt-4")
//!         .done()
//!     .edge("researcher", "summarizer")
//!     .build();
//!
//! let client = Arc::new(UnifiedClient::new(UnifiedConfig {
//!     openai_key: std::env::var("OPENAI_API_KEY")?,
//!     ..Default::default()
//! }));
//!
//! let engine = Engine::new(config, EngineConfig::new(client));
//! let result = engine.run(&CancellationToken::new(), "Research quantum computing").await;
//! println!("{}", result.content);
//! # Ok(())
//! # }
//! ```

pub use gantry_config::{
    ConfigError, EdgeConfig, EdgeEndpoint, EdgeType, NodeBuilder, NodeConfig, NodeType,
    PipelineBuilder, PipelineConfig,
};
pub use gantry_core::{
    AgentError, ErrorKind, Message, MessageRole, ModelConfig, ToolCall, ToolResult, ToolSchema,
};
pub use gantry_engine::{
    Engine, EngineConfig, EngineOutput, ExecutionContext, ModelResolver, NodeInput, NodeOutput,
    Span,
};
pub use gantry_llm::{
    ChatClient, ChatResponse, ChatStream, EmbeddingClient, LlmResponse, StreamChunk,
    UnifiedClient, UnifiedConfig, Usage,
};
pub use gantry_monitor::{InMemoryCollector, MetricsCollector, NodeMetrics, PipelineMetrics};
pub use gantry_store::{new_stores, PipelineStore, StoreError, TraceInfo, TraceStore};
pub use gantry_tools::{default_registry, Registry as ToolRegistry, Tool};
pub use gantry_vector::{
    cosine_similarity, Document, MemoryStore as MemoryVectorStore, SearchResult, VectorStore,
};

/// The commonly used surface in one import.
pub mod prelude {
    pub use crate::{
        AgentError, ChatClient, Engine, EngineConfig, EngineOutput, MessageRole, ModelConfig,
        NodeType, PipelineConfig, Tool, ToolRegistry, UnifiedClient, UnifiedConfig,
    };
}

/// Registers a tool with the process-wide default registry.
pub fn register_tool(tool: std::sync::Arc<dyn Tool>) {
    gantry_tools::register(tool);
}

/// Retrieves a tool from the process-wide default registry.
pub fn get_tool(name: &str) -> Option<std::sync::Arc<dyn Tool>> {
    gantry_tools::get(name)
}
