//! LLM provider clients behind one chat contract.
//!
//! Three provider families are supported, differing only in wire encoding:
//! the OpenAI-compatible chat-completions schema (also spoken by local model
//! servers), the Claude messages API, and the Ollama-native embedding API.
//! [`UnifiedClient`] routes a model name to the right client by prefix and
//! synthesizes streaming for providers without it.

mod anthropic;
mod ollama;
mod openai;
mod types;
mod unified;

pub use anthropic::AnthropicClient;
pub use ollama::{discover_models, DiscoveredModel, OllamaEmbedClient};
pub use openai::OpenAiClient;
pub use types::{
    ChatResponse, ChatStream, ClientConfig, EmbeddingResponse, LlmResponse, StreamChunk, Usage,
};
pub use unified::{UnifiedClient, UnifiedConfig};

use async_trait::async_trait;
use gantry_core::{AgentError, Message, ToolResult, ToolSchema};

/// The chat contract every provider client implements.
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// One-shot completion from a system prompt and a user message.
    async fn chat(&self, model: &str, system: &str, user: &str)
        -> Result<LlmResponse, AgentError>;

    /// Completion over an explicit message history.
    async fn chat_with_messages(
        &self,
        model: &str,
        system: &str,
        msgs: &[Message],
    ) -> Result<ChatResponse, AgentError>;

    /// Tool-capable completion. `pending` carries tool results not yet
    /// folded into `msgs`; each provider encodes them in its own shape.
    async fn chat_with_tools(
        &self,
        model: &str,
        system: &str,
        msgs: &[Message],
        tools: &[ToolSchema],
        pending: &[ToolResult],
    ) -> Result<ChatResponse, AgentError>;
}

/// Text-to-vector embedding contract.
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    async fn embed(&self, model: &str, input: &str) -> Result<EmbeddingResponse, AgentError>;

    async fn embed_batch(
        &self,
        model: &str,
        inputs: &[String],
    ) -> Result<Vec<EmbeddingResponse>, AgentError>;
}
