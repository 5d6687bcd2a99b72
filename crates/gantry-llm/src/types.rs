use std::pin::Pin;

use futures::Stream;
use gantry_core::ToolCall;
use serde::{Deserialize, Serialize};

/// Token accounting normalized across providers.
///
/// Providers that only report two of the three fields have `total_tokens`
/// computed as the sum.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// A plain completion: content plus usage.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LlmResponse {
    pub content: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub finish_reason: String,
    #[serde(default)]
    pub usage: Usage,
}

/// A tool-capable completion: content, any requested tool calls, and usage.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatResponse {
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub finish_reason: String,
    #[serde(default)]
    pub usage: Usage,
}

impl ChatResponse {
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// One element of a streaming chat response. The consumer reads until a
/// chunk with `done == true`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StreamChunk {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    pub done: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

impl StreamChunk {
    pub fn content(text: impl Into<String>) -> Self {
        Self { content: Some(text.into()), ..Default::default() }
    }

    pub fn done(usage: Option<Usage>) -> Self {
        Self { done: true, usage, ..Default::default() }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self { done: true, error: Some(message.into()), ..Default::default() }
    }
}

/// A lazy sequence of stream chunks.
pub type ChatStream = Pin<Box<dyn Stream<Item = StreamChunk> + Send>>;

/// A single embedding result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingResponse {
    pub embedding: Vec<f64>,
    #[serde(default)]
    pub token_count: u32,
}

/// Connection settings shared by the HTTP provider clients.
#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    pub api_key: String,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl ClientConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self { api_key: api_key.into(), base_url: String::new(), timeout_secs: 60 }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}
