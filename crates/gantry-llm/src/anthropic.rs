//! Claude-family messages API client.
//!
//! The system prompt travels as a top-level field, responses arrive as
//! typed content blocks, and tool results go back as user-role
//! `tool_result` blocks keyed by `tool_use_id`.

use std::time::Duration;

use async_trait::async_trait;
use gantry_core::{AgentError, ErrorKind, Message, MessageRole, ToolCall, ToolResult, ToolSchema};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::openai::transport_error;
use crate::types::{ChatResponse, ClientConfig, LlmResponse, Usage};
use crate::ChatClient;

const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 4096;

#[derive(Clone)]
pub struct AnthropicClient {
    api_key: String,
    base_url: String,
    version: &'static str,
    client: Client,
}

impl AnthropicClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_config(ClientConfig::new(api_key))
    }

    pub fn with_config(cfg: ClientConfig) -> Self {
        let base_url = if cfg.base_url.is_empty() {
            ANTHROPIC_BASE_URL.to_string()
        } else {
            cfg.base_url.trim_end_matches('/').to_string()
        };
        let timeout = if cfg.timeout_secs == 0 { 60 } else { cfg.timeout_secs };
        Self {
            api_key: cfg.api_key,
            base_url,
            version: ANTHROPIC_VERSION,
            client: Client::builder()
                .timeout(Duration::from_secs(timeout))
                .build()
                .unwrap_or_default(),
        }
    }

    fn build_messages(msgs: &[Message], pending: &[ToolResult]) -> Vec<Value> {
        let mut messages = Vec::with_capacity(msgs.len() + pending.len());

        // The system prompt is a top-level field, never a message.
        for m in msgs.iter().filter(|m| m.role != MessageRole::System) {
            messages.push(Self::convert_message(m));
        }

        for p in pending {
            messages.push(Self::tool_result_message(&p.tool_call_id, &p.content));
        }

        messages
    }

    fn convert_message(m: &Message) -> Value {
        if m.role == MessageRole::Tool {
            let id = m.tool_call_id.as_deref().unwrap_or_default();
            return Self::tool_result_message(id, &m.content);
        }
        json!({"role": m.role.as_str(), "content": m.content})
    }

    fn tool_result_message(tool_call_id: &str, content: &str) -> Value {
        json!({
            "role": "user",
            "content": [{
                "type": "tool_result",
                "tool_use_id": tool_call_id,
                "content": content,
            }],
        })
    }

    fn build_tools(tools: &[ToolSchema]) -> Vec<Value> {
        tools
            .iter()
            .map(|t| {
                json!({
                    "name": t.name,
                    "description": t.description,
                    "input_schema": t.parameters,
                })
            })
            .collect()
    }

    fn parse_response(resp: AnthropicResponse) -> ChatResponse {
        let mut result = ChatResponse {
            finish_reason: resp.stop_reason.unwrap_or_default(),
            usage: Usage {
                prompt_tokens: resp.usage.input_tokens,
                completion_tokens: resp.usage.output_tokens,
                total_tokens: resp.usage.input_tokens + resp.usage.output_tokens,
            },
            ..Default::default()
        };

        for block in resp.content {
            match block.block_type.as_str() {
                "text" => result.content.push_str(&block.text.unwrap_or_default()),
                "tool_use" => result.tool_calls.push(ToolCall {
                    id: block.id.unwrap_or_default(),
                    name: block.name.unwrap_or_default(),
                    arguments: block.input.unwrap_or(Value::Null),
                }),
                _ => {}
            }
        }

        result
    }
}

#[async_trait]
impl ChatClient for AnthropicClient {
    async fn chat(
        &self,
        model: &str,
        system: &str,
        user: &str,
    ) -> Result<LlmResponse, AgentError> {
        let msgs = [Message::user(user)];
        let resp = self.chat_with_tools(model, system, &msgs, &[], &[]).await?;
        Ok(LlmResponse {
            content: resp.content,
            finish_reason: resp.finish_reason,
            usage: resp.usage,
        })
    }

    async fn chat_with_messages(
        &self,
        model: &str,
        system: &str,
        msgs: &[Message],
    ) -> Result<ChatResponse, AgentError> {
        self.chat_with_tools(model, system, msgs, &[], &[]).await
    }

    async fn chat_with_tools(
        &self,
        model: &str,
        system: &str,
        msgs: &[Message],
        tools: &[ToolSchema],
        pending: &[ToolResult],
    ) -> Result<ChatResponse, AgentError> {
        let mut body = json!({
            "model": model,
            "max_tokens": MAX_TOKENS,
            "messages": Self::build_messages(msgs, pending),
        });
        if !system.is_empty() {
            body["system"] = json!(system);
        }
        if !tools.is_empty() {
            body["tools"] = Value::Array(Self::build_tools(tools));
        }

        let response = self
            .client
            .post(format!("{}/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", self.version)
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error("llm.anthropic", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AgentError::new(
                "llm.anthropic",
                ErrorKind::LlmRequest(format!("status {}: {}", status.as_u16(), body)),
            ));
        }

        let result: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| AgentError::new("llm.anthropic", ErrorKind::LlmRequest(e.to_string())))?;

        Ok(Self::parse_response(result))
    }
}

#[derive(Deserialize)]
struct AnthropicResponse {
    #[serde(default)]
    content: Vec<AnthropicBlock>,
    stop_reason: Option<String>,
    #[serde(default)]
    usage: AnthropicUsage,
}

#[derive(Deserialize)]
struct AnthropicBlock {
    #[serde(rename = "type")]
    block_type: String,
    text: Option<String>,
    id: Option<String>,
    name: Option<String>,
    input: Option<Value>,
}

#[derive(Deserialize, Default)]
struct AnthropicUsage {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
}
