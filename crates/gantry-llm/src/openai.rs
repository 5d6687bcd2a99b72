//! OpenAI-compatible chat-completions client.
//!
//! Also serves any locally exposed model server that speaks the same
//! schema; the unified client points one of these at the local base URL.

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use gantry_core::{AgentError, ErrorKind, Message, ToolCall, ToolResult, ToolSchema};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::error;

use crate::types::{
    ChatResponse, ChatStream, ClientConfig, EmbeddingResponse, LlmResponse, StreamChunk, Usage,
};
use crate::{ChatClient, EmbeddingClient};

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Clone)]
pub struct OpenAiClient {
    api_key: String,
    base_url: String,
    client: Client,
}

impl OpenAiClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_config(ClientConfig::new(api_key))
    }

    pub fn with_config(cfg: ClientConfig) -> Self {
        let base_url = if cfg.base_url.is_empty() {
            OPENAI_BASE_URL.to_string()
        } else {
            cfg.base_url.trim_end_matches('/').to_string()
        };
        let timeout = if cfg.timeout_secs == 0 { 60 } else { cfg.timeout_secs };
        Self {
            api_key: cfg.api_key,
            base_url,
            client: Client::builder()
                .timeout(Duration::from_secs(timeout))
                .build()
                .unwrap_or_default(),
        }
    }

    fn build_messages(system: &str, msgs: &[Message], pending: &[ToolResult]) -> Vec<Value> {
        let mut messages = Vec::with_capacity(msgs.len() + pending.len() + 1);

        if !system.is_empty() {
            messages.push(json!({"role": "system", "content": system}));
        }

        for m in msgs {
            let mut msg = json!({"role": m.role.as_str(), "content": m.content});
            if let Some(id) = &m.tool_call_id {
                msg["tool_call_id"] = json!(id);
            }
            messages.push(msg);
        }

        for p in pending {
            messages.push(json!({
                "role": "tool",
                "content": p.content,
                "tool_call_id": p.tool_call_id,
            }));
        }

        messages
    }

    fn build_tools(tools: &[ToolSchema]) -> Vec<Value> {
        tools
            .iter()
            .map(|t| {
                json!({
                    "type": "function",
                    "function": {
                        "name": t.name,
                        "description": t.description,
                        "parameters": t.parameters,
                    },
                })
            })
            .collect()
    }

    fn parse_response(resp: OpenAiResponse) -> ChatResponse {
        let Some(choice) = resp.choices.into_iter().next() else {
            return ChatResponse::default();
        };

        let tool_calls = choice
            .message
            .tool_calls
            .into_iter()
            .map(|tc| ToolCall {
                id: tc.id,
                name: tc.function.name,
                arguments: serde_json::from_str(&tc.function.arguments).unwrap_or(Value::Null),
            })
            .collect();

        ChatResponse {
            content: choice.message.content.unwrap_or_default(),
            tool_calls,
            finish_reason: choice.finish_reason.unwrap_or_default(),
            usage: Usage {
                prompt_tokens: resp.usage.prompt_tokens,
                completion_tokens: resp.usage.completion_tokens,
                total_tokens: resp.usage.total_tokens,
            },
        }
    }

    async fn post_chat(&self, body: Value) -> Result<reqwest::Response, AgentError> {
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error("llm.openai", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AgentError::new(
                "llm.openai",
                ErrorKind::LlmRequest(format!("status {}: {}", status.as_u16(), body)),
            ));
        }

        Ok(response)
    }

    /// Streaming chat: server-sent-event lines terminated by `data: [DONE]`.
    pub async fn chat_stream_with_messages(
        &self,
        model: &str,
        system: &str,
        msgs: &[Message],
    ) -> Result<ChatStream, AgentError> {
        let body = json!({
            "model": model,
            "messages": Self::build_messages(system, msgs, &[]),
            "stream": true,
        });

        let response = self.post_chat(body).await?;
        let byte_stream = response.bytes_stream();

        // Carry incomplete SSE lines across network chunks in a scan buffer.
        let mapped = byte_stream
            .scan(String::new(), |buffer, result| {
                let chunks: Vec<StreamChunk> = match result {
                    Err(e) => vec![StreamChunk::failed(e.to_string())],
                    Ok(bytes) => {
                        let Ok(text) = String::from_utf8(bytes.to_vec()) else {
                            return futures::future::ready(Some(vec![]));
                        };
                        buffer.push_str(&text);

                        let mut parsed = Vec::new();
                        while let Some(newline_pos) = buffer.find('\n') {
                            let line = buffer[..newline_pos].trim().to_string();
                            *buffer = buffer[newline_pos + 1..].to_string();

                            let Some(data) = line.strip_prefix("data: ") else {
                                continue;
                            };
                            if data == "[DONE]" {
                                parsed.push(StreamChunk::done(None));
                                continue;
                            }

                            let chunk: OpenAiStreamChunk = match serde_json::from_str(data) {
                                Ok(c) => c,
                                Err(e) => {
                                    error!("failed to parse stream event: {} - {}", e, data);
                                    continue;
                                }
                            };

                            if let Some(choice) = chunk.choices.first() {
                                if let Some(content) = &choice.delta.content {
                                    if !content.is_empty() {
                                        parsed.push(StreamChunk::content(content.clone()));
                                    }
                                }
                            }
                        }
                        parsed
                    }
                };
                futures::future::ready(Some(chunks))
            })
            .flat_map(futures::stream::iter);

        Ok(Box::pin(mapped))
    }
}

#[async_trait]
impl ChatClient for OpenAiClient {
    async fn chat(
        &self,
        model: &str,
        system: &str,
        user: &str,
    ) -> Result<LlmResponse, AgentError> {
        let msgs = [Message::system(system), Message::user(user)];
        let resp = self.chat_with_tools(model, "", &msgs, &[], &[]).await?;
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
            "messages": Self::build_messages(system, msgs, pending),
        });
        if !tools.is_empty() {
            body["tools"] = Value::Array(Self::build_tools(tools));
        }

        let response = self.post_chat(body).await?;
        let result: OpenAiResponse = response
            .json()
            .await
            .map_err(|e| AgentError::new("llm.openai", ErrorKind::LlmRequest(e.to_string())))?;

        Ok(Self::parse_response(result))
    }
}

#[async_trait]
impl EmbeddingClient for OpenAiClient {
    async fn embed(&self, model: &str, input: &str) -> Result<EmbeddingResponse, AgentError> {
        let inputs = [input.to_string()];
        let results = self.embed_batch(model, &inputs).await?;
        results.into_iter().next().ok_or_else(|| {
            AgentError::new("llm.openai", ErrorKind::LlmRequest("no embedding returned".into()))
        })
    }

    async fn embed_batch(
        &self,
        model: &str,
        inputs: &[String],
    ) -> Result<Vec<EmbeddingResponse>, AgentError> {
        let body = json!({"model": model, "input": inputs});

        let response = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error("llm.openai.embed", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AgentError::new(
                "llm.openai.embed",
                ErrorKind::LlmRequest(format!("status {}: {}", status.as_u16(), body)),
            ));
        }

        let result: OpenAiEmbeddingResponse = response.json().await.map_err(|e| {
            AgentError::new("llm.openai.embed", ErrorKind::LlmRequest(e.to_string()))
        })?;

        let token_count = result.usage.map(|u| u.prompt_tokens).unwrap_or(0);
        Ok(result
            .data
            .into_iter()
            .map(|d| EmbeddingResponse { embedding: d.embedding, token_count })
            .collect())
    }
}

pub(crate) fn transport_error(op: &'static str, e: reqwest::Error) -> AgentError {
    if e.is_timeout() {
        AgentError::new(op, ErrorKind::Timeout)
    } else {
        AgentError::new(op, ErrorKind::ExecutionFailed(e.to_string()))
    }
}

#[derive(Deserialize)]
struct OpenAiResponse {
    #[serde(default)]
    choices: Vec<OpenAiChoice>,
    #[serde(default)]
    usage: OpenAiUsage,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct OpenAiMessage {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<OpenAiToolCall>,
}

#[derive(Deserialize)]
struct OpenAiToolCall {
    id: String,
    function: OpenAiFunction,
}

#[derive(Deserialize)]
struct OpenAiFunction {
    name: String,
    arguments: String,
}

#[derive(Deserialize, Default)]
struct OpenAiUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
    #[serde(default)]
    total_tokens: u32,
}

#[derive(Deserialize)]
struct OpenAiEmbeddingResponse {
    #[serde(default)]
    data: Vec<OpenAiEmbeddingData>,
    #[serde(default)]
    usage: Option<OpenAiUsage>,
}

#[derive(Deserialize)]
struct OpenAiEmbeddingData {
    embedding: Vec<f64>,
}

#[derive(Deserialize)]
struct OpenAiStreamChunk {
    #[serde(default)]
    choices: Vec<OpenAiStreamChoice>,
}

#[derive(Deserialize)]
struct OpenAiStreamChoice {
    #[serde(default)]
    delta: OpenAiDelta,
}

#[derive(Deserialize, Default)]
struct OpenAiDelta {
    content: Option<String>,
}
