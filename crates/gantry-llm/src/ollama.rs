//! Ollama-native endpoints: model discovery and the embedding API.
//!
//! Chat against an Ollama server goes through [`crate::OpenAiClient`]
//! pointed at its OpenAI-compatible `/v1` surface; only `/api/tags` and
//! `/api/embed` need a native client.

use std::time::Duration;

use async_trait::async_trait;
use gantry_core::{AgentError, ErrorKind};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::openai::transport_error;
use crate::types::EmbeddingResponse;
use crate::EmbeddingClient;

/// A model advertised by a local Ollama server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveredModel {
    pub id: String,
    pub name: String,
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
}

/// Queries an Ollama instance for its available models.
pub async fn discover_models(ollama_host: &str) -> Result<Vec<DiscoveredModel>, AgentError> {
    let host = trim_host(ollama_host);

    let client = Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap_or_default();

    let response = client
        .get(format!("{host}/api/tags"))
        .send()
        .await
        .map_err(|e| transport_error("llm.ollama.discover", e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(AgentError::new(
            "llm.ollama.discover",
            ErrorKind::LlmRequest(format!("status {}", status.as_u16())),
        ));
    }

    let tags: OllamaTagsResponse = response.json().await.map_err(|e| {
        AgentError::new("llm.ollama.discover", ErrorKind::LlmRequest(e.to_string()))
    })?;

    let api_base = format!("{host}/v1");
    Ok(tags
        .models
        .into_iter()
        .map(|m| DiscoveredModel {
            id: format!("ollama-{}", slugify(&m.name)),
            name: format_display_name(&m.name),
            model: m.name,
            api_base: Some(api_base.clone()),
        })
        .collect())
}

fn trim_host(host: &str) -> &str {
    let host = host.trim_end_matches('/');
    host.strip_suffix("/v1").unwrap_or(host)
}

fn slugify(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut last_dash = false;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash && !out.is_empty() {
            out.push('-');
            last_dash = true;
        }
    }
    out.trim_end_matches('-').to_string()
}

fn format_display_name(name: &str) -> String {
    // "llama3.2:latest" -> "Llama3.2 (Ollama)"
    let base = name.split(':').next().unwrap_or(name);
    let mut chars = base.chars();
    let capitalized = match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    };
    format!("{capitalized} (Ollama)")
}

/// Client for Ollama's native embedding API.
#[derive(Clone)]
pub struct OllamaEmbedClient {
    base_url: String,
    client: Client,
}

impl OllamaEmbedClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: trim_host(base_url).to_string(),
            client: Client::builder()
                .timeout(Duration::from_secs(60))
                .build()
                .unwrap_or_default(),
        }
    }
}

#[async_trait]
impl EmbeddingClient for OllamaEmbedClient {
    async fn embed(&self, model: &str, input: &str) -> Result<EmbeddingResponse, AgentError> {
        let inputs = [input.to_string()];
        let results = self.embed_batch(model, &inputs).await?;
        results.into_iter().next().ok_or_else(|| {
            AgentError::new("llm.ollama.embed", ErrorKind::LlmRequest("no embedding returned".into()))
        })
    }

    async fn embed_batch(
        &self,
        model: &str,
        inputs: &[String],
    ) -> Result<Vec<EmbeddingResponse>, AgentError> {
        let mut results = Vec::with_capacity(inputs.len());

        // The /api/embed endpoint processes one input at a time.
        for input in inputs {
            let response = self
                .client
                .post(format!("{}/api/embed", self.base_url))
                .json(&json!({"model": model, "input": input}))
                .send()
                .await
                .map_err(|e| transport_error("llm.ollama.embed", e))?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(AgentError::new(
                    "llm.ollama.embed",
                    ErrorKind::LlmRequest(format!("status {}: {}", status.as_u16(), body)),
                ));
            }

            let result: OllamaEmbedResponse = response.json().await.map_err(|e| {
                AgentError::new("llm.ollama.embed", ErrorKind::LlmRequest(e.to_string()))
            })?;

            let Some(embedding) = result.embeddings.into_iter().next() else {
                return Err(AgentError::new(
                    "llm.ollama.embed",
                    ErrorKind::LlmRequest("no embeddings in response".into()),
                ));
            };

            // Ollama does not report token counts.
            results.push(EmbeddingResponse { embedding, token_count: 0 });
        }

        Ok(results)
    }
}

#[derive(Deserialize)]
struct OllamaTagsResponse {
    #[serde(default)]
    models: Vec<OllamaModelInfo>,
}

#[derive(Deserialize)]
struct OllamaModelInfo {
    name: String,
}

#[derive(Deserialize)]
struct OllamaEmbedResponse {
    #[serde(default)]
    embeddings: Vec<Vec<f64>>,
}
