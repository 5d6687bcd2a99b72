//! Unified client: one entry point, prefix-dispatched to provider clients.

use async_trait::async_trait;
use futures::StreamExt;
use gantry_core::{AgentError, ErrorKind, Message, ToolResult, ToolSchema};

use crate::anthropic::AnthropicClient;
use crate::ollama::OllamaEmbedClient;
use crate::openai::OpenAiClient;
use crate::types::{
    ChatResponse, ChatStream, ClientConfig, EmbeddingResponse, LlmResponse, StreamChunk,
};
use crate::{ChatClient, EmbeddingClient};

/// Provider credentials and endpoints. Empty fields leave the
/// corresponding client unconfigured.
#[derive(Debug, Clone, Default)]
pub struct UnifiedConfig {
    pub openai_key: String,
    pub anthropic_key: String,
    pub ollama_url: String,
}

/// Routes chat and embedding requests to the right provider client based
/// on the model name.
pub struct UnifiedClient {
    openai: Option<OpenAiClient>,
    anthropic: Option<AnthropicClient>,
    ollama: Option<OpenAiClient>,
    ollama_embed: Option<OllamaEmbedClient>,
}

enum ProviderRef<'a> {
    OpenAi(&'a OpenAiClient),
    Anthropic(&'a AnthropicClient),
}

impl UnifiedClient {
    pub fn new(cfg: UnifiedConfig) -> Self {
        let openai =
            (!cfg.openai_key.is_empty()).then(|| OpenAiClient::new(cfg.openai_key.clone()));

        let anthropic =
            (!cfg.anthropic_key.is_empty()).then(|| AnthropicClient::new(cfg.anthropic_key.clone()));

        let (ollama, ollama_embed) = if cfg.ollama_url.is_empty() {
            (None, None)
        } else {
            (
                Some(OpenAiClient::with_config(
                    ClientConfig::default().with_base_url(cfg.ollama_url.clone()),
                )),
                Some(OllamaEmbedClient::new(&cfg.ollama_url)),
            )
        };

        Self { openai, anthropic, ollama, ollama_embed }
    }

    /// Assembles a unified client from already-configured provider
    /// clients, e.g. ones pointed at non-default endpoints.
    pub fn from_parts(
        openai: Option<OpenAiClient>,
        anthropic: Option<AnthropicClient>,
        ollama: Option<OpenAiClient>,
        ollama_embed: Option<OllamaEmbedClient>,
    ) -> Self {
        Self { openai, anthropic, ollama, ollama_embed }
    }

    pub fn has_openai(&self) -> bool {
        self.openai.is_some()
    }

    pub fn has_anthropic(&self) -> bool {
        self.anthropic.is_some()
    }

    pub fn has_ollama(&self) -> bool {
        self.ollama.is_some()
    }

    /// Prefix dispatch: `claude-` to the Claude client, `gpt-`/`o1-` to
    /// OpenAI, `ollama/` (stripped) to the local server. Anything else,
    /// or a matching prefix whose client is unconfigured, falls through
    /// to the first available client in order OpenAI, Claude, local.
    fn resolve_client(&self, model: &str) -> Result<(ProviderRef<'_>, String), AgentError> {
        if model.starts_with("claude-") {
            if let Some(c) = &self.anthropic {
                return Ok((ProviderRef::Anthropic(c), model.to_string()));
            }
        } else if model.starts_with("gpt-") || model.starts_with("o1-") {
            if let Some(c) = &self.openai {
                return Ok((ProviderRef::OpenAi(c), model.to_string()));
            }
        } else if let Some(stripped) = model.strip_prefix("ollama/") {
            if let Some(c) = &self.ollama {
                return Ok((ProviderRef::OpenAi(c), stripped.to_string()));
            }
        }

        self.default_client()
            .map(|c| (c, model.to_string()))
            .ok_or_else(|| {
                AgentError::new(
                    "llm.unified",
                    ErrorKind::InvalidConfig(format!("no provider client for model: {model}")),
                )
            })
    }

    fn default_client(&self) -> Option<ProviderRef<'_>> {
        if let Some(c) = &self.openai {
            return Some(ProviderRef::OpenAi(c));
        }
        if let Some(c) = &self.anthropic {
            return Some(ProviderRef::Anthropic(c));
        }
        self.ollama.as_ref().map(ProviderRef::OpenAi)
    }

    /// Streaming chat. Providers without native streaming get a
    /// synthesized one-shot stream: the non-streaming completion is
    /// emitted as a single content chunk followed by a final `done`
    /// chunk carrying usage.
    pub async fn chat_stream_with_messages(
        &self,
        model: &str,
        system: &str,
        msgs: &[Message],
    ) -> Result<ChatStream, AgentError> {
        let (provider, resolved) = self.resolve_client(model)?;

        match provider {
            ProviderRef::OpenAi(c) => c.chat_stream_with_messages(&resolved, system, msgs).await,
            ProviderRef::Anthropic(c) => {
                let client = c.clone();
                let system = system.to_string();
                let msgs = msgs.to_vec();

                let stream = futures::stream::once(async move {
                    client.chat_with_messages(&resolved, &system, &msgs).await
                })
                .flat_map(|res| {
                    let chunks = match res {
                        Ok(resp) => vec![
                            StreamChunk::content(resp.content),
                            StreamChunk::done(Some(resp.usage)),
                        ],
                        Err(e) => vec![StreamChunk::failed(e.to_string())],
                    };
                    futures::stream::iter(chunks)
                });

                Ok(Box::pin(stream))
            }
        }
    }

    fn resolve_embedding_client(&self, model: &str) -> Option<(EmbedRef<'_>, String)> {
        if let Some(stripped) = model.strip_prefix("ollama/") {
            return self.ollama_embed.as_ref().map(|c| (EmbedRef::Ollama(c), stripped.to_string()));
        }

        if model.starts_with("text-embedding-") {
            return self.openai.as_ref().map(|c| (EmbedRef::OpenAi(c), model.to_string()));
        }

        if let Some(c) = &self.openai {
            return Some((EmbedRef::OpenAi(c), model.to_string()));
        }

        self.ollama_embed.as_ref().map(|c| (EmbedRef::Ollama(c), model.to_string()))
    }
}

enum EmbedRef<'a> {
    OpenAi(&'a OpenAiClient),
    Ollama(&'a OllamaEmbedClient),
}

#[async_trait]
impl ChatClient for UnifiedClient {
    async fn chat(
        &self,
        model: &str,
        system: &str,
        user: &str,
    ) -> Result<LlmResponse, AgentError> {
        let (provider, resolved) = self.resolve_client(model)?;
        match provider {
            ProviderRef::OpenAi(c) => c.chat(&resolved, system, user).await,
            ProviderRef::Anthropic(c) => c.chat(&resolved, system, user).await,
        }
    }

    async fn chat_with_messages(
        &self,
        model: &str,
        system: &str,
        msgs: &[Message],
    ) -> Result<ChatResponse, AgentError> {
        let (provider, resolved) = self.resolve_client(model)?;
        match provider {
            ProviderRef::OpenAi(c) => c.chat_with_messages(&resolved, system, msgs).await,
            ProviderRef::Anthropic(c) => c.chat_with_messages(&resolved, system, msgs).await,
        }
    }

    async fn chat_with_tools(
        &self,
        model: &str,
        system: &str,
        msgs: &[Message],
        tools: &[ToolSchema],
        pending: &[ToolResult],
    ) -> Result<ChatResponse, AgentError> {
        let (provider, resolved) = self.resolve_client(model)?;
        match provider {
            ProviderRef::OpenAi(c) => {
                c.chat_with_tools(&resolved, system, msgs, tools, pending).await
            }
            ProviderRef::Anthropic(c) => {
                c.chat_with_tools(&resolved, system, msgs, tools, pending).await
            }
        }
    }
}

#[async_trait]
impl EmbeddingClient for UnifiedClient {
    async fn embed(&self, model: &str, input: &str) -> Result<EmbeddingResponse, AgentError> {
        let Some((client, resolved)) = self.resolve_embedding_client(model) else {
            return Err(no_embedding_client(model));
        };
        match client {
            EmbedRef::OpenAi(c) => c.embed(&resolved, input).await,
            EmbedRef::Ollama(c) => c.embed(&resolved, input).await,
        }
    }

    async fn embed_batch(
        &self,
        model: &str,
        inputs: &[String],
    ) -> Result<Vec<EmbeddingResponse>, AgentError> {
        let Some((client, resolved)) = self.resolve_embedding_client(model) else {
            return Err(no_embedding_client(model));
        };
        match client {
            EmbedRef::OpenAi(c) => c.embed_batch(&resolved, inputs).await,
            EmbedRef::Ollama(c) => c.embed_batch(&resolved, inputs).await,
        }
    }
}

fn no_embedding_client(model: &str) -> AgentError {
    AgentError::new(
        "llm.unified.embed",
        ErrorKind::InvalidConfig(format!("no embedding client for model: {model}")),
    )
}
