//! Server state assembly: clients, stores, registry, and catalogs.

use std::sync::Arc;

use gantry_llm::{discover_models, UnifiedClient};
use gantry_store::{new_stores, EdgeInfo, NodeInfo, PipelineInfo, PipelineStore, TraceStore};
use gantry_tools::{IndexDocument, Registry, SimilaritySearch};
use gantry_vector::{MemoryStore, VectorStore};
use tracing::{info, warn};

use crate::dto::ModelInfo;

const DEFAULT_EMBED_MODEL: &str = "text-embedding-3-small";

/// Configuration for a new [`ServerState`].
pub struct ServerConfig {
    pub client: Arc<UnifiedClient>,
    /// Falls back to the process-wide default registry.
    pub registry: Option<Arc<Registry>>,
    pub models: Vec<ModelInfo>,
    pub templates: Vec<PipelineInfo>,
    /// Optional base URL for local model discovery.
    pub ollama_url: String,
    /// Connection string handed to the store factory.
    pub database_dsn: String,
    /// Injected vector store; defaults to the in-memory one.
    pub vector_store: Option<Arc<dyn VectorStore>>,
    pub embed_model: String,
}

impl ServerConfig {
    pub fn new(client: Arc<UnifiedClient>) -> Self {
        Self {
            client,
            registry: None,
            models: Vec::new(),
            templates: Vec::new(),
            ollama_url: String::new(),
            database_dsn: String::new(),
            vector_store: None,
            embed_model: String::new(),
        }
    }
}

pub struct ServerState {
    pub client: Arc<UnifiedClient>,
    pub registry: Arc<Registry>,
    pub models: Vec<ModelInfo>,
    pub templates: Vec<PipelineInfo>,
    pub trace_store: Arc<dyn TraceStore>,
    pub pipeline_store: Arc<dyn PipelineStore>,
    pub vector_store: Arc<dyn VectorStore>,
}

impl ServerState {
    pub async fn new(cfg: ServerConfig) -> anyhow::Result<Self> {
        let registry = cfg.registry.unwrap_or_else(gantry_tools::default_registry);

        let mut models = cfg.models;
        if models.is_empty() {
            models = default_models();
        }

        if !cfg.ollama_url.is_empty() {
            match discover_models(&cfg.ollama_url).await {
                Ok(discovered) => {
                    info!("found {} local models", discovered.len());
                    for m in discovered {
                        info!("  - {} ({})", m.name, m.id);
                        models.push(ModelInfo {
                            id: m.id,
                            name: m.name,
                            model: m.model,
                            api_base: m.api_base,
                        });
                    }
                }
                Err(e) => warn!("model discovery failed (is the server running?): {}", e),
            }
        }

        let mut templates = cfg.templates;
        if templates.is_empty() {
            templates = default_templates();
        }

        let (trace_store, pipeline_store) = new_stores(&cfg.database_dsn).await?;
        info!("initialized database storage");

        let vector_store: Arc<dyn VectorStore> = match cfg.vector_store {
            Some(vs) => vs,
            None => {
                info!("using in-memory vector store");
                Arc::new(MemoryStore::new())
            }
        };

        // Semantic-search tools need an embedding backend behind the client.
        if cfg.client.has_openai() || cfg.client.has_ollama() {
            let embed_model = if cfg.embed_model.is_empty() {
                DEFAULT_EMBED_MODEL.to_string()
            } else {
                cfg.embed_model
            };
            registry.register(Arc::new(SimilaritySearch::new(
                Arc::clone(&vector_store),
                cfg.client.clone(),
                embed_model.clone(),
            )));
            registry.register(Arc::new(IndexDocument::new(
                Arc::clone(&vector_store),
                cfg.client.clone(),
                embed_model.clone(),
            )));
            info!("registered similarity_search and index_document tools (model: {embed_model})");
        }

        Ok(Self {
            client: cfg.client,
            registry,
            models,
            templates,
            trace_store,
            pipeline_store,
            vector_store,
        })
    }

    /// The model name behind a catalog id; falls back to the first
    /// catalog entry, then to the id itself.
    pub fn model_name(&self, model_id: &str) -> String {
        if model_id.is_empty() {
            return self.models.first().map(|m| m.model.clone()).unwrap_or_default();
        }
        self.models
            .iter()
            .find(|m| m.id == model_id)
            .map(|m| m.model.clone())
            .unwrap_or_else(|| model_id.to_string())
    }

    pub async fn close(&self) {
        if let Err(e) = self.trace_store.close().await {
            warn!("closing trace store: {}", e);
        }
        if let Err(e) = self.pipeline_store.close().await {
            warn!("closing pipeline store: {}", e);
        }
        if let Err(e) = self.vector_store.close().await {
            warn!("closing vector store: {}", e);
        }
    }
}

fn default_models() -> Vec<ModelInfo> {
    let m = |id: &str, name: &str, model: &str| ModelInfo {
        id: id.into(),
        name: name.into(),
        model: model.into(),
        api_base: None,
    };
    vec![
        m("openai-gpt5", "GPT-5.2 (OpenAI)", "gpt-5.2-2025-12-11"),
        m("openai-codex", "GPT-5.2 Codex (OpenAI)", "gpt-5.2-codex"),
        m("anthropic-opus", "Claude Opus 4.5 (Anthropic)", "claude-opus-4-5-20251101"),
        m("anthropic-sonnet", "Claude Sonnet 4.5 (Anthropic)", "claude-sonnet-4-5-20250929"),
        m("anthropic-haiku", "Claude Haiku 4.5 (Anthropic)", "claude-haiku-4-5-20251001"),
    ]
}

fn default_templates() -> Vec<PipelineInfo> {
    let node = |id: &str, node_type: &str, prompt: &str, tools: &[&str]| NodeInfo {
        id: id.into(),
        node_type: node_type.into(),
        model: None,
        prompt: Some(prompt.into()),
        tools: tools.iter().map(|s| s.to_string()).collect(),
        x: None,
        y: None,
    };

    vec![
        PipelineInfo {
            id: "simple-chat".into(),
            name: "Simple Chat".into(),
            description: "Single LLM node for basic chat".into(),
            nodes: vec![node("assistant", "llm", "You are a helpful assistant.", &[])],
            edges: Vec::<EdgeInfo>::new(),
            layout: Default::default(),
        },
        PipelineInfo {
            id: "research-agent".into(),
            name: "Research Agent".into(),
            description: "Worker node with web search tools".into(),
            nodes: vec![node(
                "researcher",
                "worker",
                "You are a research assistant. Search the web for information.",
                &["web_search", "fetch_url"],
            )],
            edges: Vec::new(),
            layout: Default::default(),
        },
        PipelineInfo {
            id: "router-pipeline".into(),
            name: "Router Pipeline".into(),
            description: "Route requests to specialized agents".into(),
            nodes: vec![
                node(
                    "router",
                    "router",
                    "Classify the user's request and route to the appropriate specialist.",
                    &[],
                ),
                node("coder", "llm", "You are a coding expert.", &[]),
                node("writer", "llm", "You are a writing expert.", &[]),
            ],
            edges: Vec::new(),
            layout: Default::default(),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_catalog_is_non_empty() {
        assert!(!default_models().is_empty());
        assert_eq!(default_templates().len(), 3);
    }
}
