use std::fmt::Write as _;
use std::sync::Arc;

use async_trait::async_trait;
use gantry_core::{AgentError, ErrorKind};
use gantry_llm::EmbeddingClient;
use gantry_vector::VectorStore;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::Tool;

/// Searches the vector store for documents semantically similar to a query.
pub struct SimilaritySearch {
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn EmbeddingClient>,
    model: String,
}

#[derive(Deserialize)]
struct SimilaritySearchArgs {
    query: String,
    #[serde(default)]
    top_k: usize,
}

impl SimilaritySearch {
    pub fn new(
        store: Arc<dyn VectorStore>,
        embedder: Arc<dyn EmbeddingClient>,
        model: impl Into<String>,
    ) -> Self {
        Self { store, embedder, model: model.into() }
    }
}

#[async_trait]
impl Tool for SimilaritySearch {
    fn name(&self) -> &str {
        "similarity_search"
    }

    fn description(&self) -> &str {
        "Search for documents similar to a query using semantic similarity. Returns the most relevant documents."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The search query to find similar documents"
                },
                "top_k": {
                    "type": "integer",
                    "description": "Maximum number of results to return (default: 5)"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, args: Value) -> Result<String, AgentError> {
        let params: SimilaritySearchArgs = serde_json::from_value(args).map_err(|e| {
            AgentError::new("tool.similarity_search", ErrorKind::InvalidConfig(format!("parse args: {e}")))
        })?;

        let top_k = if params.top_k == 0 { 5 } else { params.top_k };

        let resp = self.embedder.embed(&self.model, &params.query).await?;
        let results = self.store.search(&resp.embedding, top_k).await?;

        if results.is_empty() {
            return Ok("No similar documents found.".into());
        }

        let mut out = format!("Found {} relevant documents:\n\n", results.len());
        for (i, r) in results.iter().enumerate() {
            let _ = write!(out, "--- Document {} (score: {:.3}) ---\n{}\n\n", i + 1, r.score, r.document.content);
        }
        Ok(out)
    }
}
