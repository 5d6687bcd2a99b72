use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use gantry_core::{AgentError, ErrorKind};
use gantry_llm::EmbeddingClient;
use gantry_vector::{Document, VectorStore};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::Tool;

/// Adds a document to the vector store for future similarity searches.
pub struct IndexDocument {
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn EmbeddingClient>,
    model: String,
}

#[derive(Deserialize)]
struct IndexDocumentArgs {
    id: String,
    content: String,
    #[serde(default)]
    metadata: HashMap<String, Value>,
}

impl IndexDocument {
    pub fn new(
        store: Arc<dyn VectorStore>,
        embedder: Arc<dyn EmbeddingClient>,
        model: impl Into<String>,
    ) -> Self {
        Self { store, embedder, model: model.into() }
    }
}

#[async_trait]
impl Tool for IndexDocument {
    fn name(&self) -> &str {
        "index_document"
    }

    fn description(&self) -> &str {
        "Add a document to the knowledge base for future similarity searches."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "id": {
                    "type": "string",
                    "description": "Unique identifier for the document"
                },
                "content": {
                    "type": "string",
                    "description": "The document content to index"
                },
                "metadata": {
                    "type": "object",
                    "description": "Optional metadata to store with the document"
                }
            },
            "required": ["id", "content"]
        })
    }

    async fn execute(&self, args: Value) -> Result<String, AgentError> {
        let params: IndexDocumentArgs = serde_json::from_value(args).map_err(|e| {
            AgentError::new("tool.index_document", ErrorKind::InvalidConfig(format!("parse args: {e}")))
        })?;

        let resp = self.embedder.embed(&self.model, &params.content).await?;

        let doc = Document {
            id: params.id.clone(),
            content: params.content,
            embedding: resp.embedding,
            metadata: params.metadata,
        };
        self.store.upsert(vec![doc]).await?;

        Ok(format!("Document '{}' indexed successfully.", params.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gantry_llm::EmbeddingResponse;
    use gantry_vector::MemoryStore;

    struct UnitEmbedder;

    #[async_trait]
    impl EmbeddingClient for UnitEmbedder {
        async fn embed(&self, _model: &str, _input: &str) -> Result<EmbeddingResponse, AgentError> {
            Ok(EmbeddingResponse { embedding: vec![1.0, 0.0], token_count: 0 })
        }

        async fn embed_batch(
            &self,
            _model: &str,
            inputs: &[String],
        ) -> Result<Vec<EmbeddingResponse>, AgentError> {
            Ok(inputs
                .iter()
                .map(|_| EmbeddingResponse { embedding: vec![1.0, 0.0], token_count: 0 })
                .collect())
        }
    }

    #[tokio::test]
    async fn indexes_and_reports() {
        let store = Arc::new(MemoryStore::new());
        let tool = IndexDocument::new(store.clone(), Arc::new(UnitEmbedder), "embed-model");

        let out = tool
            .execute(json!({"id": "doc-1", "content": "hello"}))
            .await
            .unwrap();
        assert_eq!(out, "Document 'doc-1' indexed successfully.");
        assert_eq!(store.count(), 1);
    }
}
