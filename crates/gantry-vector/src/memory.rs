use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use gantry_core::AgentError;

use crate::{cosine_similarity, Document, SearchResult, VectorStore};

/// In-memory vector store with brute-force cosine search, for development
/// and testing.
#[derive(Default)]
pub struct MemoryStore {
    docs: RwLock<HashMap<String, Document>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.docs.read().map(|d| d.len()).unwrap_or(0)
    }
}

#[async_trait]
impl VectorStore for MemoryStore {
    async fn upsert(&self, docs: Vec<Document>) -> Result<(), AgentError> {
        let Ok(mut guard) = self.docs.write() else { return Ok(()) };
        for doc in docs {
            guard.insert(doc.id.clone(), doc);
        }
        Ok(())
    }

    async fn search(
        &self,
        embedding: &[f64],
        top_k: usize,
    ) -> Result<Vec<SearchResult>, AgentError> {
        let Ok(guard) = self.docs.read() else { return Ok(Vec::new()) };

        let mut results: Vec<SearchResult> = guard
            .values()
            .filter(|doc| !doc.embedding.is_empty())
            .map(|doc| SearchResult {
                document: doc.clone(),
                score: cosine_similarity(embedding, &doc.embedding),
            })
            .collect();

        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));

        if top_k > 0 && results.len() > top_k {
            results.truncate(top_k);
        }

        Ok(results)
    }

    async fn delete(&self, ids: &[String]) -> Result<(), AgentError> {
        let Ok(mut guard) = self.docs.write() else { return Ok(()) };
        for id in ids {
            guard.remove(id);
        }
        Ok(())
    }

    async fn close(&self) -> Result<(), AgentError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: &str, embedding: Vec<f64>) -> Document {
        Document {
            id: id.into(),
            content: format!("content of {id}"),
            embedding,
            metadata: HashMap::new(),
        }
    }

    #[tokio::test]
    async fn search_ranks_by_similarity() {
        let store = MemoryStore::new();
        store
            .upsert(vec![
                doc("close", vec![1.0, 0.1]),
                doc("far", vec![0.0, 1.0]),
                doc("exact", vec![1.0, 0.0]),
            ])
            .await
            .unwrap();

        let results = store.search(&[1.0, 0.0], 2).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].document.id, "exact");
        assert_eq!(results[1].document.id, "close");
    }

    #[tokio::test]
    async fn upsert_replaces_by_id() {
        let store = MemoryStore::new();
        store.upsert(vec![doc("a", vec![1.0])]).await.unwrap();
        store.upsert(vec![doc("a", vec![0.5])]).await.unwrap();
        assert_eq!(store.count(), 1);
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let store = MemoryStore::new();
        store.upsert(vec![doc("a", vec![1.0])]).await.unwrap();
        store.delete(&["a".into(), "missing".into()]).await.unwrap();
        store.delete(&["a".into()]).await.unwrap();
        assert_eq!(store.count(), 0);
    }
}
