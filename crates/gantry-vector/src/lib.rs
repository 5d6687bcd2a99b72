//! Vector storage and similarity search.
//!
//! The engine core only touches this through the tool interface; the
//! in-memory store here is what the built-in semantic-search tools run
//! against when no external backend is configured.

mod memory;

pub use memory::MemoryStore;

use std::collections::HashMap;

use async_trait::async_trait;
use gantry_core::AgentError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A document with optional embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub embedding: Vec<f64>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, Value>,
}

/// A search hit with its cosine-similarity score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub document: Document,
    pub score: f64,
}

/// Vector storage and similarity search operations.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Stores documents, updating existing ones by id.
    async fn upsert(&self, docs: Vec<Document>) -> Result<(), AgentError>;

    /// Finds documents similar to the given embedding.
    async fn search(&self, embedding: &[f64], top_k: usize) -> Result<Vec<SearchResult>, AgentError>;

    /// Removes documents by id.
    async fn delete(&self, ids: &[String]) -> Result<(), AgentError>;

    /// Releases resources.
    async fn close(&self) -> Result<(), AgentError>;
}

/// Cosine similarity between two vectors. Returns 0 for mismatched or
/// zero-norm inputs.
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0;
    let mut norm_a = 0.0;
    let mut norm_b = 0.0;
    for i in 0..a.len() {
        dot += a[i] * b[i];
        norm_a += a[i] * a[i];
        norm_b += b[i] * b[i];
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a.sqrt() * norm_b.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_of_identical_vectors_is_one() {
        let v = [0.5, 0.5, 0.2];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn cosine_of_orthogonal_vectors_is_zero() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
    }

    #[test]
    fn cosine_handles_degenerate_inputs() {
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }
}
