//! Trace and pipeline persistence.
//!
//! The contract is storage-agnostic; [`new_stores`] picks a concrete
//! driver by inspecting the connection string: empty means SQLite at the
//! default data path, `postgres://` / `postgresql://` means PostgreSQL,
//! and anything else is treated as a SQLite file path.

mod postgres;
mod sqlite;

pub use postgres::new_postgres_stores;
pub use sqlite::{in_memory_stores, new_sqlite_stores};

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

const DEFAULT_SQLITE_PATH: &str = "data/gantry.db";

/// Errors from store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The requested entity does not exist.
    #[error("not found")]
    NotFound,

    #[error("database error: {0}")]
    Database(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("lock error")]
    Lock,
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Database(e.to_string())
    }
}

impl From<tokio_postgres::Error> for StoreError {
    fn from(e: tokio_postgres::Error) -> Self {
        StoreError::Database(e.to_string())
    }
}

/// A recorded pipeline run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TraceInfo {
    pub trace_id: String,
    pub pipeline_id: String,
    pub pipeline_name: String,
    /// Milliseconds since epoch.
    pub timestamp: i64,
    pub input: String,
    pub output: String,
    pub total_elapsed_ms: i64,
    pub total_input_tokens: i64,
    pub total_output_tokens: i64,
    pub total_tool_calls: i64,
    pub status: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub spans: Vec<SpanInfo>,
}

/// One node execution within a trace.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpanInfo {
    pub span_id: String,
    pub trace_id: String,
    pub node_id: String,
    pub node_type: String,
    pub start_time: i64,
    pub end_time: i64,
    pub input: String,
    pub output: String,
    pub input_tokens: i64,
    pub output_tokens: i64,
    pub tool_call_count: i64,
    pub iteration_count: i64,
}

/// Aggregate over all persisted traces.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricsSummary {
    pub total_traces: i64,
    pub total_input_tokens: i64,
    pub total_output_tokens: i64,
    pub total_tool_calls: i64,
    pub avg_latency_ms: f64,
}

/// A node as the editor sees it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeInfo {
    pub id: String,
    pub node_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
}

/// An edge as the editor sees it; endpoints stay raw because the editor
/// sends either a bare node id or a `{node, port}` object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeInfo {
    pub from: Value,
    pub to: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edge_type: Option<String>,
}

/// A 2D canvas position.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// A saved pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineInfo {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub nodes: Vec<NodeInfo>,
    pub edges: Vec<EdgeInfo>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub layout: HashMap<String, Position>,
}

/// Persistence for finished traces. `add` is an upsert; `get` fails with
/// [`StoreError::NotFound`] on an absent id; `delete` is idempotent;
/// `list` returns newest-first by timestamp.
#[async_trait]
pub trait TraceStore: Send + Sync {
    async fn add(&self, trace: TraceInfo) -> Result<(), StoreError>;
    async fn get(&self, id: &str) -> Result<TraceInfo, StoreError>;
    async fn list(&self) -> Result<Vec<TraceInfo>, StoreError>;
    async fn delete(&self, id: &str) -> Result<(), StoreError>;
    async fn summary(&self) -> Result<MetricsSummary, StoreError>;
    async fn close(&self) -> Result<(), StoreError>;
}

/// Persistence for pipeline configurations. `save` is an upsert; `list`
/// returns pipelines ordered by name.
#[async_trait]
pub trait PipelineStore: Send + Sync {
    async fn save(&self, pipeline: PipelineInfo) -> Result<(), StoreError>;
    async fn get(&self, id: &str) -> Result<PipelineInfo, StoreError>;
    async fn list(&self) -> Result<Vec<PipelineInfo>, StoreError>;
    async fn delete(&self, id: &str) -> Result<(), StoreError>;
    async fn close(&self) -> Result<(), StoreError>;
}

/// Creates trace and pipeline stores for the given connection string.
pub async fn new_stores(
    dsn: &str,
) -> Result<(Arc<dyn TraceStore>, Arc<dyn PipelineStore>), StoreError> {
    if dsn.is_empty() {
        return new_sqlite_stores(DEFAULT_SQLITE_PATH);
    }

    if dsn.starts_with("postgres://") || dsn.starts_with("postgresql://") {
        return new_postgres_stores(dsn).await;
    }

    new_sqlite_stores(dsn)
}
