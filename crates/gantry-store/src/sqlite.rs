//! SQLite-backed stores. The connection is shared behind a mutex; every
//! operation is a short local transaction, so holding it across a call
//! is fine.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection};
use tracing::info;

use crate::{
    MetricsSummary, PipelineInfo, PipelineStore, SpanInfo, StoreError, TraceInfo, TraceStore,
};

const INIT_SQL: &str = include_str!("../migrations/sqlite_init.sql");

pub struct SqliteTraceStore {
    conn: Arc<Mutex<Connection>>,
}

pub struct SqlitePipelineStore {
    conn: Arc<Mutex<Connection>>,
}

/// Opens (or creates) the database file and returns both stores backed by
/// one connection.
pub fn new_sqlite_stores(
    path: &str,
) -> Result<(Arc<dyn TraceStore>, Arc<dyn PipelineStore>), StoreError> {
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::Database(format!("create data directory: {e}")))?;
        }
    }

    let conn = Connection::open(path)?;
    conn.execute_batch(INIT_SQL)?;
    info!("database initialized at {}", path);

    let conn = Arc::new(Mutex::new(conn));
    Ok((
        Arc::new(SqliteTraceStore { conn: Arc::clone(&conn) }),
        Arc::new(SqlitePipelineStore { conn }),
    ))
}

/// In-memory variant for tests.
pub fn in_memory_stores() -> Result<(Arc<dyn TraceStore>, Arc<dyn PipelineStore>), StoreError> {
    let conn = Connection::open_in_memory()?;
    conn.execute_batch(INIT_SQL)?;
    let conn = Arc::new(Mutex::new(conn));
    Ok((
        Arc::new(SqliteTraceStore { conn: Arc::clone(&conn) }),
        Arc::new(SqlitePipelineStore { conn }),
    ))
}

fn trace_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<(TraceInfo, String)> {
    Ok((
        TraceInfo {
            trace_id: row.get(0)?,
            pipeline_id: row.get(1)?,
            pipeline_name: row.get(2)?,
            timestamp: row.get(3)?,
            input: row.get(4)?,
            output: row.get(5)?,
            total_elapsed_ms: row.get(6)?,
            total_input_tokens: row.get(7)?,
            total_output_tokens: row.get(8)?,
            total_tool_calls: row.get(9)?,
            status: row.get(10)?,
            spans: Vec::new(),
        },
        row.get(11)?,
    ))
}

const TRACE_COLUMNS: &str = "trace_id, pipeline_id, pipeline_name, timestamp, input, output, \
     total_elapsed_ms, total_input_tokens, total_output_tokens, total_tool_calls, status, spans";

#[async_trait]
impl TraceStore for SqliteTraceStore {
    async fn add(&self, trace: TraceInfo) -> Result<(), StoreError> {
        let spans = serde_json::to_string(&trace.spans)?;
        let conn = self.conn.lock().map_err(|_| StoreError::Lock)?;

        conn.execute(
            &format!(
                "INSERT OR REPLACE INTO traces ({TRACE_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)"
            ),
            params![
                trace.trace_id,
                trace.pipeline_id,
                trace.pipeline_name,
                trace.timestamp,
                trace.input,
                trace.output,
                trace.total_elapsed_ms,
                trace.total_input_tokens,
                trace.total_output_tokens,
                trace.total_tool_calls,
                trace.status,
                spans,
            ],
        )?;

        Ok(())
    }

    async fn get(&self, id: &str) -> Result<TraceInfo, StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::Lock)?;

        let result = conn.query_row(
            &format!("SELECT {TRACE_COLUMNS} FROM traces WHERE trace_id = ?1"),
            params![id],
            trace_from_row,
        );

        match result {
            Ok((mut trace, spans_json)) => {
                trace.spans = serde_json::from_str::<Vec<SpanInfo>>(&spans_json)?;
                Ok(trace)
            }
            Err(rusqlite::Error::QueryReturnedNoRows) => Err(StoreError::NotFound),
            Err(e) => Err(e.into()),
        }
    }

    async fn list(&self) -> Result<Vec<TraceInfo>, StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::Lock)?;

        let mut stmt = conn
            .prepare(&format!("SELECT {TRACE_COLUMNS} FROM traces ORDER BY timestamp DESC"))?;
        let rows = stmt.query_map([], trace_from_row)?;

        let mut traces = Vec::new();
        for row in rows {
            let (mut trace, spans_json) = row?;
            trace.spans = serde_json::from_str(&spans_json)?;
            traces.push(trace);
        }
        Ok(traces)
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::Lock)?;
        conn.execute("DELETE FROM traces WHERE trace_id = ?1", params![id])?;
        Ok(())
    }

    async fn summary(&self) -> Result<MetricsSummary, StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::Lock)?;

        let summary = conn.query_row(
            "SELECT
                COUNT(*),
                COALESCE(SUM(total_input_tokens), 0),
                COALESCE(SUM(total_output_tokens), 0),
                COALESCE(SUM(total_tool_calls), 0),
                COALESCE(AVG(total_elapsed_ms), 0)
             FROM traces",
            [],
            |row| {
                Ok(MetricsSummary {
                    total_traces: row.get(0)?,
                    total_input_tokens: row.get(1)?,
                    total_output_tokens: row.get(2)?,
                    total_tool_calls: row.get(3)?,
                    avg_latency_ms: row.get(4)?,
                })
            },
        )?;

        Ok(summary)
    }

    async fn close(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

fn pipeline_from_row(
    row: &rusqlite::Row<'_>,
) -> rusqlite::Result<(String, String, String, String, String, String)> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?, row.get(5)?))
}

fn decode_pipeline(
    (id, name, description, nodes, edges, layout): (String, String, String, String, String, String),
) -> Result<PipelineInfo, StoreError> {
    Ok(PipelineInfo {
        id,
        name,
        description,
        nodes: serde_json::from_str(&nodes)?,
        edges: serde_json::from_str(&edges)?,
        layout: serde_json::from_str(&layout)?,
    })
}

#[async_trait]
impl PipelineStore for SqlitePipelineStore {
    async fn save(&self, pipeline: PipelineInfo) -> Result<(), StoreError> {
        let nodes = serde_json::to_string(&pipeline.nodes)?;
        let edges = serde_json::to_string(&pipeline.edges)?;
        let layout = serde_json::to_string(&pipeline.layout)?;
        let conn = self.conn.lock().map_err(|_| StoreError::Lock)?;

        conn.execute(
            "INSERT OR REPLACE INTO pipelines (id, name, description, nodes, edges, layout)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![pipeline.id, pipeline.name, pipeline.description, nodes, edges, layout],
        )?;

        Ok(())
    }

    async fn get(&self, id: &str) -> Result<PipelineInfo, StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::Lock)?;

        let result = conn.query_row(
            "SELECT id, name, description, nodes, edges, layout FROM pipelines WHERE id = ?1",
            params![id],
            pipeline_from_row,
        );

        match result {
            Ok(raw) => decode_pipeline(raw),
            Err(rusqlite::Error::QueryReturnedNoRows) => Err(StoreError::NotFound),
            Err(e) => Err(e.into()),
        }
    }

    async fn list(&self) -> Result<Vec<PipelineInfo>, StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::Lock)?;

        let mut stmt = conn.prepare(
            "SELECT id, name, description, nodes, edges, layout FROM pipelines ORDER BY name",
        )?;
        let rows = stmt.query_map([], pipeline_from_row)?;

        let mut pipelines = Vec::new();
        for row in rows {
            pipelines.push(decode_pipeline(row?)?);
        }
        Ok(pipelines)
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::Lock)?;
        conn.execute("DELETE FROM pipelines WHERE id = ?1", params![id])?;
        Ok(())
    }

    async fn close(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
