//! PostgreSQL-backed stores over a bounded connection pool.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use deadpool_postgres::{Config, Pool, PoolConfig, Runtime};
use tokio_postgres::NoTls;
use tracing::info;

use crate::{
    MetricsSummary, PipelineInfo, PipelineStore, StoreError, TraceInfo, TraceStore,
};

const INIT_SQL: &str = include_str!("../migrations/postgres_init.sql");

const POOL_MAX_OPEN: usize = 25;
const PING_TIMEOUT: Duration = Duration::from_secs(10);

pub struct PostgresTraceStore {
    pool: Pool,
}

pub struct PostgresPipelineStore {
    pool: Pool,
}

/// Connects, pings with a short deadline, runs migrations, and returns
/// both stores sharing one pool.
pub async fn new_postgres_stores(
    dsn: &str,
) -> Result<(Arc<dyn TraceStore>, Arc<dyn PipelineStore>), StoreError> {
    let mut cfg = Config::new();
    cfg.url = Some(dsn.to_string());
    cfg.pool = Some(PoolConfig::new(POOL_MAX_OPEN));

    let pool = cfg
        .create_pool(Some(Runtime::Tokio1), NoTls)
        .map_err(|e| StoreError::Database(format!("open postgres: {e}")))?;

    let client = tokio::time::timeout(PING_TIMEOUT, pool.get())
        .await
        .map_err(|_| StoreError::Database("ping postgres: timed out".into()))?
        .map_err(|e| StoreError::Database(format!("ping postgres: {e}")))?;

    client.batch_execute(INIT_SQL).await?;
    info!("postgres storage initialized");

    Ok((
        Arc::new(PostgresTraceStore { pool: pool.clone() }),
        Arc::new(PostgresPipelineStore { pool }),
    ))
}

async fn get_client(pool: &Pool) -> Result<deadpool_postgres::Object, StoreError> {
    pool.get().await.map_err(|e| StoreError::Database(e.to_string()))
}

fn trace_from_row(row: &tokio_postgres::Row) -> Result<TraceInfo, StoreError> {
    let spans: serde_json::Value = row.get(11);
    Ok(TraceInfo {
        trace_id: row.get(0),
        pipeline_id: row.get(1),
        pipeline_name: row.get(2),
        timestamp: row.get(3),
        input: row.get(4),
        output: row.get(5),
        total_elapsed_ms: row.get(6),
        total_input_tokens: row.get(7),
        total_output_tokens: row.get(8),
        total_tool_calls: row.get(9),
        status: row.get(10),
        spans: serde_json::from_value(spans)?,
    })
}

const TRACE_COLUMNS: &str = "trace_id, pipeline_id, pipeline_name, timestamp, input, output, \
     total_elapsed_ms, total_input_tokens, total_output_tokens, total_tool_calls, status, spans";

#[async_trait]
impl TraceStore for PostgresTraceStore {
    async fn add(&self, trace: TraceInfo) -> Result<(), StoreError> {
        let spans = serde_json::to_value(&trace.spans)?;
        let client = get_client(&self.pool).await?;

        client
            .execute(
                format!(
                    "INSERT INTO traces ({TRACE_COLUMNS})
                     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
                     ON CONFLICT (trace_id) DO UPDATE SET
                         pipeline_id = EXCLUDED.pipeline_id,
                         pipeline_name = EXCLUDED.pipeline_name,
                         timestamp = EXCLUDED.timestamp,
                         input = EXCLUDED.input,
                         output = EXCLUDED.output,
                         total_elapsed_ms = EXCLUDED.total_elapsed_ms,
                         total_input_tokens = EXCLUDED.total_input_tokens,
                         total_output_tokens = EXCLUDED.total_output_tokens,
                         total_tool_calls = EXCLUDED.total_tool_calls,
                         status = EXCLUDED.status,
                         spans = EXCLUDED.spans"
                )
                .as_str(),
                &[
                    &trace.trace_id,
                    &trace.pipeline_id,
                    &trace.pipeline_name,
                    &trace.timestamp,
                    &trace.input,
                    &trace.output,
                    &trace.total_elapsed_ms,
                    &trace.total_input_tokens,
                    &trace.total_output_tokens,
                    &trace.total_tool_calls,
                    &trace.status,
                    &spans,
                ],
            )
            .await?;

        Ok(())
    }

    async fn get(&self, id: &str) -> Result<TraceInfo, StoreError> {
        let client = get_client(&self.pool).await?;

        let row = client
            .query_opt(
                format!("SELECT {TRACE_COLUMNS} FROM traces WHERE trace_id = $1").as_str(),
                &[&id],
            )
            .await?
            .ok_or(StoreError::NotFound)?;

        trace_from_row(&row)
    }

    async fn list(&self) -> Result<Vec<TraceInfo>, StoreError> {
        let client = get_client(&self.pool).await?;

        let rows = client
            .query(
                format!("SELECT {TRACE_COLUMNS} FROM traces ORDER BY timestamp DESC").as_str(),
                &[],
            )
            .await?;

        rows.iter().map(trace_from_row).collect()
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let client = get_client(&self.pool).await?;
        client.execute("DELETE FROM traces WHERE trace_id = $1", &[&id]).await?;
        Ok(())
    }

    async fn summary(&self) -> Result<MetricsSummary, StoreError> {
        let client = get_client(&self.pool).await?;

        let row = client
            .query_one(
                "SELECT
                    COUNT(*)::bigint,
                    COALESCE(SUM(total_input_tokens), 0)::bigint,
                    COALESCE(SUM(total_output_tokens), 0)::bigint,
                    COALESCE(SUM(total_tool_calls), 0)::bigint,
                    COALESCE(AVG(total_elapsed_ms), 0)::double precision
                 FROM traces",
                &[],
            )
            .await?;

        Ok(MetricsSummary {
            total_traces: row.get(0),
            total_input_tokens: row.get(1),
            total_output_tokens: row.get(2),
            total_tool_calls: row.get(3),
            avg_latency_ms: row.get(4),
        })
    }

    async fn close(&self) -> Result<(), StoreError> {
        self.pool.close();
        Ok(())
    }
}

fn pipeline_from_row(row: &tokio_postgres::Row) -> Result<PipelineInfo, StoreError> {
    let nodes: serde_json::Value = row.get(3);
    let edges: serde_json::Value = row.get(4);
    let layout: serde_json::Value = row.get(5);
    Ok(PipelineInfo {
        id: row.get(0),
        name: row.get(1),
        description: row.get(2),
        nodes: serde_json::from_value(nodes)?,
        edges: serde_json::from_value(edges)?,
        layout: serde_json::from_value(layout)?,
    })
}

#[async_trait]
impl PipelineStore for PostgresPipelineStore {
    async fn save(&self, pipeline: PipelineInfo) -> Result<(), StoreError> {
        let nodes = serde_json::to_value(&pipeline.nodes)?;
        let edges = serde_json::to_value(&pipeline.edges)?;
        let layout = serde_json::to_value(&pipeline.layout)?;
        let client = get_client(&self.pool).await?;

        client
            .execute(
                "INSERT INTO pipelines (id, name, description, nodes, edges, layout)
                 VALUES ($1, $2, $3, $4, $5, $6)
                 ON CONFLICT (id) DO UPDATE SET
                     name = EXCLUDED.name,
                     description = EXCLUDED.description,
                     nodes = EXCLUDED.nodes,
                     edges = EXCLUDED.edges,
                     layout = EXCLUDED.layout",
                &[
                    &pipeline.id,
                    &pipeline.name,
                    &pipeline.description,
                    &nodes,
                    &edges,
                    &layout,
                ],
            )
            .await?;

        Ok(())
    }

    async fn get(&self, id: &str) -> Result<PipelineInfo, StoreError> {
        let client = get_client(&self.pool).await?;

        let row = client
            .query_opt(
                "SELECT id, name, description, nodes, edges, layout FROM pipelines WHERE id = $1",
                &[&id],
            )
            .await?
            .ok_or(StoreError::NotFound)?;

        pipeline_from_row(&row)
    }

    async fn list(&self) -> Result<Vec<PipelineInfo>, StoreError> {
        let client = get_client(&self.pool).await?;

        let rows = client
            .query(
                "SELECT id, name, description, nodes, edges, layout FROM pipelines ORDER BY name",
                &[],
            )
            .await?;

        rows.iter().map(pipeline_from_row).collect()
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let client = get_client(&self.pool).await?;
        client.execute("DELETE FROM pipelines WHERE id = $1", &[&id]).await?;
        Ok(())
    }

    async fn close(&self) -> Result<(), StoreError> {
        self.pool.close();
        Ok(())
    }
}
