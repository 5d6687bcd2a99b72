//! Trace observability handlers.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use gantry_store::{MetricsSummary, SpanInfo, TraceInfo};
use serde::Serialize;
use serde_json::{json, Value};

use crate::error::AppError;
use crate::state::ServerState;

#[derive(Serialize)]
pub struct TraceListResponse {
    pub traces: Vec<TraceInfo>,
}

#[derive(Serialize)]
pub struct TraceDetailResponse {
    pub trace: TraceInfo,
    pub spans: Vec<SpanInfo>,
}

/// GET /api/traces - newest first.
pub async fn list(
    State(state): State<Arc<ServerState>>,
) -> Result<Json<TraceListResponse>, AppError> {
    let traces = state.trace_store.list().await?;
    Ok(Json(TraceListResponse { traces }))
}

/// GET /api/traces/:id - one trace with its spans.
pub async fn get(
    State(state): State<Arc<ServerState>>,
    Path(trace_id): Path<String>,
) -> Result<Json<TraceDetailResponse>, AppError> {
    let trace = state.trace_store.get(&trace_id).await?;
    let spans = trace.spans.clone();
    Ok(Json(TraceDetailResponse { trace, spans }))
}

/// DELETE /api/traces/:id - idempotent delete.
pub async fn delete(
    State(state): State<Arc<ServerState>>,
    Path(trace_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    state.trace_store.delete(&trace_id).await?;
    Ok(Json(json!({"success": true})))
}

/// GET /api/metrics/summary - aggregate over all persisted traces.
pub async fn metrics_summary(
    State(state): State<Arc<ServerState>>,
) -> Result<Json<MetricsSummary>, AppError> {
    Ok(Json(state.trace_store.summary().await?))
}
