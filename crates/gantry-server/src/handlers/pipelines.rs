//! Pipeline CRUD handlers.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use gantry_store::PipelineInfo;
use serde_json::{json, Value};

use crate::dto::DeletePipelineRequest;
use crate::error::AppError;
use crate::state::ServerState;

/// GET /pipelines - all saved pipeline configurations, by name.
pub async fn list(
    State(state): State<Arc<ServerState>>,
) -> Result<Json<Vec<PipelineInfo>>, AppError> {
    Ok(Json(state.pipeline_store.list().await?))
}

/// POST /pipelines/save - insert-or-replace a pipeline configuration.
pub async fn save(
    State(state): State<Arc<ServerState>>,
    Json(req): Json<PipelineInfo>,
) -> Result<Json<Value>, AppError> {
    let id = req.id.clone();
    state.pipeline_store.save(req).await?;
    Ok(Json(json!({"success": true, "id": id})))
}

/// POST /pipelines/delete - idempotent delete by id.
pub async fn delete(
    State(state): State<Arc<ServerState>>,
    Json(req): Json<DeletePipelineRequest>,
) -> Result<Json<Value>, AppError> {
    state.pipeline_store.delete(&req.id).await?;
    Ok(Json(json!({"success": true})))
}
