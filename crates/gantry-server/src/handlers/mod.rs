//! HTTP route handlers.

pub mod chat;
pub mod pipelines;
pub mod traces;

use std::sync::Arc;

use axum::extract::State;
use axum::Json;

use crate::dto::{InitResponse, ToolInfo};
use crate::error::AppError;
use crate::state::ServerState;

/// Health check endpoint.
pub async fn health() -> &'static str {
    "OK"
}

/// GET /init - models, templates, and saved configs for the editor.
pub async fn init(
    State(state): State<Arc<ServerState>>,
) -> Result<Json<InitResponse>, AppError> {
    let configs = state.pipeline_store.list().await?;
    Ok(Json(InitResponse {
        models: state.models.clone(),
        templates: state.templates.clone(),
        configs,
    }))
}

/// GET /tools - every registered tool with its parameter schema.
pub async fn tools(State(state): State<Arc<ServerState>>) -> Json<Vec<ToolInfo>> {
    let infos = state
        .registry
        .list()
        .into_iter()
        .filter_map(|name| state.registry.get(&name))
        .map(|t| ToolInfo {
            name: t.name().to_string(),
            description: t.description().to_string(),
            parameters: t.parameters(),
        })
        .collect();

    Json(infos)
}
