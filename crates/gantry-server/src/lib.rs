//! HTTP/SSE API server around the pipeline engine.
//!
//! Routes: health, init bootstrap, tool listing, SSE chat (direct or
//! through a runtime pipeline), pipeline CRUD, trace CRUD, and the
//! aggregate metrics summary.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod state;

pub use state::{ServerConfig, ServerState};

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Builds the API router for the given state.
pub fn router(state: Arc<ServerState>) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health))
        .route("/init", get(handlers::init))
        .route("/tools", get(handlers::tools))
        .route("/chat", post(handlers::chat::chat))
        .route("/pipelines", get(handlers::pipelines::list))
        .route("/pipelines/save", post(handlers::pipelines::save))
        .route("/pipelines/delete", post(handlers::pipelines::delete))
        .route("/api/traces", get(handlers::traces::list))
        .route(
            "/api/traces/:id",
            get(handlers::traces::get).delete(handlers::traces::delete),
        )
        .route("/api/metrics/summary", get(handlers::traces::metrics_summary))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
