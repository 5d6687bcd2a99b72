use std::env;
use std::sync::Arc;

use anyhow::Result;
use gantry_llm::{UnifiedClient, UnifiedConfig};
use gantry_server::{router, ServerConfig, ServerState};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".parse().unwrap()),
        )
        .compact()
        .init();

    let ollama_url = env_or("OLLAMA_URL", "http://localhost:11434/v1");

    let client = Arc::new(UnifiedClient::new(UnifiedConfig {
        openai_key: env::var("OPENAI_API_KEY").unwrap_or_default(),
        anthropic_key: env::var("ANTHROPIC_API_KEY").unwrap_or_default(),
        ollama_url: ollama_url.clone(),
    }));

    let mut cfg = ServerConfig::new(client);
    cfg.ollama_url = ollama_url;
    cfg.database_dsn = env::var("DATABASE_URL").unwrap_or_default();
    cfg.embed_model = env::var("EMBED_MODEL").unwrap_or_default();

    let state = Arc::new(ServerState::new(cfg).await?);
    let app = router(state);

    let addr = env_or("ADDR", "0.0.0.0:8000");
    info!("starting gantry server on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn env_or(key: &str, fallback: &str) -> String {
    env::var(key).ok().filter(|v| !v.is_empty()).unwrap_or_else(|| fallback.to_string())
}
