//! Simple chat pipeline: one LLM node.
//!
//! Run with: OPENAI_API_KEY=... cargo run --example simple_chat

use std::sync::Arc;

use gantry::prelude::*;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = PipelineConfig::builder("chat", "Simple Chat")
        .node("assistant", NodeType::Llm)
        .prompt("You are a helpful assistant. Be concise.")
        .model("gpt-4")
        .done()
        .build();

    let client = Arc::new(UnifiedClient::new(UnifiedConfig {
        openai_key: std::env::var("OPENAI_API_KEY").unwrap_or_default(),
        anthropic_key: std::env::var("ANTHROPIC_API_KEY").unwrap_or_default(),
        ..Default::default()
    }));

    let engine = Engine::new(config, EngineConfig::new(client));
    let result = engine.run(&CancellationToken::new(), "What is Rust?").await;

    if result.success {
        println!("{}", result.content);
        println!(
            "\n({} nodes, {} input / {} output tokens)",
            result.spans.len(),
            result.spans.iter().map(|s| s.tokens_in).sum::<u32>(),
            result.spans.iter().map(|s| s.tokens_out).sum::<u32>(),
        );
    } else if let Some(err) = result.error {
        eprintln!("run failed: {err}");
    }

    Ok(())
}
