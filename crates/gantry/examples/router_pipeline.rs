//! A router pipeline that classifies requests and hops to a specialist.
//!
//! Run with: OPENAI_API_KEY=... cargo run --example router_pipeline

use std::sync::Arc;

use gantry::prelude::*;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = PipelineConfig::builder("support", "Customer Support")
        .description("Routes customer queries to appropriate handlers")
        .node("router", NodeType::Router)
        .prompt("Classify the user's request. Respond with exactly one word: technical, billing, or general.")
        .next_nodes(["technical", "billing", "general"])
        .done()
        .node("technical", NodeType::Llm)
        .prompt("You are a technical support specialist. Help with technical issues.")
        .done()
        .node("billing", NodeType::Llm)
        .prompt("You are a billing specialist. Help with payment and account issues.")
        .done()
        .node("general", NodeType::Llm)
        .prompt("You are a customer service representative. Help with general questions.")
        .done()
        .edge("router", "technical")
        .edge("router", "billing")
        .edge("router", "general")
        .entry_node("router")
        .build();

    println!("Built pipeline: {}", config.name);
    println!("Nodes: {:?}", config.nodes.iter().map(|n| &n.id).collect::<Vec<_>>());

    let client = Arc::new(UnifiedClient::new(UnifiedConfig {
        openai_key: std::env::var("OPENAI_API_KEY").unwrap_or_default(),
        ..Default::default()
    }));

    let engine = Engine::new(config, EngineConfig::new(client));
    let result = engine.run(&CancellationToken::new(), "My payment failed").await;

    // The router's completion ("billing") becomes the next hop.
    match result.success {
        true => println!("\n[{}] {}", result.final_node, result.content),
        false => eprintln!("run failed: {:?}", result.error),
    }

    Ok(())
}
