//! Walkthrough of the pipeline builder API.
//!
//! Run with: cargo run --example builder_api

use gantry::prelude::*;

fn main() {
    let config = PipelineConfig::builder("research", "Research Pipeline")
        .description("Searches the web and summarizes findings")
        .node("researcher", NodeType::Worker)
        .prompt("You are a research assistant. Use the tools to find information.")
        .tools(["web_search", "fetch_url"])
        .done()
        .node("summarizer", NodeType::Llm)
        .prompt("Summarize the research findings in 2-3 sentences.")
        .model("gpt-4")
        .done()
        .edge("researcher", "summarizer")
        .build();

    println!("Pipeline: {} ({})", config.name, config.id);
    println!("Description: {}", config.description);

    println!("\nNodes:");
    for node in &config.nodes {
        println!("  - {} ({})", node.id, node.node_type.as_str());
        if !node.prompt.is_empty() {
            let preview: String = node.prompt.chars().take(50).collect();
            println!("    Prompt: {preview}...");
        }
        if !node.tools.is_empty() {
            println!("    Tools: {:?}", node.tools);
        }
    }

    println!("\nEdges:");
    for edge in &config.edges {
        println!("  {} -> {} ({})", edge.from.node, edge.to.node, edge.edge_type.as_str());
    }

    let json = config.to_json().expect("serialization failed");
    println!("\nJSON:\n{json}");
}
