//! Pipeline execution engine: topology analysis, frontier traversal,
//! fan-in merging, span emission, and metrics recording.
//!
//! A run walks the graph forward from its entry nodes in BFS-style
//! layers. Each node's input is the concatenation of its predecessors'
//! outputs; each execution appends a span and a metrics record. Node
//! failure halts the frontier and returns a failure outcome carrying
//! whatever accumulated.

mod executor;
mod resolver;
mod types;

pub use executor::Executor;
pub use resolver::ModelResolver;
pub use types::{EngineOutput, ExecutionContext, NodeFailure, NodeInput, NodeOutput, Span};

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use gantry_config::{NodeConfig, PipelineConfig};
use gantry_core::{AgentError, ErrorKind, ModelConfig};
use gantry_llm::ChatClient;
use gantry_monitor::{MetricsCollector, NodeMetrics};
use gantry_tools::Registry;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Collaborators for a new [`Engine`]. Only the client is required:
/// the registry falls back to the process-wide default and the resolver
/// to a `gpt-4` default model.
pub struct EngineConfig {
    pub client: Arc<dyn ChatClient>,
    pub registry: Option<Arc<Registry>>,
    pub resolver: Option<ModelResolver>,
    pub collector: Option<Arc<dyn MetricsCollector>>,
}

impl EngineConfig {
    pub fn new(client: Arc<dyn ChatClient>) -> Self {
        Self { client, registry: None, resolver: None, collector: None }
    }
}

pub struct Engine {
    pipeline: PipelineConfig,
    executor: Executor,
    collector: Option<Arc<dyn MetricsCollector>>,
    node_map: HashMap<String, NodeConfig>,
    edges_out: HashMap<String, Vec<String>>,
}

impl Engine {
    pub fn new(pipeline: PipelineConfig, cfg: EngineConfig) -> Self {
        let registry = cfg.registry.unwrap_or_else(gantry_tools::default_registry);
        let resolver =
            Arc::new(cfg.resolver.unwrap_or_else(|| ModelResolver::new(ModelConfig::new("gpt-4"))));

        let node_map: HashMap<String, NodeConfig> =
            pipeline.nodes.iter().map(|n| (n.id.clone(), n.clone())).collect();

        let mut edges_out: HashMap<String, Vec<String>> = HashMap::new();
        for e in &pipeline.edges {
            edges_out.entry(e.from.node.clone()).or_default().push(e.to.node.clone());
        }

        Self {
            executor: Executor::new(cfg.client, resolver, registry),
            collector: cfg.collector,
            node_map,
            edges_out,
            pipeline,
        }
    }

    /// Executes the pipeline against `input` and returns the outcome.
    ///
    /// Never panics and never returns early without an outcome: failures
    /// come back as `success == false` with the partial outputs and spans
    /// accumulated so far.
    pub async fn run(&self, cancel: &CancellationToken, input: &str) -> EngineOutput {
        let start = Instant::now();

        info!("╔══════════════════════════════════════════════════════════════");
        info!("║ PIPELINE: {}", self.pipeline.name);
        info!("║ Input: {}...", input.chars().take(50).collect::<String>());
        info!("╠══════════════════════════════════════════════════════════════");

        let entries = self.entry_nodes();
        if entries.is_empty() {
            return EngineOutput {
                error: Some(AgentError::new("engine.run", ErrorKind::NodeNotFound)),
                duration: start.elapsed(),
                ..Default::default()
            };
        }

        let mut exec_ctx = ExecutionContext::new(NodeInput::from_content(input));
        let mut outputs: HashMap<String, NodeOutput> = HashMap::new();
        let mut spans: Vec<Span> = Vec::new();
        let mut visited: HashSet<String> = HashSet::new();
        let mut step = 0usize;

        let mut frontier = entries;
        while !frontier.is_empty() {
            let mut next_frontier = Vec::new();

            for node_id in std::mem::take(&mut frontier) {
                if visited.contains(&node_id) {
                    continue;
                }
                let Some(node) = self.node_map.get(&node_id) else {
                    continue;
                };
                visited.insert(node_id.clone());

                step += 1;
                let model =
                    if node.model.name.is_empty() { "default" } else { node.model.name.as_str() };
                info!("╠──────────────────────────────────────────────────────────────");
                info!("║ [{}] NODE: {} ({})", step, node_id, node.node_type.as_str());
                info!("║     Model: {}", model);
                if !node.tools.is_empty() {
                    info!("║     Tools: {:?}", node.tools);
                }

                let node_input = self.build_node_input(&node_id, &exec_ctx);
                let node_start = now_ms();
                let timer = Instant::now();
                let result = self.executor.execute(cancel, node, &node_input).await;
                let node_end = now_ms();
                let elapsed = timer.elapsed();

                match result {
                    Err(failure) => {
                        info!("║     ✗ Error: {}", failure.error);
                        info!("╚══════════════════════════════════════════════════════════════");

                        let output = NodeOutput {
                            node_id: node_id.clone(),
                            tokens_in: failure.tokens_in,
                            tokens_out: failure.tokens_out,
                            tool_calls: failure.tool_calls,
                            iterations: failure.iterations,
                            duration: elapsed,
                            ..Default::default()
                        };

                        spans.push(Span {
                            span_id: format!("span_{}", spans.len() + 1),
                            node_id: node_id.clone(),
                            node_type: node.node_type.as_str().to_string(),
                            start_time: node_start,
                            end_time: node_end,
                            input: node_input.content.clone(),
                            output: String::new(),
                            tokens_in: failure.tokens_in,
                            tokens_out: failure.tokens_out,
                            tool_call_count: failure.tool_calls,
                            iteration_count: failure.iterations,
                        });

                        self.record_metrics(&node_id, &output, Some(failure.error.to_string()));
                        outputs.insert(node_id, output);

                        return EngineOutput {
                            success: false,
                            outputs,
                            spans,
                            error: Some(failure.error),
                            duration: start.elapsed(),
                            ..Default::default()
                        };
                    }
                    Ok(output) => {
                        info!("║     ✓ Completed in {:?}", elapsed);
                        info!(
                            "║     ← Response: {} chars, {}/{} tokens",
                            output.content.len(),
                            output.tokens_in,
                            output.tokens_out
                        );

                        spans.push(Span {
                            span_id: format!("span_{}", spans.len() + 1),
                            node_id: node_id.clone(),
                            node_type: node.node_type.as_str().to_string(),
                            start_time: node_start,
                            end_time: node_end,
                            input: node_input.content.clone(),
                            output: output.content.clone(),
                            tokens_in: output.tokens_in,
                            tokens_out: output.tokens_out,
                            tool_call_count: output.tool_calls,
                            iteration_count: output.iterations,
                        });

                        self.record_metrics(&node_id, &output, None);
                        outputs.insert(node_id.clone(), output.clone());
                        next_frontier.extend(self.next_nodes(&node_id, &output));
                        exec_ctx.add_output(output);
                    }
                }
            }

            frontier = next_frontier;
        }

        let (final_node, content) = match exec_ctx.history.last() {
            Some(out) => (out.node_id.clone(), out.content.clone()),
            None => (String::new(), String::new()),
        };

        info!("╠══════════════════════════════════════════════════════════════");
        info!("║ Pipeline complete in {:?}", start.elapsed());
        info!("║ Output: {} chars", content.len());
        info!("╚══════════════════════════════════════════════════════════════");

        EngineOutput {
            success: true,
            final_node,
            content,
            outputs,
            spans,
            error: None,
            duration: start.elapsed(),
        }
    }

    /// The initial frontier: the declared entry node if set, else every
    /// node with no in-edges (in declaration order), else the first
    /// declared node.
    fn entry_nodes(&self) -> Vec<String> {
        if !self.pipeline.entry_node.is_empty() {
            return vec![self.pipeline.entry_node.clone()];
        }

        // Edges from undeclared ids (the editor's "input" pseudo-node)
        // do not count as in-edges.
        let has_incoming: HashSet<&str> = self
            .pipeline
            .edges
            .iter()
            .filter(|e| self.node_map.contains_key(&e.from.node))
            .map(|e| e.to.node.as_str())
            .collect();

        let roots: Vec<String> = self
            .pipeline
            .nodes
            .iter()
            .filter(|n| !has_incoming.contains(n.id.as_str()))
            .map(|n| n.id.clone())
            .collect();
        if !roots.is_empty() {
            return roots;
        }

        self.pipeline.nodes.first().map(|n| vec![n.id.clone()]).unwrap_or_default()
    }

    /// Fan-in merge: predecessors' outputs concatenated with a blank
    /// line, in edge-declaration order. When no predecessor has produced
    /// output yet, the run's original input is used.
    fn build_node_input(&self, node_id: &str, ctx: &ExecutionContext) -> NodeInput {
        let sources = self.find_source_nodes(node_id);

        let parts: Vec<&str> = sources
            .iter()
            .filter_map(|from| ctx.get_output(from).map(|o| o.content.as_str()))
            .collect();

        let content = if parts.is_empty() { ctx.input.content.clone() } else { parts.join("\n\n") };

        NodeInput { node_id: node_id.to_string(), content, sources, metadata: HashMap::new() }
    }

    fn find_source_nodes(&self, node_id: &str) -> Vec<String> {
        self.pipeline
            .edges
            .iter()
            .filter(|e| e.to.node == node_id)
            .map(|e| e.from.node.clone())
            .collect()
    }

    /// A node's own `next_nodes` wins over the static edges.
    fn next_nodes(&self, node_id: &str, output: &NodeOutput) -> Vec<String> {
        if !output.next_nodes.is_empty() {
            return output.next_nodes.clone();
        }
        self.edges_out.get(node_id).cloned().unwrap_or_default()
    }

    fn record_metrics(&self, node_id: &str, output: &NodeOutput, error: Option<String>) {
        let Some(collector) = &self.collector else { return };
        collector.record(NodeMetrics {
            node_id: node_id.to_string(),
            tokens_in: output.tokens_in,
            tokens_out: output.tokens_out,
            duration: output.duration,
            success: error.is_none(),
            error,
        });
    }
}

fn now_ms() -> i64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis() as i64).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use gantry_config::NodeType;
    use gantry_core::{Message, ToolResult, ToolSchema};
    use gantry_llm::{ChatResponse, LlmResponse};

    struct UnreachableClient;

    #[async_trait]
    impl ChatClient for UnreachableClient {
        async fn chat(&self, _: &str, _: &str, _: &str) -> Result<LlmResponse, AgentError> {
            Err(AgentError::new("test", ErrorKind::ExecutionFailed("unexpected chat".into())))
        }

        async fn chat_with_messages(
            &self,
            _: &str,
            _: &str,
            _: &[Message],
        ) -> Result<ChatResponse, AgentError> {
            Err(AgentError::new("test", ErrorKind::ExecutionFailed("unexpected chat".into())))
        }

        async fn chat_with_tools(
            &self,
            _: &str,
            _: &str,
            _: &[Message],
            _: &[ToolSchema],
            _: &[ToolResult],
        ) -> Result<ChatResponse, AgentError> {
            Err(AgentError::new("test", ErrorKind::ExecutionFailed("unexpected chat".into())))
        }
    }

    fn fan_in_engine() -> Engine {
        let pipeline = PipelineConfig::builder("p", "P")
            .node("a", NodeType::Llm)
            .done()
            .node("b", NodeType::Llm)
            .done()
            .node("c", NodeType::Llm)
            .done()
            .edge("a", "c")
            .edge("b", "c")
            .build();
        Engine::new(pipeline, EngineConfig::new(Arc::new(UnreachableClient)))
    }

    #[test]
    fn node_input_records_all_predecessors_as_sources() {
        let engine = fan_in_engine();

        let mut ctx = ExecutionContext::new(NodeInput::from_content("original"));
        ctx.add_output(NodeOutput {
            node_id: "a".into(),
            content: "alpha".into(),
            ..Default::default()
        });
        ctx.add_output(NodeOutput {
            node_id: "b".into(),
            content: "beta".into(),
            ..Default::default()
        });

        let input = engine.build_node_input("c", &ctx);
        assert_eq!(input.sources, vec!["a", "b"]);
        assert_eq!(input.content, "alpha\n\nbeta");
    }

    #[test]
    fn node_input_falls_back_to_run_input() {
        let engine = fan_in_engine();
        let ctx = ExecutionContext::new(NodeInput::from_content("original"));

        let input = engine.build_node_input("c", &ctx);
        assert_eq!(input.content, "original");
        // Predecessors are recorded even before they have produced output.
        assert_eq!(input.sources, vec!["a", "b"]);
    }

    #[test]
    fn entry_nodes_prefers_declared_then_roots() {
        let engine = fan_in_engine();
        assert_eq!(engine.entry_nodes(), vec!["a", "b"]);

        let mut pipeline = PipelineConfig::new("p", "P");
        pipeline.add_node(gantry_config::NodeConfig::new("only", NodeType::Llm));
        pipeline.entry_node = "only".to_string();
        let engine = Engine::new(pipeline, EngineConfig::new(Arc::new(UnreachableClient)));
        assert_eq!(engine.entry_nodes(), vec!["only"]);
    }
}
