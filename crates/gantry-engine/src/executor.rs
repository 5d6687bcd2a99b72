use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use gantry_config::{NodeConfig, NodeType};
use gantry_core::{AgentError, ErrorKind, Message, ToolCall, ToolResult};
use gantry_llm::ChatClient;
use gantry_tools::{to_schemas, Registry, Tool};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::resolver::ModelResolver;
use crate::types::{NodeFailure, NodeInput, NodeOutput};

const DEFAULT_MAX_ITER: u32 = 10;

/// Runs a single node: one dispatch arm per node type, including the
/// bounded tool-calling worker loop.
pub struct Executor {
    client: Arc<dyn ChatClient>,
    resolver: Arc<ModelResolver>,
    registry: Arc<Registry>,
}

impl Executor {
    pub fn new(
        client: Arc<dyn ChatClient>,
        resolver: Arc<ModelResolver>,
        registry: Arc<Registry>,
    ) -> Self {
        Self { client, resolver, registry }
    }

    pub async fn execute(
        &self,
        cancel: &CancellationToken,
        node: &NodeConfig,
        input: &NodeInput,
    ) -> Result<NodeOutput, NodeFailure> {
        let start = Instant::now();

        let result = match node.node_type {
            NodeType::Llm => self.execute_llm(cancel, node, input).await,
            NodeType::Worker => self.execute_worker(cancel, node, input).await,
            NodeType::Router => self.execute_router(cancel, node, input).await,
            NodeType::Gate | NodeType::Aggregator => Ok(NodeOutput {
                content: input.content.clone(),
                ..Default::default()
            }),
            NodeType::Orchestrator => self.execute_orchestrator(cancel, node, input).await,
            NodeType::Evaluator => self.execute_chat(cancel, node, input).await,
            NodeType::Synthesizer => self.execute_chat(cancel, node, input).await,
            NodeType::Coordinator => Ok(NodeOutput {
                content: input.content.clone(),
                next_nodes: node.target_nodes.clone(),
                ..Default::default()
            }),
        };

        result.map(|mut output| {
            output.node_id = node.id.clone();
            output.duration = start.elapsed();
            output
        })
    }

    async fn chat(
        &self,
        cancel: &CancellationToken,
        node: &NodeConfig,
        system: &str,
        user: &str,
    ) -> Result<gantry_llm::LlmResponse, AgentError> {
        let model = self.resolver.resolve_model_name(node);
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                Err(AgentError::for_node("executor.chat", &node.id, ErrorKind::Cancelled))
            }
            res = self.client.chat(&model, system, user) => {
                res.map_err(|e| tag_node(&node.id, e))
            }
        }
    }

    async fn execute_llm(
        &self,
        cancel: &CancellationToken,
        node: &NodeConfig,
        input: &NodeInput,
    ) -> Result<NodeOutput, NodeFailure> {
        let resp = self.chat(cancel, node, &node.prompt, &input.content).await?;
        Ok(NodeOutput {
            content: resp.content,
            tokens_in: resp.usage.prompt_tokens,
            tokens_out: resp.usage.completion_tokens,
            iterations: 1,
            ..Default::default()
        })
    }

    /// Evaluator and synthesizer nodes: a single chat call with the node
    /// prompt as system and the merged input as user.
    async fn execute_chat(
        &self,
        cancel: &CancellationToken,
        node: &NodeConfig,
        input: &NodeInput,
    ) -> Result<NodeOutput, NodeFailure> {
        self.execute_llm(cancel, node, input).await
    }

    async fn execute_router(
        &self,
        cancel: &CancellationToken,
        node: &NodeConfig,
        input: &NodeInput,
    ) -> Result<NodeOutput, NodeFailure> {
        let prompt = format!("{}\n\nAvailable routes: {:?}", node.prompt, node.next_nodes);
        let resp = self.chat(cancel, node, &prompt, &input.content).await?;

        // The completion content is the chosen hop, forwarded verbatim.
        Ok(NodeOutput {
            next_nodes: vec![resp.content.clone()],
            content: resp.content,
            tokens_in: resp.usage.prompt_tokens,
            tokens_out: resp.usage.completion_tokens,
            iterations: 1,
            ..Default::default()
        })
    }

    async fn execute_orchestrator(
        &self,
        cancel: &CancellationToken,
        node: &NodeConfig,
        input: &NodeInput,
    ) -> Result<NodeOutput, NodeFailure> {
        let prompt = format!("{}\n\nTarget nodes: {:?}", node.prompt, node.target_nodes);
        let resp = self.chat(cancel, node, &prompt, &input.content).await?;

        Ok(NodeOutput {
            content: resp.content,
            next_nodes: node.target_nodes.clone(),
            tokens_in: resp.usage.prompt_tokens,
            tokens_out: resp.usage.completion_tokens,
            iterations: 1,
            ..Default::default()
        })
    }

    /// The agentic loop: interleaves tool-capable chat calls with tool
    /// executions until the model stops requesting tools or the
    /// iteration bound is hit.
    async fn execute_worker(
        &self,
        cancel: &CancellationToken,
        node: &NodeConfig,
        input: &NodeInput,
    ) -> Result<NodeOutput, NodeFailure> {
        let model = self.resolver.resolve_model_name(node);

        let node_tools = self
            .registry
            .get_multiple(&node.tools)
            .map_err(|e| NodeFailure::from(tag_node(&node.id, e)))?;
        let schemas = to_schemas(&node_tools);

        let mut msgs = vec![Message::user(&input.content)];
        let mut total_in = 0u32;
        let mut total_out = 0u32;
        let mut tool_calls_made = 0u32;

        let max_iter = if node.max_iter == 0 { DEFAULT_MAX_ITER } else { node.max_iter };

        for iteration in 0..max_iter {
            let partial = |error: AgentError| NodeFailure {
                error,
                tokens_in: total_in,
                tokens_out: total_out,
                tool_calls: tool_calls_made,
                iterations: iteration,
            };

            let resp = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return Err(partial(AgentError::for_node(
                        "executor.worker", &node.id, ErrorKind::Cancelled,
                    )));
                }
                res = self.client.chat_with_tools(&model, &node.prompt, &msgs, &schemas, &[]) => {
                    res.map_err(|e| partial(tag_node(&node.id, e)))?
                }
            };

            total_in += resp.usage.prompt_tokens;
            total_out += resp.usage.completion_tokens;

            if !resp.has_tool_calls() {
                return Ok(NodeOutput {
                    content: resp.content,
                    tokens_in: total_in,
                    tokens_out: total_out,
                    tool_calls: tool_calls_made,
                    iterations: iteration + 1,
                    ..Default::default()
                });
            }

            msgs.push(Message::assistant(&resp.content));
            tool_calls_made += resp.tool_calls.len() as u32;

            let results = self
                .execute_tool_calls(cancel, &node.id, &resp.tool_calls, &node_tools)
                .await
                .map_err(|e| NodeFailure {
                    error: e,
                    tokens_in: total_in,
                    tokens_out: total_out,
                    tool_calls: tool_calls_made,
                    iterations: iteration + 1,
                })?;

            for tr in results {
                msgs.push(Message::tool(tr.tool_call_id, tr.content));
            }
        }

        Err(NodeFailure {
            error: AgentError::for_node("executor.worker", &node.id, ErrorKind::MaxIterations),
            tokens_in: total_in,
            tokens_out: total_out,
            tool_calls: tool_calls_made,
            iterations: max_iter,
        })
    }

    /// Runs the requested tool calls sequentially, in the order the model
    /// returned them. A missing tool or an execution error becomes an
    /// error-marked result fed back to the model; only cancellation
    /// aborts.
    pub async fn execute_tool_calls(
        &self,
        cancel: &CancellationToken,
        node_id: &str,
        calls: &[ToolCall],
        node_tools: &[Arc<dyn Tool>],
    ) -> Result<Vec<ToolResult>, AgentError> {
        let tool_map: HashMap<&str, &Arc<dyn Tool>> =
            node_tools.iter().map(|t| (t.name(), t)).collect();

        let mut results = Vec::with_capacity(calls.len());
        for call in calls {
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return Err(AgentError::for_node(
                        "executor.tool", node_id, ErrorKind::Cancelled,
                    ));
                }
                res = Self::execute_single_tool_call(call, &tool_map) => res,
            };
            results.push(result);
        }

        Ok(results)
    }

    async fn execute_single_tool_call(
        call: &ToolCall,
        tool_map: &HashMap<&str, &Arc<dyn Tool>>,
    ) -> ToolResult {
        let Some(tool) = tool_map.get(call.name.as_str()) else {
            return ToolResult::error(&call.id, format!("tool not found: {}", call.name));
        };

        info!("║     ⚙ tool: {}", call.name);
        match tool.execute(call.arguments.clone()).await {
            Ok(content) => ToolResult::ok(&call.id, content),
            Err(e) => ToolResult::error(&call.id, e.to_string()),
        }
    }
}

/// Attaches the node id to an error that does not already carry one.
fn tag_node(node_id: &str, mut e: AgentError) -> AgentError {
    if e.node.is_none() {
        e.node = Some(node_id.to_string());
    }
    e
}
