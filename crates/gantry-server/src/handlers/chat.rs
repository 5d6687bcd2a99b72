//! SSE chat handler: direct streaming chat, or a full pipeline run.
//!
//! Every event is `data: <json>` where the JSON carries a `type` tag:
//! `stream` events carry `{content}`, the final `end` event carries
//! `{metadata}`. Failures stream `Error: <message>` as content and still
//! close with an `end` event; a trace is recorded either way.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use axum::extract::State;
use axum::response::sse::{Event, Sse};
use axum::Json;
use futures::{Stream, StreamExt};
use gantry_config::{NodeType, PipelineConfig};
use gantry_core::{AgentError, ErrorKind, Message, ModelConfig};
use gantry_engine::{Engine, EngineConfig, ModelResolver, Span};
use gantry_llm::Usage;
use gantry_store::{SpanInfo, TraceInfo};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use uuid::Uuid;

use crate::dto::{ChatRequest, Metadata, RuntimeEdge, RuntimePipeline};
use crate::state::ServerState;

const RUN_TIMEOUT: Duration = Duration::from_secs(120);
const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant.";

/// POST /chat - SSE response, either through a pipeline or direct.
pub async fn chat(
    State(state): State<Arc<ServerState>>,
    Json(req): Json<ChatRequest>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (tx, rx) = mpsc::channel::<Event>(16);

    tokio::spawn(async move {
        let pipeline = req.pipeline.clone().filter(|p| !p.is_null());
        match pipeline {
            Some(raw) => pipeline_chat(state, req, raw, tx).await,
            None => direct_chat(state, req, tx).await,
        }
    });

    Sse::new(ReceiverStream::new(rx).map(Ok))
}

fn sse_event(event_type: &str, data: Value) -> Event {
    let mut data = if data.is_object() { data } else { json!({}) };
    data["type"] = json!(event_type);
    Event::default().data(data.to_string())
}

async fn send(tx: &mpsc::Sender<Event>, event: Event) {
    let _ = tx.send(event).await;
}

async fn stream_error(tx: &mpsc::Sender<Event>, message: &str) {
    send(tx, sse_event("stream", json!({"content": format!("Error: {message}")}))).await;
    send(tx, sse_event("end", json!({}))).await;
}

async fn pipeline_chat(
    state: Arc<ServerState>,
    req: ChatRequest,
    raw: Value,
    tx: mpsc::Sender<Event>,
) {
    let start = Instant::now();
    let start_ms = now_ms();

    let rp: RuntimePipeline = match serde_json::from_value(raw) {
        Ok(rp) => rp,
        Err(_) => {
            stream_error(&tx, "invalid pipeline config").await;
            return;
        }
    };

    let pipeline = match build_pipeline(&rp) {
        Ok(p) => p,
        Err(e) => {
            stream_error(&tx, &e.to_string()).await;
            return;
        }
    };

    let default_model = match state.model_name(&req.model_id) {
        name if name.is_empty() => "gpt-4".to_string(),
        name => name,
    };

    let mut cfg = EngineConfig::new(state.client.clone() as Arc<dyn gantry_llm::ChatClient>);
    cfg.registry = Some(Arc::clone(&state.registry));
    cfg.resolver = Some(ModelResolver::new(ModelConfig::new(default_model)));
    let engine = Engine::new(pipeline, cfg);

    // Outer per-run deadline; the token interrupts every suspension point.
    let cancel = CancellationToken::new();
    let deadline = cancel.clone();
    let timer = tokio::spawn(async move {
        tokio::time::sleep(RUN_TIMEOUT).await;
        deadline.cancel();
    });

    let result = engine.run(&cancel, &req.message).await;
    timer.abort();

    let elapsed_ms = start.elapsed().as_millis() as i64;
    let total_in: i64 = result.outputs.values().map(|o| o.tokens_in as i64).sum();
    let total_out: i64 = result.outputs.values().map(|o| o.tokens_out as i64).sum();
    let total_tools: i64 = result.spans.iter().map(|s| s.tool_call_count as i64).sum();

    let pipeline_name = if rp.name.is_empty() { rp.id.clone() } else { rp.name.clone() };
    let trace_id = Uuid::new_v4().to_string();

    if result.success {
        let metadata = Metadata {
            input_tokens: total_in,
            output_tokens: total_out,
            elapsed_ms,
            tokens_per_sec: None,
        };
        send(&tx, sse_event("stream", json!({"content": result.content}))).await;
        send(&tx, sse_event("end", json!({"metadata": metadata}))).await;
    } else {
        let message =
            result.error.as_ref().map(|e| e.to_string()).unwrap_or_else(|| "run failed".into());
        stream_error(&tx, &message).await;
    }

    let (status, output) = if result.success {
        ("success", result.content.clone())
    } else {
        let message =
            result.error.as_ref().map(|e| e.to_string()).unwrap_or_else(|| "run failed".into());
        ("error", format!("Error: {message}"))
    };

    record_trace(
        &state,
        TraceInfo {
            trace_id: trace_id.clone(),
            pipeline_id: rp.id,
            pipeline_name,
            timestamp: start_ms,
            input: req.message,
            output,
            total_elapsed_ms: elapsed_ms,
            total_input_tokens: total_in,
            total_output_tokens: total_out,
            total_tool_calls: total_tools,
            status: status.into(),
            spans: convert_spans(&trace_id, result.spans),
        },
    )
    .await;
}

async fn direct_chat(state: Arc<ServerState>, req: ChatRequest, tx: mpsc::Sender<Event>) {
    let start = Instant::now();
    let start_ms = now_ms();

    info!("╔══════════════════════════════════════════════════════════════");
    info!("║ DIRECT CHAT");
    info!("║ Input: {}...", req.message.chars().take(50).collect::<String>());
    info!("╠══════════════════════════════════════════════════════════════");

    let model = match state.model_name(&req.model_id) {
        name if name.is_empty() => "gpt-4".to_string(),
        name => name,
    };

    let system = if req.system_prompt.is_empty() {
        DEFAULT_SYSTEM_PROMPT.to_string()
    } else {
        req.system_prompt.clone()
    };

    let mut messages: Vec<Message> = Vec::with_capacity(req.history.len() + 1);
    for h in &req.history {
        messages.push(match h.role.as_str() {
            "assistant" => Message::assistant(&h.content),
            "system" => Message::system(&h.content),
            _ => Message::user(&h.content),
        });
    }
    messages.push(Message::user(&req.message));

    let stream = match state.client.chat_stream_with_messages(&model, &system, &messages).await {
        Ok(s) => s,
        Err(e) => {
            stream_error(&tx, &e.to_string()).await;
            record_direct_trace(&state, &req.message, &format!("Error: {e}"), start_ms, start, Usage::default(), "error")
                .await;
            return;
        }
    };

    let mut full_content = String::new();
    let mut usage = Usage::default();

    let consumed = tokio::time::timeout(RUN_TIMEOUT, async {
        let mut stream = stream;
        while let Some(chunk) = stream.next().await {
            if let Some(err) = chunk.error {
                send(&tx, sse_event("stream", json!({"content": format!("Error: {err}")}))).await;
                break;
            }
            if let Some(content) = chunk.content {
                if !content.is_empty() {
                    full_content.push_str(&content);
                    send(&tx, sse_event("stream", json!({"content": content}))).await;
                }
            }
            if let Some(u) = chunk.usage {
                usage = u;
            }
            if chunk.done {
                break;
            }
        }
    })
    .await;

    if consumed.is_err() {
        send(&tx, sse_event("stream", json!({"content": "Error: operation timed out"}))).await;
    }

    let elapsed = start.elapsed();
    info!("║     ✓ Completed in {:?}", elapsed);
    info!(
        "║     ← Response: {} chars, {}/{} tokens",
        full_content.len(),
        usage.prompt_tokens,
        usage.completion_tokens
    );
    info!("╚══════════════════════════════════════════════════════════════");

    let secs = elapsed.as_secs_f64();
    let tokens_per_sec = (usage.completion_tokens > 0 && secs > 0.0)
        .then(|| usage.completion_tokens as f64 / secs);

    let metadata = Metadata {
        input_tokens: usage.prompt_tokens as i64,
        output_tokens: usage.completion_tokens as i64,
        elapsed_ms: elapsed.as_millis() as i64,
        tokens_per_sec,
    };
    send(&tx, sse_event("end", json!({"metadata": metadata}))).await;

    record_direct_trace(&state, &req.message, &full_content, start_ms, start, usage, "success")
        .await;
}

async fn record_direct_trace(
    state: &ServerState,
    input: &str,
    output: &str,
    start_ms: i64,
    start: Instant,
    usage: Usage,
    status: &str,
) {
    record_trace(
        state,
        TraceInfo {
            trace_id: Uuid::new_v4().to_string(),
            pipeline_id: "direct".into(),
            pipeline_name: "Direct Chat".into(),
            timestamp: start_ms,
            input: input.to_string(),
            output: output.to_string(),
            total_elapsed_ms: start.elapsed().as_millis() as i64,
            total_input_tokens: usage.prompt_tokens as i64,
            total_output_tokens: usage.completion_tokens as i64,
            total_tool_calls: 0,
            status: status.into(),
            spans: Vec::new(),
        },
    )
    .await;
}

async fn record_trace(state: &ServerState, trace: TraceInfo) {
    if let Err(e) = state.trace_store.add(trace).await {
        error!("failed to record trace: {}", e);
    }
}

fn convert_spans(trace_id: &str, spans: Vec<Span>) -> Vec<SpanInfo> {
    spans
        .into_iter()
        .map(|s| SpanInfo {
            span_id: s.span_id,
            trace_id: trace_id.to_string(),
            node_id: s.node_id,
            node_type: s.node_type,
            start_time: s.start_time,
            end_time: s.end_time,
            input: s.input,
            output: s.output,
            input_tokens: s.tokens_in as i64,
            output_tokens: s.tokens_out as i64,
            tool_call_count: s.tool_call_count as i64,
            iteration_count: s.iteration_count as i64,
        })
        .collect()
}

/// Converts the editor's runtime pipeline into an engine config,
/// rejecting unknown node types.
pub fn build_pipeline(rp: &RuntimePipeline) -> Result<PipelineConfig, AgentError> {
    let id = if rp.id.is_empty() { "runtime" } else { rp.id.as_str() };
    let name = if rp.name.is_empty() { "Runtime Pipeline" } else { rp.name.as_str() };
    let mut cfg = PipelineConfig::new(id, name);

    for n in &rp.nodes {
        let Some(node_type) = NodeType::parse(&n.node_type) else {
            return Err(AgentError::for_node(
                "server.pipeline",
                &n.id,
                ErrorKind::InvalidConfig(format!("unknown node type: {}", n.node_type)),
            ));
        };

        let mut node = gantry_config::NodeConfig::new(&n.id, node_type);
        if let Some(prompt) = &n.prompt {
            node.prompt = prompt.clone();
        }
        if let Some(model) = &n.model {
            node.model = ModelConfig::new(model);
        }
        node.tools = n.tools.clone();
        if let Some(max_iter) = n.max_iter {
            node.max_iter = max_iter;
        }
        cfg.add_node(node);
    }

    for e in &rp.edges {
        let from = RuntimeEdge::endpoint_node(&e.from).unwrap_or_default();
        let to = RuntimeEdge::endpoint_node(&e.to).unwrap_or_default();
        if from.is_empty() || to.is_empty() {
            continue;
        }
        cfg.add_edge(from, to);
    }

    Ok(cfg)
}

fn now_ms() -> i64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis() as i64).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runtime_pipeline_decodes_both_endpoint_shapes() {
        let rp: RuntimePipeline = serde_json::from_value(json!({
            "id": "p",
            "name": "P",
            "nodes": [
                {"id": "a", "type": "llm", "prompt": "hi"},
                {"id": "w", "type": "worker", "tools": ["fetch_url"], "max_iter": 4}
            ],
            "edges": [
                {"from": "input", "to": "a"},
                {"from": {"node": "a"}, "to": {"node": "w"}}
            ]
        }))
        .unwrap();

        let cfg = build_pipeline(&rp).unwrap();
        assert_eq!(cfg.nodes.len(), 2);
        assert_eq!(cfg.nodes[1].max_iter, 4);
        assert_eq!(cfg.edges.len(), 2);
        assert_eq!(cfg.edges[1].from.node, "a");
        assert_eq!(cfg.edges[1].to.node, "w");
    }

    #[test]
    fn unknown_node_type_is_rejected() {
        let rp: RuntimePipeline = serde_json::from_value(json!({
            "nodes": [{"id": "x", "type": "quantum"}],
            "edges": []
        }))
        .unwrap();

        let err = build_pipeline(&rp).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::InvalidConfig(_)));
        assert_eq!(err.node_id(), Some("x"));
    }

    #[test]
    fn sse_events_carry_type_tag() {
        let event = sse_event("stream", json!({"content": "hi"}));
        let rendered = format!("{event:?}");
        assert!(rendered.contains("stream"));
    }
}
