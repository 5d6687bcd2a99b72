//! Handler tests against in-memory stores.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use gantry_llm::{UnifiedClient, UnifiedConfig};
use gantry_server::handlers;
use gantry_server::ServerState;
use gantry_store::{in_memory_stores, NodeInfo, PipelineInfo, SpanInfo, TraceInfo};
use gantry_tools::Registry;
use gantry_vector::MemoryStore;

fn test_state() -> Arc<ServerState> {
    let (trace_store, pipeline_store) = in_memory_stores().unwrap();
    Arc::new(ServerState {
        client: Arc::new(UnifiedClient::new(UnifiedConfig::default())),
        registry: Arc::new(Registry::new()),
        models: Vec::new(),
        templates: Vec::new(),
        trace_store,
        pipeline_store,
        vector_store: Arc::new(MemoryStore::new()),
    })
}

fn pipeline(id: &str, name: &str) -> PipelineInfo {
    PipelineInfo {
        id: id.into(),
        name: name.into(),
        description: String::new(),
        nodes: vec![NodeInfo {
            id: "assistant".into(),
            node_type: "llm".into(),
            model: None,
            prompt: Some("You are helpful.".into()),
            tools: vec![],
            x: None,
            y: None,
        }],
        edges: vec![],
        layout: Default::default(),
    }
}

fn trace(id: &str, timestamp: i64) -> TraceInfo {
    TraceInfo {
        trace_id: id.into(),
        pipeline_id: "p".into(),
        pipeline_name: "P".into(),
        timestamp,
        input: "in".into(),
        output: "out".into(),
        total_elapsed_ms: 10,
        total_input_tokens: 1,
        total_output_tokens: 2,
        total_tool_calls: 0,
        status: "success".into(),
        spans: vec![SpanInfo {
            span_id: "span_1".into(),
            trace_id: id.into(),
            node_id: "assistant".into(),
            node_type: "llm".into(),
            start_time: timestamp,
            end_time: timestamp + 10,
            input: "in".into(),
            output: "out".into(),
            input_tokens: 1,
            output_tokens: 2,
            tool_call_count: 0,
            iteration_count: 1,
        }],
    }
}

#[tokio::test]
async fn pipeline_save_list_delete() {
    let state = test_state();

    let Json(saved) =
        handlers::pipelines::save(State(state.clone()), Json(pipeline("p1", "Alpha")))
            .await
            .unwrap();
    assert_eq!(saved["success"], true);
    assert_eq!(saved["id"], "p1");

    let Json(listed) = handlers::pipelines::list(State(state.clone())).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].name, "Alpha");

    let Json(deleted) = handlers::pipelines::delete(
        State(state.clone()),
        Json(serde_json::from_value(serde_json::json!({"id": "p1"})).unwrap()),
    )
    .await
    .unwrap();
    assert_eq!(deleted["success"], true);

    let Json(listed) = handlers::pipelines::list(State(state)).await.unwrap();
    assert!(listed.is_empty());
}

#[tokio::test]
async fn trace_detail_carries_spans() {
    let state = test_state();
    state.trace_store.add(trace("t1", 100)).await.unwrap();

    let Json(detail) =
        handlers::traces::get(State(state.clone()), Path("t1".to_string())).await.unwrap();
    assert_eq!(detail.trace.trace_id, "t1");
    assert_eq!(detail.spans.len(), 1);
    assert_eq!(detail.spans[0].node_id, "assistant");

    assert!(handlers::traces::get(State(state), Path("missing".to_string())).await.is_err());
}

#[tokio::test]
async fn metrics_summary_aggregates_traces() {
    let state = test_state();
    state.trace_store.add(trace("t1", 100)).await.unwrap();
    state.trace_store.add(trace("t2", 200)).await.unwrap();

    let Json(summary) = handlers::traces::metrics_summary(State(state)).await.unwrap();
    assert_eq!(summary.total_traces, 2);
    assert_eq!(summary.total_input_tokens, 2);
    assert_eq!(summary.total_output_tokens, 4);
}

#[tokio::test]
async fn init_reports_catalog_and_configs() {
    let state = test_state();
    state.pipeline_store.save(pipeline("p1", "Alpha")).await.unwrap();

    let Json(init) = handlers::init(State(state)).await.unwrap();
    assert_eq!(init.configs.len(), 1);
}
