//! Request and response shapes for the API surface.

use gantry_store::PipelineInfo;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A model the UI can pick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    pub id: String,
    pub name: String,
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
}

/// Bootstrap payload for the editor.
#[derive(Debug, Serialize)]
pub struct InitResponse {
    pub models: Vec<ModelInfo>,
    pub templates: Vec<PipelineInfo>,
    pub configs: Vec<PipelineInfo>,
}

/// A registered tool as shown to the UI.
#[derive(Debug, Serialize)]
pub struct ToolInfo {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub model_id: String,
    /// Raw pipeline description from the editor; absent or null means
    /// direct chat.
    #[serde(default, rename = "pipeline_config")]
    pub pipeline: Option<Value>,
    #[serde(default)]
    pub system_prompt: String,
    #[serde(default)]
    pub history: Vec<HistoryMessage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HistoryMessage {
    pub role: String,
    pub content: String,
}

/// Usage metadata carried on the final SSE event.
#[derive(Debug, Default, Serialize)]
pub struct Metadata {
    pub input_tokens: i64,
    pub output_tokens: i64,
    pub elapsed_ms: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens_per_sec: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct DeletePipelineRequest {
    pub id: String,
}

/// The pipeline shape the editor submits with a chat request.
#[derive(Debug, Deserialize)]
pub struct RuntimePipeline {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub nodes: Vec<RuntimeNode>,
    #[serde(default)]
    pub edges: Vec<RuntimeEdge>,
}

#[derive(Debug, Deserialize)]
pub struct RuntimeNode {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub tools: Vec<String>,
    #[serde(default)]
    pub max_iter: Option<u32>,
}

/// Edge endpoints arrive either as bare node ids or `{node, port}`
/// objects.
#[derive(Debug, Deserialize)]
pub struct RuntimeEdge {
    pub from: Value,
    pub to: Value,
}

impl RuntimeEdge {
    pub fn endpoint_node(value: &Value) -> Option<String> {
        match value {
            Value::String(s) => Some(s.clone()),
            Value::Object(map) => map.get("node").and_then(|v| v.as_str()).map(String::from),
            _ => None,
        }
    }
}
