use async_trait::async_trait;
use gantry_core::{AgentError, ErrorKind};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::Tool;

/// Web search over a configured search API.
///
/// Without an API key and endpoint the tool stays registered but reports
/// itself unconfigured on invocation; with them it returns placeholder
/// results until a concrete search backend is wired in.
pub struct WebSearch {
    api_key: String,
    endpoint: String,
}

#[derive(Deserialize)]
struct WebSearchArgs {
    query: String,
    #[serde(default)]
    num_results: u32,
}

#[derive(Serialize)]
struct WebSearchResult {
    title: String,
    url: String,
    snippet: String,
}

impl WebSearch {
    pub fn new(api_key: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self { api_key: api_key.into(), endpoint: endpoint.into() }
    }

    pub fn unconfigured() -> Self {
        Self::new("", "")
    }
}

#[async_trait]
impl Tool for WebSearch {
    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "Searches the web and returns relevant results"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The search query"
                },
                "num_results": {
                    "type": "integer",
                    "description": "Number of results to return (default: 5)"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, args: Value) -> Result<String, AgentError> {
        let params: WebSearchArgs = serde_json::from_value(args).map_err(|e| {
            AgentError::new("tool.web_search", ErrorKind::InvalidConfig(format!("invalid arguments: {e}")))
        })?;

        if self.api_key.is_empty() || self.endpoint.is_empty() {
            return Err(AgentError::new(
                "tool.web_search",
                ErrorKind::ExecutionFailed(
                    "web search not configured: missing API key or endpoint".into(),
                ),
            ));
        }

        let _num_results = if params.num_results == 0 { 5 } else { params.num_results };

        let results = vec![WebSearchResult {
            title: format!("Search result for: {}", params.query),
            url: "https://example.com".into(),
            snippet: "This is a placeholder search result. Configure a real search API for actual results."
                .into(),
        }];

        serde_json::to_string(&results).map_err(|e| {
            AgentError::new(
                "tool.web_search",
                ErrorKind::ExecutionFailed(format!("failed to marshal results: {e}")),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unconfigured_search_errors() {
        let tool = WebSearch::unconfigured();
        let err = tool.execute(json!({"query": "rust"})).await.unwrap_err();
        assert!(err.to_string().contains("not configured"));
    }

    #[tokio::test]
    async fn configured_search_returns_results() {
        let tool = WebSearch::new("key", "https://search.example.com");
        let out = tool.execute(json!({"query": "rust"})).await.unwrap();
        assert!(out.contains("Search result for: rust"));
    }
}
