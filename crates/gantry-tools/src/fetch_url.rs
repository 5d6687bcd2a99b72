use std::time::Duration;

use async_trait::async_trait;
use gantry_core::{AgentError, ErrorKind};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::Tool;

const MAX_BODY_BYTES: usize = 1 << 20;

/// Fetches a URL and returns the response body, capped at 1 MiB.
pub struct FetchUrl {
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct FetchUrlArgs {
    url: String,
    #[serde(default)]
    timeout: u64,
}

impl FetchUrl {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
        }
    }
}

impl Default for FetchUrl {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for FetchUrl {
    fn name(&self) -> &str {
        "fetch_url"
    }

    fn description(&self) -> &str {
        "Fetches content from a URL and returns the response body"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "url": {
                    "type": "string",
                    "description": "The URL to fetch"
                },
                "timeout": {
                    "type": "integer",
                    "description": "Timeout in seconds (default: 30)"
                }
            },
            "required": ["url"]
        })
    }

    async fn execute(&self, args: Value) -> Result<String, AgentError> {
        let params: FetchUrlArgs = serde_json::from_value(args).map_err(|e| {
            AgentError::new("tool.fetch_url", ErrorKind::InvalidConfig(format!("invalid arguments: {e}")))
        })?;

        let request = self.client.get(&params.url);
        let request = if params.timeout > 0 {
            request.timeout(Duration::from_secs(params.timeout))
        } else {
            request
        };

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                AgentError::new("tool.fetch_url", ErrorKind::Timeout)
            } else {
                AgentError::new(
                    "tool.fetch_url",
                    ErrorKind::ExecutionFailed(format!("failed to fetch URL: {e}")),
                )
            }
        })?;

        let body = response.bytes().await.map_err(|e| {
            AgentError::new(
                "tool.fetch_url",
                ErrorKind::ExecutionFailed(format!("failed to read response: {e}")),
            )
        })?;

        let truncated = &body[..body.len().min(MAX_BODY_BYTES)];
        Ok(String::from_utf8_lossy(truncated).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fetches_body() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/page")
            .with_status(200)
            .with_body("hello world")
            .create_async()
            .await;

        let tool = FetchUrl::new();
        let url = format!("{}/page", server.url());
        let out = tool.execute(json!({"url": url})).await.unwrap();
        assert_eq!(out, "hello world");
    }

    #[tokio::test]
    async fn rejects_malformed_arguments() {
        let tool = FetchUrl::new();
        let err = tool.execute(json!({"timeout": 5})).await.unwrap_err();
        assert!(matches!(err.kind, ErrorKind::InvalidConfig(_)));
    }
}
