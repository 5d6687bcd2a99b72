//! Wire-format and routing tests against mock provider servers.

use futures::StreamExt;
use gantry_core::{Message, ToolResult, ToolSchema};
use gantry_llm::{
    AnthropicClient, ChatClient, ClientConfig, EmbeddingClient, OllamaEmbedClient, OpenAiClient,
    UnifiedClient,
};
use serde_json::json;

fn openai_at(url: &str) -> OpenAiClient {
    OpenAiClient::with_config(ClientConfig::new("test-key").with_base_url(url))
}

fn anthropic_at(url: &str) -> AnthropicClient {
    AnthropicClient::with_config(ClientConfig::new("test-key").with_base_url(url))
}

fn echo_schema() -> ToolSchema {
    ToolSchema {
        name: "echo".into(),
        description: "Echoes its input".into(),
        parameters: json!({
            "type": "object",
            "properties": {"text": {"type": "string"}},
            "required": ["text"]
        }),
    }
}

#[tokio::test]
async fn openai_parses_content_and_usage() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/chat/completions")
        .match_header("authorization", "Bearer test-key")
        .with_status(200)
        .with_body(
            json!({
                "choices": [{
                    "message": {"role": "assistant", "content": "hello"},
                    "finish_reason": "stop"
                }],
                "usage": {"prompt_tokens": 2, "completion_tokens": 1, "total_tokens": 3}
            })
            .to_string(),
        )
        .create_async()
        .await;

    let client = openai_at(&server.url());
    let resp = client.chat("gpt-4", "Echo.", "hello").await.unwrap();

    mock.assert_async().await;
    assert_eq!(resp.content, "hello");
    assert_eq!(resp.finish_reason, "stop");
    assert_eq!(resp.usage.prompt_tokens, 2);
    assert_eq!(resp.usage.completion_tokens, 1);
    assert_eq!(resp.usage.total_tokens, 3);
}

#[tokio::test]
async fn openai_decodes_tool_calls_with_json_string_arguments() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/chat/completions")
        .with_status(200)
        .with_body(
            json!({
                "choices": [{
                    "message": {
                        "role": "assistant",
                        "content": null,
                        "tool_calls": [{
                            "id": "call_1",
                            "type": "function",
                            "function": {"name": "echo", "arguments": "{\"text\":\"x\"}"}
                        }]
                    },
                    "finish_reason": "tool_calls"
                }],
                "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
            })
            .to_string(),
        )
        .create_async()
        .await;

    let client = openai_at(&server.url());
    let msgs = [Message::user("run echo")];
    let resp = client
        .chat_with_tools("gpt-4", "Use tools.", &msgs, &[echo_schema()], &[])
        .await
        .unwrap();

    assert!(resp.has_tool_calls());
    assert_eq!(resp.tool_calls[0].id, "call_1");
    assert_eq!(resp.tool_calls[0].name, "echo");
    // Arguments arrive as a JSON string but surface as a document.
    assert_eq!(resp.tool_calls[0].arguments["text"], "x");
}

#[tokio::test]
async fn openai_empty_choices_is_empty_content_not_error() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/chat/completions")
        .with_status(200)
        .with_body(json!({"choices": [], "usage": {}}).to_string())
        .create_async()
        .await;

    let client = openai_at(&server.url());
    let resp = client.chat("gpt-4", "s", "u").await.unwrap();
    assert!(resp.content.is_empty());
}

#[tokio::test]
async fn openai_non_2xx_carries_status_and_body() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/chat/completions")
        .with_status(429)
        .with_body("rate limited")
        .create_async()
        .await;

    let client = openai_at(&server.url());
    let err = client.chat("gpt-4", "s", "u").await.unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("429"), "missing status in: {msg}");
    assert!(msg.contains("rate limited"), "missing body in: {msg}");
}

#[tokio::test]
async fn openai_streams_deltas_until_done() {
    let mut server = mockito::Server::new_async().await;
    let body = concat!(
        "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\n\n",
        "data: [DONE]\n\n",
    );
    let _mock = server
        .mock("POST", "/chat/completions")
        .with_status(200)
        .with_header("content-type", "text/event-stream")
        .with_body(body)
        .create_async()
        .await;

    let client = openai_at(&server.url());
    let msgs = [Message::user("hi")];
    let mut stream = client
        .chat_stream_with_messages("gpt-4", "s", &msgs)
        .await
        .unwrap();

    let mut content = String::new();
    let mut saw_done = false;
    while let Some(chunk) = stream.next().await {
        if let Some(text) = &chunk.content {
            content.push_str(text);
        }
        if chunk.done {
            saw_done = true;
            break;
        }
    }

    assert_eq!(content, "Hello");
    assert!(saw_done);
}

#[tokio::test]
async fn anthropic_sends_headers_and_merges_blocks() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/messages")
        .match_header("x-api-key", "test-key")
        .match_header("anthropic-version", "2023-06-01")
        .with_status(200)
        .with_body(
            json!({
                "content": [
                    {"type": "text", "text": "Let me look that up."},
                    {"type": "tool_use", "id": "toolu_1", "name": "echo", "input": {"text": "x"}}
                ],
                "stop_reason": "tool_use",
                "usage": {"input_tokens": 7, "output_tokens": 4}
            })
            .to_string(),
        )
        .create_async()
        .await;

    let client = anthropic_at(&server.url());
    let msgs = [Message::user("run echo")];
    let resp = client
        .chat_with_tools("claude-test", "Use tools.", &msgs, &[echo_schema()], &[])
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(resp.content, "Let me look that up.");
    assert_eq!(resp.tool_calls.len(), 1);
    assert_eq!(resp.tool_calls[0].arguments["text"], "x");
    assert_eq!(resp.finish_reason, "tool_use");
    // Providers reporting two of the three usage fields get a computed total.
    assert_eq!(resp.usage.total_tokens, 11);
}

#[tokio::test]
async fn anthropic_encodes_tool_results_as_user_blocks() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/messages")
        .match_body(mockito::Matcher::AllOf(vec![
            // System prompt is a top-level field, not a message.
            mockito::Matcher::PartialJson(json!({"system": "Use tools."})),
            mockito::Matcher::Regex(r#""type":"tool_result""#.to_string()),
            mockito::Matcher::Regex(r#""tool_use_id":"toolu_1""#.to_string()),
        ]))
        .with_status(200)
        .with_body(
            json!({
                "content": [{"type": "text", "text": "done"}],
                "stop_reason": "end_turn",
                "usage": {"input_tokens": 1, "output_tokens": 1}
            })
            .to_string(),
        )
        .create_async()
        .await;

    let client = anthropic_at(&server.url());
    let msgs = [Message::user("run echo"), Message::assistant("calling echo")];
    let pending = [ToolResult::ok("toolu_1", "x")];
    let resp = client
        .chat_with_tools("claude-test", "Use tools.", &msgs, &[], &pending)
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(resp.content, "done");
}

#[tokio::test]
async fn ollama_embed_returns_first_embedding() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/api/embed")
        .with_status(200)
        .with_body(json!({"embeddings": [[0.1, 0.2, 0.3]]}).to_string())
        .create_async()
        .await;

    let client = OllamaEmbedClient::new(&server.url());
    let resp = client.embed("nomic-embed-text", "hello").await.unwrap();
    assert_eq!(resp.embedding, vec![0.1, 0.2, 0.3]);
    assert_eq!(resp.token_count, 0);
}

#[tokio::test]
async fn unified_routes_claude_prefix_to_anthropic() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/messages")
        .with_status(200)
        .with_body(
            json!({
                "content": [{"type": "text", "text": "from claude"}],
                "stop_reason": "end_turn",
                "usage": {"input_tokens": 1, "output_tokens": 1}
            })
            .to_string(),
        )
        .create_async()
        .await;

    let unified = UnifiedClient::from_parts(None, Some(anthropic_at(&server.url())), None, None);
    let resp = unified.chat("claude-test", "s", "u").await.unwrap();

    mock.assert_async().await;
    assert_eq!(resp.content, "from claude");
}

#[tokio::test]
async fn unified_falls_back_when_prefixed_provider_absent() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/chat/completions")
        .with_status(200)
        .with_body(
            json!({
                "choices": [{"message": {"role": "assistant", "content": "fallback"}}],
                "usage": {}
            })
            .to_string(),
        )
        .create_async()
        .await;

    // claude- prefix with no Anthropic client: first available wins.
    let unified = UnifiedClient::from_parts(Some(openai_at(&server.url())), None, None, None);
    let resp = unified.chat("claude-test", "s", "u").await.unwrap();

    mock.assert_async().await;
    assert_eq!(resp.content, "fallback");
}

#[tokio::test]
async fn unified_strips_local_prefix_before_dispatch() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/chat/completions")
        .match_body(mockito::Matcher::PartialJson(json!({"model": "llama3.2"})))
        .with_status(200)
        .with_body(
            json!({
                "choices": [{"message": {"role": "assistant", "content": "local"}}],
                "usage": {}
            })
            .to_string(),
        )
        .create_async()
        .await;

    let unified = UnifiedClient::from_parts(None, None, Some(openai_at(&server.url())), None);
    let resp = unified.chat("ollama/llama3.2", "s", "u").await.unwrap();

    mock.assert_async().await;
    assert_eq!(resp.content, "local");
}

#[tokio::test]
async fn unified_synthesizes_single_chunk_stream_for_anthropic() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/messages")
        .with_status(200)
        .with_body(
            json!({
                "content": [{"type": "text", "text": "whole answer"}],
                "stop_reason": "end_turn",
                "usage": {"input_tokens": 3, "output_tokens": 2}
            })
            .to_string(),
        )
        .create_async()
        .await;

    let unified = UnifiedClient::from_parts(None, Some(anthropic_at(&server.url())), None, None);
    let msgs = [Message::user("hi")];
    let stream = unified
        .chat_stream_with_messages("claude-test", "s", &msgs)
        .await
        .unwrap();

    let chunks: Vec<_> = stream.collect().await;
    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[0].content.as_deref(), Some("whole answer"));
    assert!(!chunks[0].done);
    assert!(chunks[1].done);
    let usage = chunks[1].usage.expect("usage on final chunk");
    assert_eq!(usage.prompt_tokens, 3);
    assert_eq!(usage.completion_tokens, 2);
}

#[tokio::test]
async fn unified_routes_embedding_models_to_openai_path() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/embeddings")
        .with_status(200)
        .with_body(
            json!({
                "data": [{"embedding": [1.0, 0.0]}],
                "usage": {"prompt_tokens": 4, "total_tokens": 4}
            })
            .to_string(),
        )
        .create_async()
        .await;

    let unified = UnifiedClient::from_parts(Some(openai_at(&server.url())), None, None, None);
    let resp = unified.embed("text-embedding-3-small", "hello").await.unwrap();

    mock.assert_async().await;
    assert_eq!(resp.embedding, vec![1.0, 0.0]);
    assert_eq!(resp.token_count, 4);
}
