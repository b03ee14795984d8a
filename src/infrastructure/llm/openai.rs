//! Model adapter for OpenAI-compatible chat completion APIs
//!
//! Works with any backend exposing `/v1/chat/completions` with SSE streaming
//! (OpenAI, vLLM, Ollama, LiteLLM and similar).

use async_trait::async_trait;
use eventsource_stream::{EventStreamError, Eventsource};
use futures::StreamExt;
use serde::{Deserialize, Serialize};

use super::http_client::HttpClientTrait;
use crate::domain::{
    DomainError, FinishReason, LlmRequest, LlmStream, Message, ModelAdapter, ModelProfile,
    StreamChunk, Usage,
};

const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com";

/// OpenAI-compatible model adapter
#[derive(Debug)]
pub struct OpenAiAdapter<C: HttpClientTrait> {
    client: C,
    profile: ModelProfile,
    auth_header: Option<String>,
    base_url: String,
}

impl<C: HttpClientTrait> OpenAiAdapter<C> {
    pub fn new(client: C, profile: ModelProfile, api_key: Option<String>) -> Self {
        Self::with_base_url(client, profile, api_key, DEFAULT_OPENAI_BASE_URL)
    }

    pub fn with_base_url(
        client: C,
        profile: ModelProfile,
        api_key: Option<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            client,
            profile,
            auth_header: api_key.map(|key| format!("Bearer {}", key)),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn chat_completions_url(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url)
    }

    fn headers(&self) -> Vec<(&str, &str)> {
        let mut headers = vec![
            ("Content-Type", "application/json"),
            ("Accept", "text/event-stream"),
        ];
        if let Some(ref auth) = self.auth_header {
            headers.push(("Authorization", auth.as_str()));
        }
        headers
    }

    fn build_request(&self, request: &LlmRequest) -> serde_json::Value {
        let messages: Vec<WireMessage<'_>> = request.messages.iter().map(WireMessage::from).collect();

        let mut body = serde_json::json!({
            "model": self.profile.model,
            "messages": messages,
            "stream": true,
            "stream_options": {"include_usage": true},
        });

        if let Some(temp) = request.temperature {
            body["temperature"] = serde_json::json!(temp);
        }

        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }

        if let Some(top_p) = request.top_p {
            body["top_p"] = serde_json::json!(top_p);
        }

        if let Some(ref stop) = request.stop {
            body["stop"] = serde_json::json!(stop);
        }

        body
    }
}

#[async_trait]
impl<C: HttpClientTrait + 'static> ModelAdapter for OpenAiAdapter<C> {
    fn profile(&self) -> &ModelProfile {
        &self.profile
    }

    async fn invoke(&self, request: &LlmRequest) -> Result<LlmStream, DomainError> {
        let body = self.build_request(request);
        let byte_stream = self
            .client
            .post_json_stream(&self.chat_completions_url(), self.headers(), &body)
            .await
            .map_err(|e| with_provider(e, &self.profile.provider))?;

        let model = self.profile.model.clone();
        let provider = self.profile.provider.clone();

        let chunks = byte_stream.eventsource().filter_map(move |result| {
            let item = match result {
                Ok(event) => decode_event(&event.data, &model, &provider),
                Err(EventStreamError::Transport(e)) => Some(Err(e)),
                Err(e) => Some(Err(DomainError::provider(
                    provider.clone(),
                    format!("SSE stream error: {}", e),
                ))),
            };
            futures::future::ready(item)
        });

        Ok(Box::pin(chunks))
    }
}

fn with_provider(error: DomainError, provider: &str) -> DomainError {
    match error {
        DomainError::Provider { message, .. } => DomainError::provider(provider, message),
        other => other,
    }
}

/// Map one SSE `data` payload to a chunk. `[DONE]` and keep-alive events
/// carry nothing and yield `None`.
fn decode_event(
    data: &str,
    model: &str,
    provider: &str,
) -> Option<Result<StreamChunk, DomainError>> {
    let data = data.trim();
    if data.is_empty() || data == "[DONE]" {
        return None;
    }

    let chunk: WireStreamChunk = match serde_json::from_str(data) {
        Ok(chunk) => chunk,
        Err(e) => {
            return Some(Err(DomainError::provider(
                provider,
                format!("Malformed stream event: {}", e),
            )));
        }
    };

    if let Some(error) = chunk.error {
        return Some(Err(DomainError::provider(provider, error.message)));
    }

    let mut stream_chunk = StreamChunk::new(
        chunk.id.unwrap_or_default(),
        chunk.model.unwrap_or_else(|| model.to_string()),
    );

    if let Some(usage) = chunk.usage {
        stream_chunk =
            stream_chunk.with_usage(Usage::new(usage.prompt_tokens, usage.completion_tokens));
    }

    if let Some(choice) = chunk.choices.into_iter().next() {
        if let Some(delta) = choice.delta.and_then(|d| d.content) {
            stream_chunk = stream_chunk.with_delta(delta);
        }

        if let Some(reason) = choice.finish_reason {
            stream_chunk = stream_chunk.with_finish_reason(parse_finish_reason(&reason));
        }
    }

    if stream_chunk.delta.is_none()
        && stream_chunk.finish_reason.is_none()
        && stream_chunk.usage.is_none()
    {
        return None;
    }

    Some(Ok(stream_chunk))
}

fn parse_finish_reason(reason: &str) -> FinishReason {
    match reason {
        "stop" => FinishReason::Stop,
        "length" => FinishReason::Length,
        "content_filter" => FinishReason::ContentFilter,
        "tool_calls" | "function_call" => FinishReason::ToolCalls,
        _ => FinishReason::Stop,
    }
}

// OpenAI wire types

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

impl<'a> From<&'a Message> for WireMessage<'a> {
    fn from(message: &'a Message) -> Self {
        let role = match message.role {
            crate::domain::MessageRole::System => "system",
            crate::domain::MessageRole::User => "user",
            crate::domain::MessageRole::Assistant => "assistant",
        };

        Self {
            role,
            content: &message.content,
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireStreamChunk {
    id: Option<String>,
    model: Option<String>,
    #[serde(default)]
    choices: Vec<WireStreamChoice>,
    usage: Option<WireUsage>,
    error: Option<WireError>,
}

#[derive(Debug, Deserialize)]
struct WireStreamChoice {
    delta: Option<WireDelta>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireDelta {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct WireError {
    message: String,
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use futures::TryStreamExt;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use bytes::Bytes;

    use super::*;
    use crate::domain::ComplexityTier;
    use crate::infrastructure::llm::http_client::mock::MockHttpClient;
    use crate::infrastructure::llm::HttpClient;

    const TEST_URL: &str = "https://api.openai.com/v1/chat/completions";

    fn profile() -> ModelProfile {
        ModelProfile::new("openai", "gpt-4o-mini", ComplexityTier::Simple)
    }

    fn sse_body() -> String {
        [
            r#"data: {"id":"c1","model":"gpt-4o-mini","choices":[{"delta":{"role":"assistant"},"finish_reason":null}]}"#,
            r#"data: {"id":"c1","model":"gpt-4o-mini","choices":[{"delta":{"content":"Hello"},"finish_reason":null}]}"#,
            r#"data: {"id":"c1","model":"gpt-4o-mini","choices":[{"delta":{"content":" there"},"finish_reason":null}]}"#,
            r#"data: {"id":"c1","model":"gpt-4o-mini","choices":[{"delta":{},"finish_reason":"stop"}]}"#,
            r#"data: {"id":"c1","model":"gpt-4o-mini","choices":[],"usage":{"prompt_tokens":5,"completion_tokens":2,"total_tokens":7}}"#,
            "data: [DONE]",
            "",
        ]
        .join("\n\n")
    }

    #[tokio::test]
    async fn test_stream_is_decoded_across_split_chunks() {
        let body = sse_body();
        let (a, b) = body.split_at(body.len() / 2);
        let client = MockHttpClient::new().with_stream_response(
            TEST_URL,
            vec![Bytes::from(a.to_string()), Bytes::from(b.to_string())],
        );
        let adapter = OpenAiAdapter::new(client, profile(), Some("key".into()));

        let stream = adapter
            .invoke(&LlmRequest::builder().user("Hi").build())
            .await
            .unwrap();
        let chunks: Vec<StreamChunk> = stream.try_collect().await.unwrap();

        let text: String = chunks.iter().filter_map(|c| c.delta.clone()).collect();
        assert_eq!(text, "Hello there");
        assert_eq!(
            chunks.iter().filter(|c| c.finish_reason.is_some()).count(),
            1
        );
        assert_eq!(
            chunks.iter().find_map(|c| c.usage.clone()),
            Some(Usage::new(5, 2))
        );
    }

    #[tokio::test]
    async fn test_multibyte_character_split_across_reads() {
        let body = "data: {\"id\":\"c1\",\"choices\":[{\"delta\":{\"content\":\"caf\u{e9}\"},\"finish_reason\":null}]}\n\ndata: [DONE]\n\n";
        let bytes = body.as_bytes();
        let split = body.find('\u{e9}').unwrap() + 1;
        let client = MockHttpClient::new().with_stream_response(
            TEST_URL,
            vec![
                Bytes::copy_from_slice(&bytes[..split]),
                Bytes::copy_from_slice(&bytes[split..]),
            ],
        );
        let adapter = OpenAiAdapter::new(client, profile(), None);

        let stream = adapter
            .invoke(&LlmRequest::builder().user("Coffee?").build())
            .await
            .unwrap();
        let chunks: Vec<StreamChunk> = stream.try_collect().await.unwrap();
        let text: String = chunks.iter().filter_map(|c| c.delta.clone()).collect();

        assert_eq!(text, "caf\u{e9}");
    }

    #[tokio::test]
    async fn test_done_marker_alone_yields_no_chunks() {
        let client = MockHttpClient::new()
            .with_stream_response(TEST_URL, vec![Bytes::from_static(b"data: [DONE]\n\n")]);
        let adapter = OpenAiAdapter::new(client, profile(), None);

        let stream = adapter
            .invoke(&LlmRequest::builder().user("Hi").build())
            .await
            .unwrap();
        let chunks: Vec<StreamChunk> = stream.try_collect().await.unwrap();

        assert!(chunks.is_empty());
    }

    #[tokio::test]
    async fn test_request_body() {
        let client = MockHttpClient::new().with_stream_response(TEST_URL, vec![]);
        let adapter = OpenAiAdapter::new(client, profile(), None);
        let request = LlmRequest::builder()
            .system("Be brief")
            .user("Hi")
            .temperature(0.2)
            .max_tokens(64)
            .build();

        adapter.invoke(&request).await.unwrap();

        let body = &adapter.client.requests()[0];
        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["stream"], true);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "Hi");
        assert_eq!(body["max_tokens"], 64);
    }

    #[tokio::test]
    async fn test_error_event_becomes_provider_error() {
        let client = MockHttpClient::new().with_stream_response(
            TEST_URL,
            vec![Bytes::from_static(
                b"data: {\"error\":{\"message\":\"overloaded\"}}\n\n",
            )],
        );
        let adapter = OpenAiAdapter::new(client, profile(), None);

        let stream = adapter
            .invoke(&LlmRequest::builder().user("Hi").build())
            .await
            .unwrap();
        let result: Result<Vec<StreamChunk>, DomainError> = stream.try_collect().await;

        assert!(matches!(result, Err(DomainError::Provider { .. })));
    }

    #[tokio::test]
    async fn test_invoke_against_http_server() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer secret"))
            .and(body_partial_json(serde_json::json!({"model": "gpt-4o-mini"})))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string(sse_body()),
            )
            .mount(&server)
            .await;

        let client = HttpClient::new("openai", Duration::from_secs(1)).unwrap();
        let adapter =
            OpenAiAdapter::with_base_url(client, profile(), Some("secret".into()), server.uri());

        let stream = adapter
            .invoke(&LlmRequest::builder().user("Hi").build())
            .await
            .unwrap();
        let chunks: Vec<StreamChunk> = stream.try_collect().await.unwrap();
        let text: String = chunks.iter().filter_map(|c| c.delta.clone()).collect();

        assert_eq!(text, "Hello there");
    }

    #[tokio::test]
    async fn test_http_failure_reports_profile_provider() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let client = HttpClient::new("http", Duration::from_secs(1)).unwrap();
        let adapter = OpenAiAdapter::with_base_url(client, profile(), None, server.uri());

        let result = adapter
            .invoke(&LlmRequest::builder().user("Hi").build())
            .await;

        match result {
            Err(DomainError::Provider { provider, .. }) => assert_eq!(provider, "openai"),
            Err(other) => panic!("unexpected error: {}", other),
            Ok(_) => panic!("expected failure"),
        }
    }

    #[test]
    fn test_parse_finish_reason() {
        assert_eq!(parse_finish_reason("length"), FinishReason::Length);
        assert_eq!(parse_finish_reason("function_call"), FinishReason::ToolCalls);
        assert_eq!(parse_finish_reason("unknown"), FinishReason::Stop);
    }
}
