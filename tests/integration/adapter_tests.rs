//! Vendor adapters against a local mock server
//!
//! Checks the wire shape each vendor expects and how vendor failures are normalized.

#[cfg(test)]
mod tests {
    use futures::StreamExt;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use llm_relay::core::dispatcher::{BackoffConfig, DispatchPolicy, Dispatcher};
    use llm_relay::core::providers::anthropic::AnthropicAdapter;
    use llm_relay::core::providers::base::config::AdapterConfig;
    use llm_relay::core::providers::gemini::GeminiAdapter;
    use llm_relay::core::providers::meta_llama;
    use llm_relay::core::providers::openai::OpenAIAdapter;
    use llm_relay::core::traits::ProviderAdapter;
    use llm_relay::core::types::{
        ErrorKind, FinishReason, NormalizedRequest, RequestContext, ResponseChunk, Usage,
    };
    use llm_relay::{NormalizedError, ProviderRegistry};

    use crate::common::assertions::{ResponseAssertions, assert_kind};

    fn request() -> NormalizedRequest {
        NormalizedRequest::new("").system("Be brief.").user("hello")
    }

    fn sse(events: &[&str]) -> ResponseTemplate {
        let body: String = events.iter().map(|e| format!("{}\n\n", e)).collect();
        ResponseTemplate::new(200)
            .insert_header("content-type", "text/event-stream")
            .set_body_raw(body, "text/event-stream")
    }

    async fn initialized<A: ProviderAdapter>(mut adapter: A, config: AdapterConfig) -> A {
        adapter.initialize(config).await.unwrap();
        adapter
    }

    async fn openai(server: &MockServer) -> OpenAIAdapter {
        let config = AdapterConfig::new("sk-test")
            .with_base_url(format!("{}/v1", server.uri()))
            .with_default_model("gpt-4o-mini");
        initialized(OpenAIAdapter::new("openai"), config).await
    }

    async fn anthropic(server: &MockServer) -> AnthropicAdapter {
        let config = AdapterConfig::new("sk-ant-test")
            .with_base_url(server.uri())
            .with_default_model("claude-3-5-haiku-latest");
        initialized(AnthropicAdapter::new("anthropic"), config).await
    }

    async fn gemini(server: &MockServer) -> GeminiAdapter {
        let config = AdapterConfig::new("AIza-test")
            .with_base_url(format!("{}/v1beta", server.uri()))
            .with_default_model("gemini-1.5-flash");
        initialized(GeminiAdapter::new("gemini"), config).await
    }

    async fn drain(adapter: &dyn ProviderAdapter) -> (Vec<ResponseChunk>, Option<NormalizedError>) {
        let mut stream = adapter
            .execute_stream(&request().with_stream(true), &RequestContext::default())
            .await
            .unwrap();
        let mut chunks = Vec::new();
        while let Some(item) = stream.next().await {
            match item {
                Ok(chunk) => chunks.push(chunk),
                Err(error) => return (chunks, Some(error)),
            }
        }
        (chunks, None)
    }

    fn text(chunks: &[ResponseChunk]) -> String {
        chunks.iter().map(ResponseChunk::content).collect()
    }

    // ==================== OpenAI ====================

    /// Test OpenAI chat completion against a mock server
    #[tokio::test]
    async fn test_openai_chat_completion() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({
                "model": "gpt-4o-mini",
                "messages": [
                    {"role": "system", "content": "Be brief."},
                    {"role": "user", "content": "hello"}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "chatcmpl-1",
                "object": "chat.completion",
                "model": "gpt-4o-mini-2024-07-18",
                "choices": [{
                    "index": 0,
                    "message": {"role": "assistant", "content": "Hi there"},
                    "finish_reason": "stop"
                }],
                "usage": {"prompt_tokens": 9, "completion_tokens": 3, "total_tokens": 12}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let adapter = openai(&server).await;
        let response = adapter.execute(&request(), &RequestContext::default()).await.unwrap();

        response.assert_served_by("openai");
        response.assert_text("Hi there");
        assert_eq!(response.id, "chatcmpl-1");
        assert_eq!(response.finish_reason(), Some(FinishReason::Stop));
        assert_eq!(response.usage, Usage::new(9, 3));
    }

    /// Test OpenAI HTTP status to error kind mapping
    #[tokio::test]
    async fn test_openai_status_mapping() {
        let cases = [
            (401, json!({"error": {"message": "Incorrect API key", "code": "invalid_api_key"}}), ErrorKind::AuthError, false),
            (400, json!({"error": {"message": "bad", "type": "invalid_request_error"}}), ErrorKind::ValidationError, false),
            (500, json!({"error": {"message": "boom"}}), ErrorKind::Transient, true),
            (503, json!({}), ErrorKind::Transient, true),
        ];

        for (status, body, kind, retryable) in cases {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .respond_with(ResponseTemplate::new(status).set_body_json(body))
                .mount(&server)
                .await;

            let err = openai(&server)
                .await
                .execute(&request(), &RequestContext::default())
                .await
                .unwrap_err();

            assert_kind(&err, kind);
            assert_eq!(err.retryable, retryable, "status {}", status);
            assert_eq!(err.status, Some(status));
            assert_eq!(err.provider.as_ref().map(|p| p.as_str()), Some("openai"));
        }
    }

    /// Test rate limit responses keep the retry-after hint
    #[tokio::test]
    async fn test_openai_rate_limit_carries_retry_after() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(429)
                    .insert_header("retry-after", "2")
                    .set_body_json(json!({"error": {"message": "Rate limit reached", "type": "requests"}})),
            )
            .mount(&server)
            .await;

        let err = openai(&server)
            .await
            .execute(&request(), &RequestContext::default())
            .await
            .unwrap_err();

        assert_kind(&err, ErrorKind::RateLimited);
        assert!(err.is_retryable());
        assert_eq!(err.retry_after, Some(Duration::from_secs(2)));
    }

    /// Test exhausted quota is not retried
    #[tokio::test]
    async fn test_openai_exhausted_quota_is_not_retryable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_json(json!({
                "error": {"message": "You exceeded your current quota", "code": "insufficient_quota"}
            })))
            .mount(&server)
            .await;

        let err = openai(&server)
            .await
            .execute(&request(), &RequestContext::default())
            .await
            .unwrap_err();

        assert_kind(&err, ErrorKind::RateLimited);
        assert!(!err.is_retryable());
    }

    /// Test non-JSON success body
    #[tokio::test]
    async fn test_openai_malformed_body_is_protocol_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_raw("<html>gateway</html>", "text/html"))
            .mount(&server)
            .await;

        let err = openai(&server)
            .await
            .execute(&request(), &RequestContext::default())
            .await
            .unwrap_err();

        assert_kind(&err, ErrorKind::ProtocolError);
        assert!(!err.is_retryable());
    }

    /// Test OpenAI stream ends at the done marker
    #[tokio::test]
    async fn test_openai_stream_ends_at_done_marker() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(body_partial_json(json!({"stream": true})))
            .respond_with(sse(&[
                r#"data: {"id":"c1","model":"gpt-4o-mini","choices":[{"index":0,"delta":{"role":"assistant","content":"Hel"},"finish_reason":null}]}"#,
                r#"data: {"id":"c1","model":"gpt-4o-mini","choices":[{"index":0,"delta":{"content":"lo"},"finish_reason":"stop"}]}"#,
                "data: [DONE]",
            ]))
            .mount(&server)
            .await;

        let adapter = openai(&server).await;
        let (chunks, error) = drain(&adapter).await;

        assert!(error.is_none(), "unexpected error: {:?}", error);
        assert_eq!(text(&chunks), "Hello");
        assert_eq!(chunks.last().and_then(ResponseChunk::finish_reason), Some(FinishReason::Stop));
    }

    /// Test OpenAI stream cut off before the done marker
    #[tokio::test]
    async fn test_openai_stream_without_done_marker_is_protocol_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(sse(&[
                r#"data: {"id":"c1","model":"m","choices":[{"index":0,"delta":{"content":"cut"},"finish_reason":null}]}"#,
            ]))
            .mount(&server)
            .await;

        let adapter = openai(&server).await;
        let (chunks, error) = drain(&adapter).await;

        assert_eq!(text(&chunks), "cut");
        assert_kind(&error.unwrap(), ErrorKind::ProtocolError);
    }

    /// Test slow vendor response times out as transient
    #[tokio::test]
    async fn test_request_timeout_is_transient() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .mount(&server)
            .await;

        let config = AdapterConfig::new("sk-test")
            .with_base_url(format!("{}/v1", server.uri()))
            .with_default_model("gpt-4o-mini")
            .with_request_timeout(Duration::from_millis(50));
        let adapter = initialized(OpenAIAdapter::new("openai"), config).await;

        let err = adapter.execute(&request(), &RequestContext::default()).await.unwrap_err();
        assert_kind(&err, ErrorKind::Transient);
        assert!(err.is_retryable());
    }

    // ==================== Anthropic ====================

    /// Test Anthropic system prompt placement and auth headers
    #[tokio::test]
    async fn test_anthropic_system_prompt_and_headers() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(header("x-api-key", "sk-ant-test"))
            .and(header("anthropic-version", "2023-06-01"))
            .and(body_partial_json(json!({
                "model": "claude-3-5-haiku-latest",
                "system": "Be brief.",
                "messages": [{"role": "user", "content": [{"type": "text", "text": "hello"}]}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "msg_01",
                "type": "message",
                "role": "assistant",
                "model": "claude-3-5-haiku-20241022",
                "content": [{"type": "text", "text": "Hello!"}],
                "stop_reason": "end_turn",
                "usage": {"input_tokens": 12, "output_tokens": 4}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let adapter = anthropic(&server).await;
        let response = adapter.execute(&request(), &RequestContext::default()).await.unwrap();

        response.assert_text("Hello!");
        assert_eq!(response.usage, Usage::new(12, 4));
        assert_eq!(response.finish_reason(), Some(FinishReason::Stop));
    }

    /// Test Anthropic overloaded status
    #[tokio::test]
    async fn test_anthropic_overloaded_is_transient() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(529).set_body_json(json!({
                "type": "error",
                "error": {"type": "overloaded_error", "message": "Overloaded"}
            })))
            .mount(&server)
            .await;

        let err = anthropic(&server)
            .await
            .execute(&request(), &RequestContext::default())
            .await
            .unwrap_err();

        assert_kind(&err, ErrorKind::Transient);
        assert_eq!(err.status, Some(529));
    }

    /// Test Anthropic stream ends at message_stop
    #[tokio::test]
    async fn test_anthropic_stream_ends_at_message_stop() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(sse(&[
                "event: message_start\ndata: {\"type\":\"message_start\",\"message\":{\"id\":\"msg_1\",\"model\":\"claude-3-5-haiku-20241022\",\"usage\":{\"input_tokens\":7,\"output_tokens\":1}}}",
                "event: ping\ndata: {\"type\":\"ping\"}",
                "event: content_block_delta\ndata: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\"Hi\"}}",
                "event: content_block_delta\ndata: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\" there\"}}",
                "event: message_delta\ndata: {\"type\":\"message_delta\",\"delta\":{\"stop_reason\":\"end_turn\"},\"usage\":{\"output_tokens\":3}}",
                "event: message_stop\ndata: {\"type\":\"message_stop\"}",
            ]))
            .mount(&server)
            .await;

        let adapter = anthropic(&server).await;
        let (chunks, error) = drain(&adapter).await;

        assert!(error.is_none(), "unexpected error: {:?}", error);
        assert_eq!(text(&chunks), "Hi there");
        assert!(chunks.iter().all(|c| c.id == "msg_1"));
        let last = chunks.last().unwrap();
        assert_eq!(last.finish_reason(), Some(FinishReason::Stop));
        assert_eq!(last.usage, Some(Usage::new(7, 3)));
    }

    /// Test Anthropic error event inside a stream
    #[tokio::test]
    async fn test_anthropic_in_stream_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(sse(&[
                "event: message_start\ndata: {\"type\":\"message_start\",\"message\":{\"id\":\"msg_1\",\"model\":\"m\"}}",
                "event: error\ndata: {\"type\":\"error\",\"error\":{\"type\":\"overloaded_error\",\"message\":\"Overloaded\"}}",
            ]))
            .mount(&server)
            .await;

        let adapter = anthropic(&server).await;
        let (_, error) = drain(&adapter).await;

        let error = error.unwrap();
        assert_kind(&error, ErrorKind::Transient);
        assert_eq!(error.provider.as_ref().map(|p| p.as_str()), Some("anthropic"));
    }

    // ==================== Gemini ====================

    /// Test Gemini generateContent with a system instruction
    #[tokio::test]
    async fn test_gemini_generate_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-1.5-flash:generateContent"))
            .and(header("x-goog-api-key", "AIza-test"))
            .and(body_partial_json(json!({
                "systemInstruction": {"parts": [{"text": "Be brief."}]},
                "contents": [{"role": "user", "parts": [{"text": "hello"}]}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{
                    "content": {"role": "model", "parts": [{"text": "Hi!"}]},
                    "finishReason": "STOP",
                    "index": 0
                }],
                "usageMetadata": {"promptTokenCount": 6, "candidatesTokenCount": 2, "totalTokenCount": 8},
                "modelVersion": "gemini-1.5-flash-002",
                "responseId": "resp-1"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let adapter = gemini(&server).await;
        let response = adapter.execute(&request(), &RequestContext::default()).await.unwrap();

        response.assert_served_by("gemini");
        response.assert_text("Hi!");
        assert_eq!(response.id, "resp-1");
        assert_eq!(response.usage, Usage::new(6, 2));
    }

    /// Test Gemini invalid API key
    #[tokio::test]
    async fn test_gemini_invalid_key_is_auth_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": {
                    "code": 400,
                    "message": "API key not valid. Please pass a valid API key.",
                    "status": "INVALID_ARGUMENT",
                    "details": [{"@type": "type.googleapis.com/google.rpc.ErrorInfo", "reason": "API_KEY_INVALID"}]
                }
            })))
            .mount(&server)
            .await;

        let err = gemini(&server)
            .await
            .execute(&request(), &RequestContext::default())
            .await
            .unwrap_err();

        assert_kind(&err, ErrorKind::AuthError);
        assert_eq!(err.status, Some(400));
    }

    /// Test Gemini resource exhaustion
    #[tokio::test]
    async fn test_gemini_resource_exhausted_is_rate_limited() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_json(json!({
                "error": {"code": 429, "message": "Quota exceeded", "status": "RESOURCE_EXHAUSTED"}
            })))
            .mount(&server)
            .await;

        let err = gemini(&server)
            .await
            .execute(&request(), &RequestContext::default())
            .await
            .unwrap_err();

        assert_kind(&err, ErrorKind::RateLimited);
        assert!(err.is_retryable());
    }

    /// Test Gemini stream ends with the response body
    #[tokio::test]
    async fn test_gemini_stream_ends_with_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-1.5-flash:streamGenerateContent"))
            .respond_with(sse(&[
                r#"data: {"candidates":[{"content":{"role":"model","parts":[{"text":"Hel"}]},"index":0}],"responseId":"r1"}"#,
                r#"data: {"candidates":[{"content":{"role":"model","parts":[{"text":"lo"}]},"finishReason":"STOP","index":0}],"usageMetadata":{"promptTokenCount":4,"candidatesTokenCount":2}}"#,
            ]))
            .mount(&server)
            .await;

        let adapter = gemini(&server).await;
        let (chunks, error) = drain(&adapter).await;

        assert!(error.is_none(), "unexpected error: {:?}", error);
        assert_eq!(text(&chunks), "Hello");
        assert_eq!(chunks.last().and_then(ResponseChunk::finish_reason), Some(FinishReason::Stop));
    }

    // ==================== Meta Llama ====================

    /// Test Meta Llama compatibility endpoint
    #[tokio::test]
    async fn test_meta_llama_uses_openai_wire_format() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/compat/v1/chat/completions"))
            .and(header("authorization", "Bearer LLM|test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "llama-1",
                "model": "Llama-4-Maverick-17B-128E-Instruct-FP8",
                "choices": [{"index": 0, "message": {"role": "assistant", "content": "Howdy"}, "finish_reason": "stop"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let config = AdapterConfig::new("LLM|test")
            .with_base_url(format!("{}/compat/v1", server.uri()))
            .with_default_model("Llama-4-Maverick-17B-128E-Instruct-FP8");
        let adapter = initialized(meta_llama::adapter("llama"), config).await;
        let response = adapter.execute(&request(), &RequestContext::default()).await.unwrap();

        response.assert_served_by("llama");
        response.assert_text("Howdy");
    }

    // ==================== Through the dispatcher ====================

    /// Test dispatcher retry over real HTTP
    #[tokio::test]
    async fn test_dispatcher_retries_vendor_503_then_succeeds() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_json(json!({"error": {"message": "overloaded"}})))
            .up_to_n_times(2)
            .with_priority(1)
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "chatcmpl-ok",
                "model": "gpt-4o-mini",
                "choices": [{"index": 0, "message": {"content": "third time"}, "finish_reason": "stop"}]
            })))
            .with_priority(2)
            .expect(1)
            .mount(&server)
            .await;

        let mut registry = ProviderRegistry::new();
        registry.register("openai", Arc::new(openai(&server).await)).unwrap();
        let policy = DispatchPolicy::new(["openai"])
            .with_retry_limit(2)
            .with_backoff(BackoffConfig::constant(Duration::from_millis(5)));

        let outcome = Dispatcher::new(Arc::new(registry))
            .dispatch_with_outcome(&request(), &policy)
            .await
            .unwrap();

        outcome.value.assert_text("third time");
        assert_eq!(outcome.attempts, 3);
        assert!(!outcome.used_fallback);
    }

    /// Test fallback from one vendor to another
    #[tokio::test]
    async fn test_dispatcher_falls_back_across_vendors() {
        let openai_server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": {"message": "Incorrect API key", "code": "invalid_api_key"}
            })))
            .expect(1)
            .mount(&openai_server)
            .await;
        let anthropic_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "msg_02",
                "model": "claude-3-5-haiku-20241022",
                "content": [{"type": "text", "text": "fallback"}],
                "stop_reason": "end_turn",
                "usage": {"input_tokens": 1, "output_tokens": 1}
            })))
            .mount(&anthropic_server)
            .await;

        let mut registry = ProviderRegistry::new();
        registry.register("openai", Arc::new(openai(&openai_server).await)).unwrap();
        registry.register("claude", Arc::new(anthropic(&anthropic_server).await)).unwrap();
        let policy = DispatchPolicy::new(["openai", "claude"]).with_retry_limit(3);

        let outcome = Dispatcher::new(Arc::new(registry))
            .dispatch_with_outcome(&request(), &policy)
            .await
            .unwrap();

        outcome.value.assert_served_by("claude");
        outcome.value.assert_text("fallback");
        assert!(outcome.used_fallback);
        assert_eq!(outcome.attempts, 2);
    }
}
