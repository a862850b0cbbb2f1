//! Anthropic adapter

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::HeaderMap;
use std::time::Instant;
use tracing::debug;

use super::error::AnthropicErrorMapper;
use super::streaming::AnthropicStreamTransformer;
use super::transformer::{AnthropicRequestTransformer, AnthropicResponseTransformer};
use crate::core::providers::base::config::AdapterConfig;
use crate::core::providers::base::http;
use crate::core::providers::base::sse::sse_chunk_stream;
use crate::core::traits::error_mapper::{ErrorMapper, VendorFailure};
use crate::core::traits::provider::{ChunkStream, ProviderAdapter};
use crate::core::types::{
    capability::{Capability, CapabilitySet},
    common::{ProviderKey, RequestContext},
    errors::NormalizedError,
    requests::NormalizedRequest,
    responses::NormalizedResponse,
};

pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
pub const DEFAULT_API_VERSION: &str = "2023-06-01";
const CONTEXT_WINDOW: u32 = 200_000;

#[derive(Debug)]
struct ClientState {
    client: Client,
    messages_url: String,
    headers: HeaderMap,
    config: AdapterConfig,
}

/// Messages API adapter
#[derive(Debug)]
pub struct AnthropicAdapter {
    key: ProviderKey,
    state: Option<ClientState>,
}

impl AnthropicAdapter {
    pub fn new(key: impl Into<ProviderKey>) -> Self {
        Self {
            key: key.into(),
            state: None,
        }
    }

    fn state(&self) -> Result<&ClientState, NormalizedError> {
        self.state.as_ref().ok_or_else(|| {
            NormalizedError::config("anthropic adapter used before initialize").with_provider(self.key.clone())
        })
    }

    fn tag(&self, err: NormalizedError) -> NormalizedError {
        err.with_provider(self.key.clone())
    }

    fn encode(
        &self,
        state: &ClientState,
        request: &NormalizedRequest,
        stream: bool,
    ) -> Result<(String, serde_json::Value), NormalizedError> {
        let model = state.config.resolve_model(&request.model).map_err(|e| self.tag(e))?;
        let body = AnthropicRequestTransformer::transform(request, &model, stream).map_err(|e| self.tag(e))?;
        Ok((model, body))
    }
}

fn build_state(config: AdapterConfig) -> Result<ClientState, NormalizedError> {
    let api_key = config.require_api_key("anthropic")?;
    let base_url = config.resolve_base_url(DEFAULT_BASE_URL)?;
    config.validate_timeouts()?;
    config.validate_models()?;

    let version = config.api_version.clone().unwrap_or_else(|| DEFAULT_API_VERSION.to_string());
    let headers = http::build_headers(
        &[("x-api-key", api_key.as_str()), ("anthropic-version", version.as_str())],
        &config.headers,
    )?;
    let client = http::build_client(&config)?;

    Ok(ClientState {
        client,
        messages_url: format!("{}/v1/messages", base_url),
        headers,
        config,
    })
}

#[async_trait]
impl ProviderAdapter for AnthropicAdapter {
    fn key(&self) -> &ProviderKey {
        &self.key
    }

    async fn initialize(&mut self, config: AdapterConfig) -> Result<(), NormalizedError> {
        let state = build_state(config).map_err(|e| self.tag(e))?;
        debug!(provider = %self.key, url = %state.messages_url, "adapter initialized");
        self.state = Some(state);
        Ok(())
    }

    fn describe_capabilities(&self) -> CapabilitySet {
        let max_context = self
            .state
            .as_ref()
            .and_then(|s| s.config.max_context_tokens)
            .unwrap_or(CONTEXT_WINDOW);
        CapabilitySet::new(
            [
                Capability::Chat,
                Capability::Streaming,
                Capability::ToolCalling,
                Capability::Vision,
                Capability::SystemPrompt,
            ],
            max_context,
        )
    }

    async fn execute(
        &self,
        request: &NormalizedRequest,
        ctx: &RequestContext,
    ) -> Result<NormalizedResponse, NormalizedError> {
        let state = self.state()?;
        let (model, body) = self.encode(state, request, false)?;
        let timeout = ctx.effective_timeout(state.config.request_timeout());
        debug!(
            provider = %self.key,
            model = %model,
            attempt = ctx.attempt,
            timeout_ms = timeout.as_millis() as u64,
            "sending message"
        );

        let started = Instant::now();
        let value = http::post_json(&state.client, &state.messages_url, state.headers.clone(), &body, timeout)
            .await
            .map_err(|failure| self.translate_error(failure))?;

        AnthropicResponseTransformer::transform(value, &self.key, &model, started.elapsed().as_millis() as u64)
            .map_err(|e| self.tag(e))
    }

    async fn execute_stream(
        &self,
        request: &NormalizedRequest,
        ctx: &RequestContext,
    ) -> Result<ChunkStream, NormalizedError> {
        let state = self.state()?;
        let (model, body) = self.encode(state, request, true)?;
        let timeout = ctx.effective_timeout(state.config.request_timeout());
        debug!(provider = %self.key, model = %model, attempt = ctx.attempt, "opening message stream");

        let response = http::post_stream(&state.client, &state.messages_url, state.headers.clone(), &body, timeout)
            .await
            .map_err(|failure| self.translate_error(failure))?;

        Ok(sse_chunk_stream(
            response,
            AnthropicStreamTransformer::new(self.key.clone(), model),
            AnthropicErrorMapper,
            self.key.clone(),
            state.config.stream_timeout(),
        ))
    }

    fn translate_error(&self, failure: VendorFailure) -> NormalizedError {
        self.tag(AnthropicErrorMapper.map_failure(failure))
    }
}
