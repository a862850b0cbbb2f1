//! Gemini adapter
//!
//! Google AI Studio endpoint, authenticated with `x-goog-api-key`.

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::HeaderMap;
use std::time::Instant;
use tracing::debug;

use super::error::GeminiErrorMapper;
use super::streaming::GeminiStreamTransformer;
use super::transformer::{GeminiRequestTransformer, GeminiResponseTransformer};
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

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const CONTEXT_WINDOW: u32 = 1_048_576;

#[derive(Debug)]
struct ClientState {
    client: Client,
    base_url: String,
    headers: HeaderMap,
    config: AdapterConfig,
}

impl ClientState {
    fn endpoint(&self, model: &str, stream: bool) -> String {
        let model = model.strip_prefix("models/").unwrap_or(model);
        if stream {
            format!("{}/models/{}:streamGenerateContent?alt=sse", self.base_url, model)
        } else {
            format!("{}/models/{}:generateContent", self.base_url, model)
        }
    }
}

#[derive(Debug)]
pub struct GeminiAdapter {
    key: ProviderKey,
    state: Option<ClientState>,
}

impl GeminiAdapter {
    pub fn new(key: impl Into<ProviderKey>) -> Self {
        Self {
            key: key.into(),
            state: None,
        }
    }

    fn state(&self) -> Result<&ClientState, NormalizedError> {
        self.state.as_ref().ok_or_else(|| {
            NormalizedError::config("gemini adapter used before initialize").with_provider(self.key.clone())
        })
    }

    fn tag(&self, err: NormalizedError) -> NormalizedError {
        err.with_provider(self.key.clone())
    }
}

fn build_state(config: AdapterConfig) -> Result<ClientState, NormalizedError> {
    let api_key = config.require_api_key("gemini")?;
    let base_url = config.resolve_base_url(DEFAULT_BASE_URL)?;
    config.validate_timeouts()?;
    config.validate_models()?;

    let headers = http::build_headers(&[("x-goog-api-key", api_key.as_str())], &config.headers)?;
    let client = http::build_client(&config)?;

    Ok(ClientState {
        client,
        base_url,
        headers,
        config,
    })
}

#[async_trait]
impl ProviderAdapter for GeminiAdapter {
    fn key(&self) -> &ProviderKey {
        &self.key
    }

    async fn initialize(&mut self, config: AdapterConfig) -> Result<(), NormalizedError> {
        let state = build_state(config).map_err(|e| self.tag(e))?;
        debug!(provider = %self.key, url = %state.base_url, "adapter initialized");
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
        let model = state.config.resolve_model(&request.model).map_err(|e| self.tag(e))?;
        let body = GeminiRequestTransformer::transform(request).map_err(|e| self.tag(e))?;
        let url = state.endpoint(&model, false);
        let timeout = ctx.effective_timeout(state.config.request_timeout());
        debug!(provider = %self.key, model = %model, attempt = ctx.attempt, "sending generateContent");

        let started = Instant::now();
        let value = http::post_json(&state.client, &url, state.headers.clone(), &body, timeout)
            .await
            .map_err(|failure| self.translate_error(failure))?;

        GeminiResponseTransformer::transform(value, &self.key, &model, started.elapsed().as_millis() as u64)
            .map_err(|e| self.tag(e))
    }

    async fn execute_stream(
        &self,
        request: &NormalizedRequest,
        ctx: &RequestContext,
    ) -> Result<ChunkStream, NormalizedError> {
        let state = self.state()?;
        let model = state.config.resolve_model(&request.model).map_err(|e| self.tag(e))?;
        let body = GeminiRequestTransformer::transform(request).map_err(|e| self.tag(e))?;
        let url = state.endpoint(&model, true);
        let timeout = ctx.effective_timeout(state.config.request_timeout());
        debug!(provider = %self.key, model = %model, attempt = ctx.attempt, "opening generateContent stream");

        let response = http::post_stream(&state.client, &url, state.headers.clone(), &body, timeout)
            .await
            .map_err(|failure| self.translate_error(failure))?;

        Ok(sse_chunk_stream(
            response,
            GeminiStreamTransformer::new(self.key.clone(), model),
            GeminiErrorMapper,
            self.key.clone(),
            state.config.stream_timeout(),
        ))
    }

    fn translate_error(&self, failure: VendorFailure) -> NormalizedError {
        self.tag(GeminiErrorMapper.map_failure(failure))
    }
}
