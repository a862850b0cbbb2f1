//! OpenAI adapter
//!
//! Also serves any vendor exposing an OpenAI-compatible Chat Completions endpoint
//! through [`OpenAICompatibleProfile`].

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::HeaderMap;
use std::time::Instant;
use tracing::debug;

use super::error::OpenAIErrorMapper;
use super::streaming::OpenAIStreamTransformer;
use super::transformer::{OpenAIRequestTransformer, OpenAIResponseTransformer};
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

/// Vendor-specific facts about an OpenAI-compatible endpoint
#[derive(Debug, Clone)]
pub struct OpenAICompatibleProfile {
    /// Vendor label used in logs and config errors
    pub vendor: &'static str,
    pub default_base_url: &'static str,
    pub capabilities: CapabilitySet,
}

impl OpenAICompatibleProfile {
    /// OpenAI itself
    pub fn openai() -> Self {
        Self {
            vendor: "openai",
            default_base_url: "https://api.openai.com/v1",
            capabilities: CapabilitySet::new(
                [
                    Capability::Chat,
                    Capability::Streaming,
                    Capability::ToolCalling,
                    Capability::Vision,
                    Capability::SystemPrompt,
                ],
                128_000,
            ),
        }
    }
}

#[derive(Debug)]
struct ClientState {
    client: Client,
    chat_url: String,
    headers: HeaderMap,
    config: AdapterConfig,
}

/// Chat Completions adapter
#[derive(Debug)]
pub struct OpenAIAdapter {
    key: ProviderKey,
    profile: OpenAICompatibleProfile,
    state: Option<ClientState>,
}

impl OpenAIAdapter {
    /// OpenAI adapter registered under `key`
    pub fn new(key: impl Into<ProviderKey>) -> Self {
        Self::with_profile(key, OpenAICompatibleProfile::openai())
    }

    /// Adapter for another OpenAI-compatible vendor
    pub fn with_profile(key: impl Into<ProviderKey>, profile: OpenAICompatibleProfile) -> Self {
        Self {
            key: key.into(),
            profile,
            state: None,
        }
    }

    pub fn vendor(&self) -> &'static str {
        self.profile.vendor
    }

    fn state(&self) -> Result<&ClientState, NormalizedError> {
        self.state.as_ref().ok_or_else(|| {
            NormalizedError::config(format!("{} adapter used before initialize", self.profile.vendor))
                .with_provider(self.key.clone())
        })
    }

    fn tag(&self, err: NormalizedError) -> NormalizedError {
        err.with_provider(self.key.clone())
    }
}

fn build_state(
    profile: &OpenAICompatibleProfile,
    config: AdapterConfig,
) -> Result<ClientState, NormalizedError> {
    let api_key = config.require_api_key(profile.vendor)?;
    let base_url = config.resolve_base_url(profile.default_base_url)?;
    config.validate_timeouts()?;
    config.validate_models()?;

    let bearer = format!("Bearer {}", api_key);
    let headers = http::build_headers(&[("authorization", bearer.as_str())], &config.headers)?;
    let client = http::build_client(&config)?;

    Ok(ClientState {
        client,
        chat_url: format!("{}/chat/completions", base_url),
        headers,
        config,
    })
}

#[async_trait]
impl ProviderAdapter for OpenAIAdapter {
    fn key(&self) -> &ProviderKey {
        &self.key
    }

    async fn initialize(&mut self, config: AdapterConfig) -> Result<(), NormalizedError> {
        let state = build_state(&self.profile, config).map_err(|e| self.tag(e))?;
        debug!(provider = %self.key, vendor = self.profile.vendor, url = %state.chat_url, "adapter initialized");
        self.state = Some(state);
        Ok(())
    }

    fn describe_capabilities(&self) -> CapabilitySet {
        let capabilities = self.profile.capabilities.clone();
        match self.state.as_ref().and_then(|s| s.config.max_context_tokens) {
            Some(max) => capabilities.with_max_context_tokens(max),
            None => capabilities,
        }
    }

    async fn execute(
        &self,
        request: &NormalizedRequest,
        ctx: &RequestContext,
    ) -> Result<NormalizedResponse, NormalizedError> {
        let state = self.state()?;
        let model = state.config.resolve_model(&request.model).map_err(|e| self.tag(e))?;
        let wire = OpenAIRequestTransformer::transform(request, model.clone(), false)
            .map_err(|e| self.tag(e))?;
        let body = serde_json::to_value(&wire)
            .map_err(|e| self.tag(NormalizedError::validation(format!("failed to encode request: {}", e))))?;

        let timeout = ctx.effective_timeout(state.config.request_timeout());
        debug!(
            provider = %self.key,
            model = %model,
            attempt = ctx.attempt,
            timeout_ms = timeout.as_millis() as u64,
            "sending chat completion"
        );

        let started = Instant::now();
        let value = http::post_json(&state.client, &state.chat_url, state.headers.clone(), &body, timeout)
            .await
            .map_err(|failure| self.translate_error(failure))?;

        OpenAIResponseTransformer::transform(value, &self.key, &model, started.elapsed().as_millis() as u64)
            .map_err(|e| self.tag(e))
    }

    async fn execute_stream(
        &self,
        request: &NormalizedRequest,
        ctx: &RequestContext,
    ) -> Result<ChunkStream, NormalizedError> {
        let state = self.state()?;
        let model = state.config.resolve_model(&request.model).map_err(|e| self.tag(e))?;
        let wire = OpenAIRequestTransformer::transform(request, model.clone(), true)
            .map_err(|e| self.tag(e))?;
        let body = serde_json::to_value(&wire)
            .map_err(|e| self.tag(NormalizedError::validation(format!("failed to encode request: {}", e))))?;

        let timeout = ctx.effective_timeout(state.config.request_timeout());
        debug!(provider = %self.key, model = %model, attempt = ctx.attempt, "opening chat stream");

        let response = http::post_stream(&state.client, &state.chat_url, state.headers.clone(), &body, timeout)
            .await
            .map_err(|failure| self.translate_error(failure))?;

        Ok(sse_chunk_stream(
            response,
            OpenAIStreamTransformer::new(self.key.clone()),
            OpenAIErrorMapper,
            self.key.clone(),
            state.config.stream_timeout(),
        ))
    }

    fn translate_error(&self, failure: VendorFailure) -> NormalizedError {
        self.tag(OpenAIErrorMapper.map_failure(failure))
    }
}
