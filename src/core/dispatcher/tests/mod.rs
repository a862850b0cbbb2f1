//! Dispatcher tests module


use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use crate::core::providers::ProviderRegistry;
use crate::core::providers::base::config::AdapterConfig;
use crate::core::traits::error_mapper::VendorFailure;
use crate::core::traits::provider::{ChunkStream, ProviderAdapter};
use crate::core::types::{
    capability::{Capability, CapabilitySet},
    common::{ProviderKey, RequestContext},
    errors::NormalizedError,
    requests::NormalizedRequest,
    responses::{Choice, FinishReason, NormalizedResponse, ResponseChunk, Usage},
};

/// Adapter replaying a fixed script of results, then succeeding
#[derive(Debug)]
pub(super) struct Scripted {
    key: ProviderKey,
    capabilities: CapabilitySet,
    script: Mutex<VecDeque<Result<String, NormalizedError>>>,
    latency: Duration,
    calls: AtomicU32,
}

impl Scripted {
    pub(super) fn new(key: &str, capabilities: CapabilitySet) -> Self {
        Self {
            key: ProviderKey::new(key),
            capabilities,
            script: Mutex::new(VecDeque::new()),
            latency: Duration::ZERO,
            calls: AtomicU32::new(0),
        }
    }

    pub(super) fn then_ok(self, text: &str) -> Self {
        self.script.lock().push_back(Ok(text.to_string()));
        self
    }

    pub(super) fn then_err(self, error: NormalizedError) -> Self {
        self.script.lock().push_back(Err(error));
        self
    }

    pub(super) fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub(super) fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    async fn next(&self) -> Result<String, NormalizedError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let step = self.script.lock().pop_front();
        step.unwrap_or_else(|| Ok(format!("hello from {}", self.key)))
    }
}

#[async_trait]
impl ProviderAdapter for Scripted {
    fn key(&self) -> &ProviderKey {
        &self.key
    }

    async fn initialize(&mut self, _config: AdapterConfig) -> Result<(), NormalizedError> {
        Ok(())
    }

    fn describe_capabilities(&self) -> CapabilitySet {
        self.capabilities.clone()
    }

    async fn execute(
        &self,
        _request: &NormalizedRequest,
        _ctx: &RequestContext,
    ) -> Result<NormalizedResponse, NormalizedError> {
        let text = self.next().await?;
        Ok(NormalizedResponse {
            id: format!("resp-{}", self.calls()),
            provider: self.key.clone(),
            model: "scripted".to_string(),
            created_at: Utc::now(),
            choices: vec![Choice::text(0, text, Some(FinishReason::Stop))],
            usage: Usage::new(1, 1),
            latency_ms: 0,
        })
    }

    async fn execute_stream(
        &self,
        _request: &NormalizedRequest,
        _ctx: &RequestContext,
    ) -> Result<ChunkStream, NormalizedError> {
        let text = self.next().await?;
        let key = self.key.clone();
        let chunks: Vec<Result<ResponseChunk, NormalizedError>> = text
            .split(' ')
            .map(|word| Ok(ResponseChunk::text("chunk", key.clone(), "scripted", word)))
            .collect();
        Ok(Box::pin(futures::stream::iter(chunks)))
    }

    fn translate_error(&self, failure: VendorFailure) -> NormalizedError {
        NormalizedError::transient(format!("{:?}", failure))
    }
}

pub(super) fn chat() -> CapabilitySet {
    CapabilitySet::new([Capability::Chat, Capability::SystemPrompt], 8_192)
}

pub(super) fn chat_streaming() -> CapabilitySet {
    chat().with(Capability::Streaming)
}

/// Register each adapter under its own key, in order
pub(super) fn registry_of(adapters: &[Arc<Scripted>]) -> Arc<ProviderRegistry> {
    let mut registry = ProviderRegistry::new();
    for adapter in adapters {
        let key = adapter.key().clone();
        registry
            .register(key, adapter.clone() as Arc<dyn ProviderAdapter>)
            .unwrap();
    }
    Arc::new(registry)
}

pub(super) fn hello() -> NormalizedRequest {
    NormalizedRequest::new("default").user("hello")
}
