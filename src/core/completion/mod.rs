//! Completion API
//!
//! Caller-facing entry point: submit a normalized request, get a normalized response
//! or stream back. Wraps a [`Dispatcher`] and the configured dispatch defaults.

use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use crate::config::Config;
use crate::core::dispatcher::{
    DispatchOptions, DispatchOutcome, DispatchPolicy, Dispatcher,
};
use crate::core::observability::DispatchObserver;
use crate::core::providers::ProviderRegistry;
use crate::core::streaming::ResponseStream;
use crate::core::types::{
    capability::CapabilitySet, common::ProviderKey, errors::NormalizedError,
    requests::NormalizedRequest, responses::NormalizedResponse,
};
use crate::utils::error::Result;

/// Registered provider as reported by [`CompletionService::providers`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderInfo {
    pub key: ProviderKey,
    pub capabilities: CapabilitySet,
}

/// Request API over a frozen registry
#[derive(Debug, Clone)]
pub struct CompletionService {
    dispatcher: Dispatcher,
    defaults: DispatchPolicy,
}

impl CompletionService {
    pub fn new(dispatcher: Dispatcher, defaults: DispatchPolicy) -> Self {
        Self {
            dispatcher,
            defaults,
        }
    }

    /// Service over `registry`, trying providers in registration order
    pub fn with_registry(registry: Arc<ProviderRegistry>) -> Self {
        let order: Vec<ProviderKey> = registry.keys().cloned().collect();
        Self::new(Dispatcher::new(registry), DispatchPolicy::new(order))
    }

    /// Build and initialize every configured provider
    pub async fn from_config(config: &Config) -> Result<Self> {
        let registry = ProviderRegistry::from_config(&config.providers).await?;
        let defaults = DispatchPolicy::from_config(&config.dispatch, config.dispatch_order());
        info!(
            providers = registry.count(),
            retry_limit = defaults.retry_limit,
            deadline_ms = defaults.deadline.as_millis() as u64,
            "completion service ready"
        );
        Ok(Self::new(Dispatcher::new(Arc::new(registry)), defaults))
    }

    pub fn with_observer(mut self, observer: Arc<dyn DispatchObserver>) -> Self {
        self.dispatcher = self.dispatcher.with_observer(observer);
        self
    }

    pub fn defaults(&self) -> &DispatchPolicy {
        &self.defaults
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Single-shot completion
    pub async fn submit(
        &self,
        request: NormalizedRequest,
        options: DispatchOptions,
    ) -> std::result::Result<NormalizedResponse, NormalizedError> {
        let policy = options.resolve(&self.defaults);
        self.dispatcher.dispatch(&request, &policy).await
    }

    /// Single-shot completion plus which provider served it and how
    pub async fn submit_with_outcome(
        &self,
        request: NormalizedRequest,
        options: DispatchOptions,
    ) -> std::result::Result<DispatchOutcome<NormalizedResponse>, NormalizedError> {
        let policy = options.resolve(&self.defaults);
        self.dispatcher.dispatch_with_outcome(&request, &policy).await
    }

    /// Streaming completion; the request is marked as streaming
    pub async fn submit_stream(
        &self,
        request: NormalizedRequest,
        options: DispatchOptions,
    ) -> std::result::Result<ResponseStream, NormalizedError> {
        let policy = options.resolve(&self.defaults);
        let request = request.with_stream(true);
        self.dispatcher.dispatch_stream(&request, &policy).await
    }

    /// Registered providers in registration order
    pub fn providers(&self) -> Vec<ProviderInfo> {
        self.dispatcher
            .registry()
            .list()
            .into_iter()
            .map(|(key, capabilities)| ProviderInfo { key, capabilities })
            .collect()
    }
}
