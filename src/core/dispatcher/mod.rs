//! Fallback dispatcher
//!
//! Drives a request through the registered adapters: picks the candidates able to
//! serve it, retries retryable failures with backoff, falls back to the next candidate
//! otherwise, and bounds the whole call by one deadline.

mod execute_impl;
pub mod execution;
pub mod outcome;
pub mod policy;
pub mod selection;
pub mod state;

#[cfg(test)]
mod tests;

pub use execution::{backoff_delay, is_retryable};
pub use outcome::DispatchOutcome;
pub use policy::{BackoffConfig, DispatchOptions, DispatchPolicy};
pub use selection::select_candidates;
pub use state::DispatchState;

use std::sync::Arc;

use crate::core::observability::{DispatchObserver, TracingObserver};
use crate::core::providers::ProviderRegistry;
use crate::core::streaming::ResponseStream;
use crate::core::types::{
    errors::NormalizedError, requests::NormalizedRequest, responses::NormalizedResponse,
};

/// Stateless fallback engine over a frozen registry
///
/// Cheap to clone; concurrent calls share nothing but the registry.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: Arc<ProviderRegistry>,
    observers: Vec<Arc<dyn DispatchObserver>>,
}

impl Dispatcher {
    /// Dispatcher reporting to a [`TracingObserver`]
    pub fn new(registry: Arc<ProviderRegistry>) -> Self {
        Self {
            registry,
            observers: vec![Arc::new(TracingObserver)],
        }
    }

    /// Add an observer
    pub fn with_observer(mut self, observer: Arc<dyn DispatchObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn registry(&self) -> &Arc<ProviderRegistry> {
        &self.registry
    }

    /// Single-shot completion with retry and fallback
    pub async fn dispatch(
        &self,
        request: &NormalizedRequest,
        policy: &DispatchPolicy,
    ) -> Result<NormalizedResponse, NormalizedError> {
        self.execute_impl(request, policy)
            .await
            .map(DispatchOutcome::into_value)
    }

    /// Like [`dispatch`](Self::dispatch), with attempt metadata
    pub async fn dispatch_with_outcome(
        &self,
        request: &NormalizedRequest,
        policy: &DispatchPolicy,
    ) -> Result<DispatchOutcome<NormalizedResponse>, NormalizedError> {
        self.execute_impl(request, policy).await
    }

    /// Streaming completion
    ///
    /// Returns once a provider delivered its first chunk. Failures before that point
    /// retry and fall back like [`dispatch`](Self::dispatch); later failures end the
    /// stream.
    pub async fn dispatch_stream(
        &self,
        request: &NormalizedRequest,
        policy: &DispatchPolicy,
    ) -> Result<ResponseStream, NormalizedError> {
        self.execute_stream_impl(request, policy)
            .await
            .map(DispatchOutcome::into_value)
    }

    pub async fn dispatch_stream_with_outcome(
        &self,
        request: &NormalizedRequest,
        policy: &DispatchPolicy,
    ) -> Result<DispatchOutcome<ResponseStream>, NormalizedError> {
        self.execute_stream_impl(request, policy).await
    }
}
