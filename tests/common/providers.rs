//! Provider test utilities
//!
//! [`ScriptedAdapter`] is a spy: it replays a script of outcomes, counts calls, records
//! attempt numbers and tracks how many of its streams are still open.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use llm_relay::core::providers::base::config::AdapterConfig;
use llm_relay::core::traits::error_mapper::VendorFailure;
use llm_relay::core::traits::provider::{ChunkStream, ProviderAdapter};
use llm_relay::core::types::{
    CapabilitySet, Choice, FinishReason, NormalizedError, NormalizedRequest, NormalizedResponse,
    ProviderKey, RequestContext, ResponseChunk, Usage,
};

/// How a scripted stream ends after its chunks
#[derive(Debug, Clone)]
pub enum StreamTail {
    End,
    /// Never yields again
    Hang,
    Fail(NormalizedError),
}

/// One scripted outcome
#[derive(Debug, Clone)]
pub enum Step {
    Reply(String),
    Fail(NormalizedError),
    /// Fail after waiting
    FailAfter(Duration, NormalizedError),
    /// Never resolve
    Hang,
    Stream {
        chunks: Vec<String>,
        tail: StreamTail,
    },
}

impl Step {
    pub fn reply(text: &str) -> Self {
        Step::Reply(text.to_string())
    }

    pub fn auth_error() -> Self {
        Step::Fail(NormalizedError::auth("invalid api key"))
    }

    pub fn rate_limited() -> Self {
        Step::Fail(NormalizedError::rate_limited("too many requests", None))
    }

    pub fn transient() -> Self {
        Step::Fail(NormalizedError::transient("upstream unavailable"))
    }

    pub fn stream(chunks: &[&str], tail: StreamTail) -> Self {
        Step::Stream {
            chunks: chunks.iter().map(ToString::to_string).collect(),
            tail,
        }
    }
}

/// Decrements the open-handle counter when the stream holding it is dropped
struct HandleGuard(Arc<AtomicUsize>);

impl HandleGuard {
    fn open(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter.clone())
    }
}

impl Drop for HandleGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[derive(Debug)]
pub struct ScriptedAdapter {
    key: ProviderKey,
    capabilities: CapabilitySet,
    script: Mutex<VecDeque<Step>>,
    /// Used once the script is exhausted
    fallback: Mutex<Option<Step>>,
    calls: AtomicUsize,
    attempts: Mutex<Vec<u32>>,
    open_handles: Arc<AtomicUsize>,
}

impl ScriptedAdapter {
    pub fn new(key: &str, capabilities: CapabilitySet) -> Arc<Self> {
        Arc::new(Self::build(key, capabilities))
    }

    fn build(key: &str, capabilities: CapabilitySet) -> Self {
        Self {
            key: ProviderKey::new(key),
            capabilities,
            script: Mutex::new(VecDeque::new()),
            fallback: Mutex::new(None),
            calls: AtomicUsize::new(0),
            attempts: Mutex::new(Vec::new()),
            open_handles: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Append a step to the script
    pub fn then(self: Arc<Self>, step: Step) -> Arc<Self> {
        self.script.lock().push_back(step);
        self
    }

    /// Step repeated after the script runs out, instead of the default reply
    pub fn always(self: Arc<Self>, step: Step) -> Arc<Self> {
        *self.fallback.lock() = Some(step);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Attempt numbers seen in the request contexts, in call order
    pub fn attempts(&self) -> Vec<u32> {
        self.attempts.lock().clone()
    }

    pub fn open_handles(&self) -> usize {
        self.open_handles.load(Ordering::SeqCst)
    }

    pub fn as_adapter(self: &Arc<Self>) -> Arc<dyn ProviderAdapter> {
        self.clone()
    }

    fn next_step(&self, ctx: &RequestContext) -> Step {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.attempts.lock().push(ctx.attempt);
        if let Some(step) = self.script.lock().pop_front() {
            return step;
        }
        self.fallback
            .lock()
            .clone()
            .unwrap_or_else(|| Step::Reply(format!("hello from {}", self.key)))
    }

    fn response(&self, text: String) -> NormalizedResponse {
        NormalizedResponse {
            id: format!("{}-{}", self.key, self.calls()),
            provider: self.key.clone(),
            model: "scripted-model".to_string(),
            created_at: Utc::now(),
            choices: vec![Choice::text(0, text, Some(FinishReason::Stop))],
            usage: Usage::new(3, 5),
            latency_ms: 1,
        }
    }

    fn chunk(&self, text: &str) -> ResponseChunk {
        ResponseChunk::text("stream-1", self.key.clone(), "scripted-model", text)
    }
}

#[async_trait]
impl ProviderAdapter for ScriptedAdapter {
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
        ctx: &RequestContext,
    ) -> Result<NormalizedResponse, NormalizedError> {
        match self.next_step(ctx) {
            Step::Reply(text) => Ok(self.response(text)),
            Step::Stream { chunks, .. } => Ok(self.response(chunks.concat())),
            Step::Fail(error) => Err(error.with_provider(self.key.clone())),
            Step::FailAfter(delay, error) => {
                tokio::time::sleep(delay).await;
                Err(error.with_provider(self.key.clone()))
            }
            Step::Hang => std::future::pending().await,
        }
    }

    async fn execute_stream(
        &self,
        _request: &NormalizedRequest,
        ctx: &RequestContext,
    ) -> Result<ChunkStream, NormalizedError> {
        let (chunks, tail) = match self.next_step(ctx) {
            Step::Reply(text) => (
                text.split_whitespace().map(|w| self.chunk(w)).collect::<Vec<_>>(),
                StreamTail::End,
            ),
            Step::Stream { chunks, tail } => (chunks.iter().map(|c| self.chunk(c)).collect(), tail),
            Step::Fail(error) => return Err(error.with_provider(self.key.clone())),
            Step::FailAfter(delay, error) => {
                tokio::time::sleep(delay).await;
                return Err(error.with_provider(self.key.clone()));
            }
            Step::Hang => std::future::pending().await,
        };

        let guard = HandleGuard::open(&self.open_handles);
        Ok(Box::pin(async_stream::stream! {
            let _guard = guard;
            for chunk in chunks {
                yield Ok(chunk);
            }
            match tail {
                StreamTail::End => {}
                StreamTail::Hang => std::future::pending::<()>().await,
                StreamTail::Fail(error) => yield Err(error),
            }
        }))
    }

    fn translate_error(&self, failure: VendorFailure) -> NormalizedError {
        NormalizedError::transient(format!("{:?}", failure))
    }
}

/// Non-empty API key from the environment
pub fn get_api_key(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|key| !key.trim().is_empty())
}
