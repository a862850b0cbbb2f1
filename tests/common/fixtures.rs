//! Test fixtures and data factories

use std::sync::Arc;
use std::time::Duration;

use llm_relay::core::dispatcher::{BackoffConfig, DispatchPolicy, Dispatcher};
use llm_relay::core::providers::ProviderRegistry;
use llm_relay::core::traits::ProviderAdapter;
use llm_relay::core::types::{Capability, CapabilitySet, NormalizedRequest};
use llm_relay::{CompletionService, ProviderKey};

use super::providers::ScriptedAdapter;

/// Chat with a system prompt, no streaming
pub fn chat() -> CapabilitySet {
    CapabilitySet::new([Capability::Chat, Capability::SystemPrompt], 8_192)
}

pub fn chat_streaming() -> CapabilitySet {
    chat().with(Capability::Streaming)
}

pub fn hello() -> NormalizedRequest {
    NormalizedRequest::new("test-model").user("hello")
}

pub fn streaming_hello() -> NormalizedRequest {
    hello().with_stream(true)
}

/// Registry holding each adapter under its own key, in order
pub fn registry(adapters: &[Arc<ScriptedAdapter>]) -> Arc<ProviderRegistry> {
    let mut registry = ProviderRegistry::new();
    for adapter in adapters {
        let key = adapter.as_adapter().key().clone();
        registry.register(key, adapter.as_adapter()).unwrap();
    }
    Arc::new(registry)
}

/// Policy over the adapters' keys with a short constant backoff
pub fn policy(adapters: &[Arc<ScriptedAdapter>]) -> DispatchPolicy {
    let order: Vec<ProviderKey> = adapters
        .iter()
        .map(|a| a.as_adapter().key().clone())
        .collect();
    DispatchPolicy::new(order).with_backoff(BackoffConfig::constant(Duration::from_millis(5)))
}

pub fn dispatcher(adapters: &[Arc<ScriptedAdapter>]) -> Dispatcher {
    Dispatcher::new(registry(adapters))
}

/// Service with the same short backoff as [`policy`]
pub fn service(adapters: &[Arc<ScriptedAdapter>]) -> CompletionService {
    let dispatcher = dispatcher(adapters);
    CompletionService::new(dispatcher, policy(adapters))
}
