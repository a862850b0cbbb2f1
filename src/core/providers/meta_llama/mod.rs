//! Meta Llama provider
//!
//! The Llama API exposes an OpenAI-compatible endpoint at
//! `https://api.llama.com/compat/v1`, so this provider is the OpenAI adapter with a
//! Llama profile.

use crate::core::providers::openai::{OpenAIAdapter, OpenAICompatibleProfile};
use crate::core::types::{
    capability::{Capability, CapabilitySet},
    common::ProviderKey,
};

pub const DEFAULT_BASE_URL: &str = "https://api.llama.com/compat/v1";

/// Llama API profile
pub fn profile() -> OpenAICompatibleProfile {
    OpenAICompatibleProfile {
        vendor: "meta_llama",
        default_base_url: DEFAULT_BASE_URL,
        capabilities: CapabilitySet::new(
            [
                Capability::Chat,
                Capability::Streaming,
                Capability::ToolCalling,
                Capability::SystemPrompt,
            ],
            128_000,
        ),
    }
}

/// Adapter for the Llama API registered under `key`
pub fn adapter(key: impl Into<ProviderKey>) -> OpenAIAdapter {
    OpenAIAdapter::with_profile(key, profile())
}
