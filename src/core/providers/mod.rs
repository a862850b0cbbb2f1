//! Provider adapters
//!
//! One module per vendor plus the shared HTTP/SSE plumbing in `base`. Adapters are
//! selected at runtime by [`ProviderKind`] and live in the registry as
//! `Arc<dyn ProviderAdapter>`.

// Base infrastructure
pub mod base;

// Provider modules
pub mod anthropic;
pub mod gemini;
pub mod meta_llama;
pub mod openai;

// Registry
pub mod provider_registry;

pub use provider_registry::{ProviderRegistry, RegistryEntry, RegistryError};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::core::traits::provider::ProviderAdapter;
use crate::core::types::common::ProviderKey;

/// Vendor implementation behind a provider key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    OpenAI,
    #[serde(alias = "claude")]
    Anthropic,
    #[serde(alias = "gemini")]
    Google,
    #[serde(alias = "meta_llama", alias = "llama")]
    Meta,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 4] = [
        ProviderKind::OpenAI,
        ProviderKind::Anthropic,
        ProviderKind::Google,
        ProviderKind::Meta,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenAI => "openai",
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::Google => "google",
            ProviderKind::Meta => "meta",
        }
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(ProviderKind::OpenAI),
            "anthropic" | "claude" => Ok(ProviderKind::Anthropic),
            "google" | "gemini" => Ok(ProviderKind::Google),
            "meta" | "meta_llama" | "meta-llama" | "llama" => Ok(ProviderKind::Meta),
            other => Err(format!("unknown provider kind '{}'", other)),
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Construct an uninitialized adapter of `kind` registered under `key`
pub fn create_adapter(kind: ProviderKind, key: impl Into<ProviderKey>) -> Box<dyn ProviderAdapter> {
    let key = key.into();
    match kind {
        ProviderKind::OpenAI => Box::new(openai::OpenAIAdapter::new(key)),
        ProviderKind::Anthropic => Box::new(anthropic::AnthropicAdapter::new(key)),
        ProviderKind::Google => Box::new(gemini::GeminiAdapter::new(key)),
        ProviderKind::Meta => Box::new(meta_llama::adapter(key)),
    }
}
