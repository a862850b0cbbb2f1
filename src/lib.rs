//! # llm-relay
//!
//! One uniform chat-completion request, served by whichever of several LLM vendors
//! can handle it.
//!
//! ## Features
//!
//! - **Normalized schema**: a single request, response, chunk and error shape for every vendor
//! - **Adapters**: OpenAI, Anthropic, Google Gemini and Meta Llama behind one async trait
//! - **Capability-aware registry**: providers are filtered by what the request needs
//! - **Ordered fallback**: retry with exponential backoff, then fall back to the next provider
//! - **Deadline and cancellation**: one wall-clock budget bounds the whole call
//! - **Streaming**: cancellable single-pass chunk streams
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use llm_relay::{CompletionService, Config, DispatchOptions, NormalizedRequest};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_file("config/relay.yaml").await?;
//!     let service = CompletionService::from_config(&config).await?;
//!
//!     let request = NormalizedRequest::new("")
//!         .system("You are a helpful assistant.")
//!         .user("What is the capital of France?");
//!     let response = service.submit(request, DispatchOptions::default()).await?;
//!
//!     println!("{} says: {}", response.provider, response.text().unwrap_or_default());
//!     Ok(())
//! }
//! ```

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod core;
pub mod utils;

// Re-export main types
pub use config::Config;
pub use utils::error::{RelayError, Result};

pub use core::completion::{CompletionService, ProviderInfo};
pub use core::dispatcher::{
    BackoffConfig, DispatchOptions, DispatchOutcome, DispatchPolicy, Dispatcher,
};
pub use core::observability::{DispatchObserver, MetricsObserver, TracingObserver};
pub use core::providers::{ProviderKind, ProviderRegistry, RegistryError};
pub use core::streaming::{CancelHandle, ResponseStream};
pub use core::traits::ProviderAdapter;
pub use core::types::{
    Capability, CapabilitySet, ChatMessage, ErrorKind, MessageRole, NormalizedError,
    NormalizedRequest, NormalizedResponse, ProviderKey, ResponseChunk,
};

/// Current version of the crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
/// Name of the crate
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Build information
#[derive(Debug, Clone)]
pub struct BuildInfo {
    pub version: &'static str,
    pub git_hash: &'static str,
    pub rust_version: &'static str,
}

impl Default for BuildInfo {
    fn default() -> Self {
        Self {
            version: VERSION,
            git_hash: env!("GIT_HASH"),
            rust_version: env!("RUST_VERSION"),
        }
    }
}

pub fn build_info() -> BuildInfo {
    BuildInfo::default()
}
