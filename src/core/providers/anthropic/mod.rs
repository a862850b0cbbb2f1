//! Anthropic provider
//!
//! Messages API adapter.

pub mod client;
pub mod error;
pub mod streaming;
pub mod transformer;

pub use client::AnthropicAdapter;
pub use error::AnthropicErrorMapper;
pub use streaming::AnthropicStreamTransformer;
pub use transformer::{AnthropicRequestTransformer, AnthropicResponseTransformer};
