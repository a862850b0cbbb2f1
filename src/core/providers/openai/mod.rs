//! OpenAI Provider
//!
//! Chat Completions integration. The wire format is shared with every
//! OpenAI-compatible vendor (see `meta_llama`).

pub mod client;
pub mod error;
pub mod models;
pub mod streaming;
pub mod transformer;

pub use client::{OpenAIAdapter, OpenAICompatibleProfile};
pub use error::OpenAIErrorMapper;
pub use streaming::OpenAIStreamTransformer;
pub use transformer::{OpenAIRequestTransformer, OpenAIResponseTransformer};
