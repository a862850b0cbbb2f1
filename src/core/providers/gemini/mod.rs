//! Google Gemini provider

pub mod client;
pub mod error;
pub mod streaming;
pub mod transformer;

pub use client::GeminiAdapter;
pub use error::GeminiErrorMapper;
pub use streaming::GeminiStreamTransformer;
pub use transformer::{GeminiRequestTransformer, GeminiResponseTransformer};
