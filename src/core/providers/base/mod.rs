//! Module
//!
//! Contains base components shared by all providers

pub mod config;
pub mod http;
pub mod sse;

pub use config::AdapterConfig;
pub use sse::{SseEvent, SseParser, SseTransformer, sse_chunk_stream};
