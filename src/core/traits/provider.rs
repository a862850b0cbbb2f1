//! Provider adapter contract
//!
//! Defines the interface every vendor integration implements

use async_trait::async_trait;
use futures::Stream;
use std::fmt::Debug;
use std::pin::Pin;

use super::error_mapper::VendorFailure;
use crate::core::providers::base::config::AdapterConfig;
use crate::core::types::{
    capability::CapabilitySet,
    common::{ProviderKey, RequestContext},
    errors::NormalizedError,
    requests::NormalizedRequest,
    responses::{NormalizedResponse, ResponseChunk},
};

/// Lazy, single-pass sequence of chunks produced by a streaming call
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<ResponseChunk, NormalizedError>> + Send>>;

/// Uniform interface over one language-model vendor
///
/// # Lifecycle
///
/// 1. The adapter is constructed with the key it will be registered under.
/// 2. [`initialize`](ProviderAdapter::initialize) validates its configuration and builds
///    the HTTP client. Failure is a `ConfigError` and aborts startup.
/// 3. The adapter is registered and never mutated again; every other method takes `&self`
///    and may be called concurrently from many dispatch tasks.
///
/// # Errors
///
/// No vendor-specific error leaves an adapter: every failure goes through
/// [`translate_error`](ProviderAdapter::translate_error) and comes out as a
/// [`NormalizedError`] whose `retryable` flag drives the dispatcher.
///
/// # Example
///
/// ```rust,ignore
/// #[async_trait]
/// impl ProviderAdapter for MyAdapter {
///     fn key(&self) -> &ProviderKey { &self.key }
///
///     async fn initialize(&mut self, config: AdapterConfig) -> Result<(), NormalizedError> {
///         self.api_key = config.require_api_key("my_vendor")?;
///         Ok(())
///     }
///
///     fn describe_capabilities(&self) -> CapabilitySet {
///         CapabilitySet::new([Capability::Chat], 8_192)
///     }
///
///     // execute, execute_stream, translate_error ...
/// }
/// ```
#[async_trait]
pub trait ProviderAdapter: Send + Sync + Debug + 'static {
    /// Key the adapter tags its responses with
    fn key(&self) -> &ProviderKey;

    /// Validate configuration and prepare the client
    ///
    /// Checks credentials, endpoint and timeouts. Fails fast with `ConfigError`; never retried.
    async fn initialize(&mut self, config: AdapterConfig) -> Result<(), NormalizedError>;

    /// Static capabilities of this instance
    fn describe_capabilities(&self) -> CapabilitySet;

    /// Single-shot completion
    ///
    /// Must not wait past `ctx.deadline`.
    async fn execute(
        &self,
        request: &NormalizedRequest,
        ctx: &RequestContext,
    ) -> Result<NormalizedResponse, NormalizedError>;

    /// Streaming completion
    ///
    /// Resolves once the vendor accepted the call. The stream ends at the vendor's
    /// end-of-stream marker or at the adapter's hard stream timeout, and owns the
    /// connection: dropping it releases the connection. Streams are not restartable.
    async fn execute_stream(
        &self,
        request: &NormalizedRequest,
        ctx: &RequestContext,
    ) -> Result<ChunkStream, NormalizedError>;

    /// Normalize a raw vendor failure
    fn translate_error(&self, failure: VendorFailure) -> NormalizedError;
}
