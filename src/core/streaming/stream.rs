//! Caller-facing response stream

use futures::Stream;
use pin_project_lite::pin_project;
use std::pin::Pin;
use std::task::{Context, Poll};

use super::cancel::CancelHandle;
use crate::core::traits::provider::ChunkStream;
use crate::core::types::{common::ProviderKey, errors::NormalizedError, responses::ResponseChunk};

pin_project! {
    /// Chunks of one streaming dispatch
    ///
    /// Single pass: once it returns `None` or an error the call is over, and a new
    /// call must be issued to try again. Dropping it releases the vendor connection.
    pub struct ResponseStream {
        #[pin]
        inner: ChunkStream,
        provider: ProviderKey,
        cancel: CancelHandle,
    }
}

impl ResponseStream {
    pub(crate) fn new(inner: ChunkStream, provider: ProviderKey, cancel: CancelHandle) -> Self {
        Self {
            inner,
            provider,
            cancel,
        }
    }

    /// Provider serving this stream
    pub fn provider(&self) -> &ProviderKey {
        &self.provider
    }

    /// Stop the stream; the next poll yields a `Cancelled` error and then ends
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_handle(&self) -> &CancelHandle {
        &self.cancel
    }
}

impl Stream for ResponseStream {
    type Item = Result<ResponseChunk, NormalizedError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.project().inner.poll_next(cx)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl std::fmt::Debug for ResponseStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseStream")
            .field("provider", &self.provider)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}
