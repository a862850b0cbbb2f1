//! Cancellation handles
//!
//! A [`CancelHandle`] is shared between the caller and a dispatch call. Cancelling it
//! stops the attempt in flight, prevents further candidates, and ends any stream the
//! call produced. The in-flight future or stream is dropped, which closes its
//! connection.

use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};

/// A handle that can be used to request cancellation
#[derive(Clone, Debug, Default)]
pub struct CancelHandle {
    token: CancellationToken,
}

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once cancellation is requested
    pub fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.token.cancelled()
    }

    /// Handle cancelled together with this one but cancellable on its own
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
        }
    }
}
