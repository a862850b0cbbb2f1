//! Streaming support
//!
//! Cancellation handles and the stream type returned by streaming dispatch.

pub mod cancel;
pub mod stream;

pub use cancel::CancelHandle;
pub use stream::ResponseStream;
