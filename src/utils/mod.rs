//! Utility modules
//!
//! - **error**: application-level error type
//! - **logging**: tracing subscriber setup

pub mod error;
pub mod logging;

pub use error::{RelayError, Result};
pub use logging::init_logging;
