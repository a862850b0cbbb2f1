//! Core functionality of the relay
//!
//! Normalized types, the adapter contract, vendor adapters, the provider registry and
//! the fallback dispatcher.

pub mod completion;
pub mod dispatcher;
pub mod observability;
pub mod providers;
pub mod streaming;
pub mod traits;
pub mod types;
