//! Core traits module
//!
//! The adapter contract and vendor error mapping

pub mod error_mapper;
pub mod provider;

pub use error_mapper::{ErrorMapper, GenericErrorMapper, VendorFailure};
pub use provider::{ChunkStream, ProviderAdapter};
