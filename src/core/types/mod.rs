//! Core type definition module
//!
//! Normalized request, response, error and capability types shared by every adapter

pub mod capability;
pub mod common;
pub mod errors;
pub mod requests;
pub mod responses;

pub use capability::*;
pub use common::*;
pub use errors::*;
pub use requests::*;
pub use responses::*;
