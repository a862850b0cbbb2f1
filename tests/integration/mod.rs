//! Integration tests
//!
//! Cross-module behavior with no real vendor involved: scripted adapters for the
//! dispatcher, a local mock HTTP server for the vendor adapters.

mod adapter_tests;
mod registry_tests;
