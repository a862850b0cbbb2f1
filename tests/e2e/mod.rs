//! End-to-end tests against live vendor APIs
//!
//! Ignored by default. Run with `cargo test -- --ignored` after exporting the API key
//! of each vendor to exercise; tests for vendors without a key skip themselves.

mod chat_completion;
