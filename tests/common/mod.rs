//! Common test utilities for llm-relay
//!
//! # Usage
//!
//! ```rust,ignore
//! use crate::common::{fixtures, providers::{ScriptedAdapter, Step}};
//!
//! #[tokio::test]
//! async fn my_test() {
//!     let a = ScriptedAdapter::new("a", fixtures::chat()).then(Step::auth_error());
//!     let service = fixtures::service(&[a.clone()]);
//!     // ...
//! }
//! ```

pub mod assertions;
pub mod fixtures;
pub mod providers;

pub use providers::{ScriptedAdapter, Step, StreamTail};

/// Skip test if environment variable is not set
#[macro_export]
macro_rules! skip_without_env {
    ($var:expr) => {
        if std::env::var($var).is_err() {
            eprintln!("Skipping test: {} environment variable not set", $var);
            return;
        }
    };
}
