//! Configuration data models

pub mod dispatch;
pub mod logging;
pub mod provider;

pub use dispatch::*;
pub use logging::*;
pub use provider::*;

/// Default retries per provider after the first attempt
pub fn default_retry_limit() -> u32 {
    2
}

/// Default global deadline in milliseconds
pub fn default_deadline_ms() -> u64 {
    30_000
}

/// Default first backoff delay in milliseconds
pub fn default_initial_delay_ms() -> u64 {
    200
}

/// Default backoff ceiling in milliseconds
pub fn default_max_delay_ms() -> u64 {
    5_000
}

/// Default backoff growth factor
pub fn default_backoff_multiplier() -> f64 {
    2.0
}

/// Default jitter fraction
pub fn default_jitter() -> f64 {
    0.1
}

/// Default log level
pub fn default_log_level() -> String {
    "info".to_string()
}

/// Default true value
pub fn default_true() -> bool {
    true
}
