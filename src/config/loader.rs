//! Configuration file discovery

use super::Config;
use crate::utils::error::Result;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Used when neither a path nor `RELAY_CONFIG` is given
pub const DEFAULT_CONFIG_PATH: &str = "config/relay.yaml";

/// Load the configuration from `path`, `RELAY_CONFIG`, or the default location
pub async fn load_config(path: Option<&Path>) -> Result<Config> {
    let path = resolve_path(path);
    debug!("Resolved configuration path: {:?}", path);
    Config::from_file(path).await
}

fn resolve_path(path: Option<&Path>) -> PathBuf {
    match path {
        Some(path) => path.to_path_buf(),
        None => std::env::var_os("RELAY_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH)),
    }
}
