//! Runtime settings read from the environment.

use std::net::SocketAddr;
use std::path::PathBuf;
use thiserror::Error;

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";
pub const DEFAULT_CATALOG_DIR: &str = "catalogs";
pub const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid ESTIMATOR_BIND_ADDR {value:?}: {source}")]
    BindAddr {
        value: String,
        #[source]
        source: std::net::AddrParseError,
    },
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub bind_addr: SocketAddr,
    /// Directory of `<service_id>.json` catalog snapshots.
    pub catalog_dir: PathBuf,
    /// Default tracing filter when `RUST_LOG` is unset.
    pub log_level: String,
}

impl Settings {
    /// Read `ESTIMATOR_BIND_ADDR`, `ESTIMATOR_CATALOG_DIR` and
    /// `ESTIMATOR_LOG`, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let addr = lookup("ESTIMATOR_BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = addr
            .parse()
            .map_err(|source| ConfigError::BindAddr { value: addr, source })?;
        let catalog_dir = lookup("ESTIMATOR_CATALOG_DIR")
            .unwrap_or_else(|| DEFAULT_CATALOG_DIR.to_string())
            .into();
        let log_level = lookup("ESTIMATOR_LOG").unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string());
        Ok(Settings {
            bind_addr,
            catalog_dir,
            log_level,
        })
    }
}
