//! Runtime configuration
//!
//! Settings come from environment variables with sensible defaults; the
//! binary layers clap CLI flags on top.

use crate::provider::ProviderConfig;
use std::env;
use std::net::SocketAddr;
use tracing::warn;

/// Default bind address for the API server
pub const DEFAULT_ADDR: &str = "127.0.0.1:8080";

/// Runtime settings for the service
#[derive(Debug, Clone)]
pub struct Settings {
    /// API server bind address
    pub addr: SocketAddr,

    /// AI provider configuration
    pub provider: ProviderConfig,
}

impl Settings {
    /// Build settings from the environment
    pub fn from_env() -> Self {
        let addr = env::var("ARIADNE_ADDR")
            .ok()
            .and_then(|raw| match raw.parse() {
                Ok(addr) => Some(addr),
                Err(err) => {
                    warn!("invalid ARIADNE_ADDR ({}), using default: {}", raw, err);
                    None
                }
            })
            .unwrap_or_else(|| DEFAULT_ADDR.parse().expect("default addr is valid"));

        Self {
            addr,
            provider: ProviderConfig::default(),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::from_env()
    }
}
