//! Server configuration from the environment.

use std::net::{AddrParseError, SocketAddr};

use thiserror::Error;

/// Environment variable holding the listen address.
pub const ADDR_VAR: &str = "PATHGRAPH_ADDR";
pub const DEFAULT_ADDR: &str = "127.0.0.1:8888";
/// Broadcast backlog per client before it is considered lagging.
pub const CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid {var} '{value}': {source}")]
    InvalidAddr {
        var: &'static str,
        value: String,
        #[source]
        source: AddrParseError,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    pub channel_capacity: usize,
}

impl ServerConfig {
    /// Read `PATHGRAPH_ADDR`, falling back to the default address.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::with_addr(std::env::var(ADDR_VAR).ok().as_deref())
    }

    /// Build a config from an optional address override.
    pub fn with_addr(addr: Option<&str>) -> Result<Self, ConfigError> {
        let value = addr.map(str::trim).filter(|s| !s.is_empty()).unwrap_or(DEFAULT_ADDR);
        let addr = value.parse().map_err(|source| ConfigError::InvalidAddr {
            var: ADDR_VAR,
            value: value.to_string(),
            source,
        })?;
        Ok(Self {
            addr,
            channel_capacity: CHANNEL_CAPACITY,
        })
    }
}
