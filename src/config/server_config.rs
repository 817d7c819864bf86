//! Query server configuration parsing from environment variables.

use super::{Lookup, parse_var, string_var};
use anyhow::{Context, Result};
use std::net::SocketAddr;

/// Query server environment configuration
#[derive(Debug, Clone)]
pub struct ServerEnvConfig {
    pub enabled: bool,
    pub bind_address: String,
    pub port: u16,
    /// Responses longer than this are downsampled before serialization
    pub max_response_points: usize,
}

impl Default for ServerEnvConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind_address: "0.0.0.0".to_string(),
            port: 8080,
            max_response_points: 200,
        }
    }
}

impl ServerEnvConfig {
    pub(crate) fn from_lookup(lookup: Lookup<'_>) -> Result<Self> {
        let d = Self::default();
        let config = Self {
            enabled: parse_var(lookup, "SERVER_ENABLED", d.enabled)?,
            bind_address: string_var(lookup, "SERVER_BIND_ADDRESS", &d.bind_address),
            port: parse_var(lookup, "SERVER_PORT", d.port)?,
            max_response_points: parse_var(lookup, "MAX_RESPONSE_POINTS", d.max_response_points)?,
        };
        if config.max_response_points == 0 {
            anyhow::bail!("MAX_RESPONSE_POINTS must be positive");
        }
        Ok(config)
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.bind_address, self.port)
            .parse()
            .with_context(|| format!("Invalid bind address {}:{}", self.bind_address, self.port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_config_defaults() {
        let config = ServerEnvConfig::from_lookup(&|_: &str| -> Option<String> { None }).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.max_response_points, 200);
        assert_eq!(config.socket_addr().unwrap().port(), 8080);
    }

    #[test]
    fn test_bad_bind_address() {
        let config = ServerEnvConfig {
            bind_address: "not an ip".to_string(),
            ..ServerEnvConfig::default()
        };
        assert!(config.socket_addr().is_err());
    }
}
