//! Configuration module for Cryptomon.
//!
//! This module provides structured configuration loading from environment variables,
//! organized by concern: Market feed, Indicators, Query server, and Audit log.

mod audit_config;
mod indicator_config;
mod market_config;
mod server_config;

pub use audit_config::AuditEnvConfig;
pub use indicator_config::IndicatorEnvConfig;
pub use market_config::{DEFAULT_SYMBOLS, MarketEnvConfig};
pub use server_config::ServerEnvConfig;

use anyhow::{Context, Result};
use std::env;
use std::fmt::Display;
use std::str::FromStr;

/// Variable lookup used by every sub-config. `from_env` plugs in the process
/// environment; tests plug in a map.
pub(crate) type Lookup<'a> = &'a dyn Fn(&str) -> Option<String>;

/// Parse `key` if set (and non-blank), otherwise return `default`.
pub(crate) fn parse_var<T>(lookup: Lookup<'_>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    match lookup(key).map(|raw| raw.trim().to_string()) {
        Some(raw) if !raw.is_empty() => raw
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("{}", e))
            .with_context(|| format!("Failed to parse {}={}", key, raw)),
        _ => Ok(default),
    }
}

pub(crate) fn string_var(lookup: Lookup<'_>, key: &str, default: &str) -> String {
    lookup(key)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Main application configuration.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub market: MarketEnvConfig,
    pub indicators: IndicatorEnvConfig,
    pub server: ServerEnvConfig,
    pub audit: AuditEnvConfig,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(&|key: &str| env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: Lookup<'_>) -> Result<Self> {
        let market = MarketEnvConfig::from_lookup(lookup).context("Failed to load market config")?;
        let indicators =
            IndicatorEnvConfig::from_lookup(lookup).context("Failed to load indicator config")?;
        let server = ServerEnvConfig::from_lookup(lookup).context("Failed to load server config")?;
        let audit = AuditEnvConfig::from_lookup(lookup).context("Failed to load audit config")?;

        Ok(Self {
            market,
            indicators,
            server,
            audit,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_config_defaults_when_unset() {
        let config = Config::from_lookup(&lookup_from(&[])).unwrap();
        assert_eq!(config.market.symbols.len(), DEFAULT_SYMBOLS.len());
        assert_eq!(config.indicators.correlation_window, 5);
        assert_eq!(config.server.port, 8080);
        assert!(config.audit.enabled);
    }

    #[test]
    fn test_invalid_number_names_the_variable() {
        let err = Config::from_lookup(&lookup_from(&[("SERVER_PORT", "eighty")])).unwrap_err();
        let chain = format!("{:#}", err);
        assert!(chain.contains("SERVER_PORT"), "got: {}", chain);
    }

    #[test]
    fn test_blank_value_falls_back_to_default() {
        let lookup = lookup_from(&[("SIGNAL_MINUTES", "  ")]);
        let value: i64 = parse_var(&lookup, "SIGNAL_MINUTES", 9).unwrap();
        assert_eq!(value, 9);
    }
}
