//! Market feed configuration parsing from environment variables.

use super::{Lookup, parse_var, string_var};
use anyhow::Result;

pub const DEFAULT_SYMBOLS: [&str; 8] = [
    "BTC-USDT",
    "ADA-USDT",
    "ETH-USDT",
    "DOGE-USDT",
    "XRP-USDT",
    "SOL-USDT",
    "LTC-USDT",
    "BNB-USDT",
];

const DEFAULT_OKX_WS_URL: &str = "wss://ws.okx.com:8443/ws/v5/public";

/// Market feed environment configuration
#[derive(Debug, Clone)]
pub struct MarketEnvConfig {
    pub symbols: Vec<String>,
    pub okx_ws_url: String,
    pub feed_enabled: bool,
}

impl Default for MarketEnvConfig {
    fn default() -> Self {
        Self {
            symbols: DEFAULT_SYMBOLS.iter().map(|s| s.to_string()).collect(),
            okx_ws_url: DEFAULT_OKX_WS_URL.to_string(),
            feed_enabled: true,
        }
    }
}

impl MarketEnvConfig {
    pub(crate) fn from_lookup(lookup: Lookup<'_>) -> Result<Self> {
        let defaults = Self::default();

        let symbols: Vec<String> = match lookup("SYMBOLS") {
            Some(raw) => raw
                .split(',')
                .map(|s| s.trim().to_uppercase())
                .filter(|s| !s.is_empty())
                .collect(),
            None => defaults.symbols,
        };
        if symbols.is_empty() {
            anyhow::bail!("SYMBOLS must name at least one instrument");
        }

        Ok(Self {
            symbols,
            okx_ws_url: string_var(lookup, "OKX_WS_URL", DEFAULT_OKX_WS_URL),
            feed_enabled: parse_var(lookup, "FEED_ENABLED", defaults.feed_enabled)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbols_are_normalized() {
        let lookup = |key: &str| (key == "SYMBOLS").then(|| " btc-usdt, eth-usdt ,,".to_string());
        let config = MarketEnvConfig::from_lookup(&lookup).unwrap();
        assert_eq!(config.symbols, vec!["BTC-USDT", "ETH-USDT"]);
        assert_eq!(config.okx_ws_url, DEFAULT_OKX_WS_URL);
    }

    #[test]
    fn test_empty_symbol_list_rejected() {
        let lookup = |key: &str| (key == "SYMBOLS").then(|| " , ".to_string());
        assert!(MarketEnvConfig::from_lookup(&lookup).is_err());
    }
}
