//! Indicator and scheduler configuration parsing from environment variables.
//!
//! Windows are configured in minutes and exposed in milliseconds, which is
//! the unit every engine works in.

use super::{Lookup, parse_var};
use crate::domain::types::MINUTE_MS;
use anyhow::Result;

/// Indicator environment configuration
#[derive(Debug, Clone)]
pub struct IndicatorEnvConfig {
    pub measurement_retention_minutes: i64,
    pub history_retention_minutes: i64,
    pub short_ema_minutes: i64,
    pub long_ema_minutes: i64,
    pub signal_minutes: i64,
    pub closing_lookback_minutes: i64,
    pub correlation_window: usize,
    pub tick_interval_ms: i64,
}

impl Default for IndicatorEnvConfig {
    fn default() -> Self {
        Self {
            measurement_retention_minutes: 26,
            history_retention_minutes: 3 * 24 * 60,
            short_ema_minutes: 12,
            long_ema_minutes: 26,
            signal_minutes: 9,
            closing_lookback_minutes: 1,
            correlation_window: 5,
            tick_interval_ms: MINUTE_MS,
        }
    }
}

impl IndicatorEnvConfig {
    pub(crate) fn from_lookup(lookup: Lookup<'_>) -> Result<Self> {
        let d = Self::default();
        let config = Self {
            measurement_retention_minutes: parse_var(
                lookup,
                "MEASUREMENT_RETENTION_MINUTES",
                d.measurement_retention_minutes,
            )?,
            history_retention_minutes: parse_var(
                lookup,
                "HISTORY_RETENTION_MINUTES",
                d.history_retention_minutes,
            )?,
            short_ema_minutes: parse_var(lookup, "SHORT_EMA_MINUTES", d.short_ema_minutes)?,
            long_ema_minutes: parse_var(lookup, "LONG_EMA_MINUTES", d.long_ema_minutes)?,
            signal_minutes: parse_var(lookup, "SIGNAL_MINUTES", d.signal_minutes)?,
            closing_lookback_minutes: parse_var(
                lookup,
                "CLOSING_LOOKBACK_MINUTES",
                d.closing_lookback_minutes,
            )?,
            correlation_window: parse_var(lookup, "CORRELATION_WINDOW", d.correlation_window)?,
            tick_interval_ms: parse_var(lookup, "TICK_INTERVAL_MS", d.tick_interval_ms)?,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let windows = [
            ("MEASUREMENT_RETENTION_MINUTES", self.measurement_retention_minutes),
            ("HISTORY_RETENTION_MINUTES", self.history_retention_minutes),
            ("SHORT_EMA_MINUTES", self.short_ema_minutes),
            ("LONG_EMA_MINUTES", self.long_ema_minutes),
            ("SIGNAL_MINUTES", self.signal_minutes),
            ("CLOSING_LOOKBACK_MINUTES", self.closing_lookback_minutes),
            ("TICK_INTERVAL_MS", self.tick_interval_ms),
        ];
        for (key, value) in windows {
            if value <= 0 {
                anyhow::bail!("{} must be positive, got {}", key, value);
            }
        }
        if self.correlation_window < 2 {
            anyhow::bail!(
                "CORRELATION_WINDOW must be at least 2, got {}",
                self.correlation_window
            );
        }
        Ok(())
    }

    pub fn measurement_retention_ms(&self) -> i64 {
        self.measurement_retention_minutes * MINUTE_MS
    }

    pub fn history_retention_ms(&self) -> i64 {
        self.history_retention_minutes * MINUTE_MS
    }

    pub fn short_ema_window_ms(&self) -> i64 {
        self.short_ema_minutes * MINUTE_MS
    }

    pub fn long_ema_window_ms(&self) -> i64 {
        self.long_ema_minutes * MINUTE_MS
    }

    pub fn signal_window_ms(&self) -> i64 {
        self.signal_minutes * MINUTE_MS
    }

    pub fn closing_lookback_ms(&self) -> i64 {
        self.closing_lookback_minutes * MINUTE_MS
    }
}
