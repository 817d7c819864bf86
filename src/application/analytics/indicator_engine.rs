//! Per-symbol indicator cascade.
//!
//! Once per scheduler tick every configured symbol gets exactly one new point
//! in each of its series, in this order:
//!
//! 1. SMA: volume-weighted mean price over the measurement window (`0` when
//!    there is no volume).
//! 2. Short / long EMA of the latest trade price in each lookback window.
//! 3. MACD = short EMA - long EMA, once both are seeded.
//! 4. Signal = EMA of MACD.
//! 5. Distance = MACD - Signal, once both are non-zero.
//! 6. Closing price / volume of the most recent trade in the closing lookback.
//!
//! A stage with nothing to work from repeats its previous value instead of
//! writing zero, so a quiet minute never resets the MACD cascade.

use crate::application::analytics::series::Series;
use crate::application::market_data::MeasurementStore;
use crate::config::IndicatorEnvConfig;
use crate::domain::errors::{IndicatorError, QueryError};
use crate::domain::types::{EmaKind, IndicatorKind, MINUTE_MS, SeriesPoint, SeriesSlice, Tick};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use ta::Next;
use ta::indicators::ExponentialMovingAverage;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct IndicatorSettings {
    pub measurement_window_ms: i64,
    pub short_ema_window_ms: i64,
    pub long_ema_window_ms: i64,
    pub signal_window_ms: i64,
    pub closing_lookback_ms: i64,
    pub history_retention_ms: i64,
}

impl Default for IndicatorSettings {
    fn default() -> Self {
        Self::from(&IndicatorEnvConfig::default())
    }
}

impl From<&IndicatorEnvConfig> for IndicatorSettings {
    fn from(config: &IndicatorEnvConfig) -> Self {
        Self {
            measurement_window_ms: config.measurement_retention_ms(),
            short_ema_window_ms: config.short_ema_window_ms(),
            long_ema_window_ms: config.long_ema_window_ms(),
            signal_window_ms: config.signal_window_ms(),
            closing_lookback_ms: config.closing_lookback_ms(),
            history_retention_ms: config.history_retention_ms(),
        }
    }
}

/// EMA over a window given in milliseconds, one period per minute.
fn ema_for_window(
    stage: &'static str,
    window_ms: i64,
) -> Result<ExponentialMovingAverage, IndicatorError> {
    let minutes = window_ms / MINUTE_MS;
    usize::try_from(minutes)
        .ok()
        .and_then(|period| ExponentialMovingAverage::new(period).ok())
        .ok_or(IndicatorError::InvalidPeriod { stage, minutes })
}

#[derive(Debug)]
struct SymbolIndicators {
    short_ema_state: ExponentialMovingAverage,
    long_ema_state: ExponentialMovingAverage,
    signal_state: ExponentialMovingAverage,
    sma: Series,
    short_ema: Series,
    long_ema: Series,
    macd: Series,
    signal: Series,
    distance: Series,
    closing_price: Series,
    closing_volume: Series,
}

impl SymbolIndicators {
    fn new(settings: &IndicatorSettings) -> Result<Self, IndicatorError> {
        Ok(Self {
            short_ema_state: ema_for_window("short EMA", settings.short_ema_window_ms)?,
            long_ema_state: ema_for_window("long EMA", settings.long_ema_window_ms)?,
            signal_state: ema_for_window("signal", settings.signal_window_ms)?,
            sma: Series::default(),
            short_ema: Series::default(),
            long_ema: Series::default(),
            macd: Series::default(),
            signal: Series::default(),
            distance: Series::default(),
            closing_price: Series::default(),
            closing_volume: Series::default(),
        })
    }

    fn series(&self, kind: IndicatorKind) -> &Series {
        match kind {
            IndicatorKind::Sma => &self.sma,
            IndicatorKind::ShortEma => &self.short_ema,
            IndicatorKind::LongEma => &self.long_ema,
            IndicatorKind::Macd => &self.macd,
            IndicatorKind::Signal => &self.signal,
            IndicatorKind::Distance => &self.distance,
            IndicatorKind::ClosingPrice => &self.closing_price,
            IndicatorKind::ClosingVolume => &self.closing_volume,
        }
    }

    fn evict_older_than(&mut self, retention_ms: i64, as_of: i64) -> usize {
        [
            &mut self.sma,
            &mut self.short_ema,
            &mut self.long_ema,
            &mut self.macd,
            &mut self.signal,
            &mut self.distance,
            &mut self.closing_price,
            &mut self.closing_volume,
        ]
        .into_iter()
        .map(|series| series.evict_older_than(retention_ms, as_of))
        .sum()
    }
}

/// What the measurement store held for one symbol at one tick.
#[derive(Debug, Clone, Default)]
struct TickInputs {
    sma: f64,
    short_price: Option<f64>,
    long_price: Option<f64>,
    closing: Option<(f64, f64)>,
}

/// Size-weighted mean trade price, or `0.0` when the total size is zero.
pub fn volume_weighted_average(ticks: &[Tick]) -> f64 {
    let (weighted, volume) = ticks
        .iter()
        .fold((0.0, 0.0), |(w, v), t| (w + t.price * t.size, v + t.size));
    if volume > 0.0 { weighted / volume } else { 0.0 }
}

pub struct IndicatorEngine {
    symbols: Vec<String>,
    settings: IndicatorSettings,
    state: Mutex<HashMap<String, SymbolIndicators>>,
}

impl std::fmt::Debug for IndicatorEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndicatorEngine")
            .field("symbols", &self.symbols)
            .field("settings", &self.settings)
            .finish()
    }
}

impl IndicatorEngine {
    /// Fails when an EMA window is shorter than one minute.
    pub fn new(symbols: Vec<String>, settings: IndicatorSettings) -> Result<Self, IndicatorError> {
        let state = symbols
            .iter()
            .map(|s| SymbolIndicators::new(&settings).map(|series| (s.clone(), series)))
            .collect::<Result<HashMap<_, _>, _>>()?;

        Ok(Self {
            symbols,
            settings,
            state: Mutex::new(state),
        })
    }

    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    pub fn settings(&self) -> &IndicatorSettings {
        &self.settings
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, SymbolIndicators>> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                tracing::error!("IndicatorEngine: Lock poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn gather_inputs(&self, store: &MeasurementStore, symbol: &str, as_of: i64) -> TickInputs {
        let latest_price = |window_ms: i64| {
            store
                .recent_since(symbol, window_ms, as_of)
                .last()
                .map(|t| t.price)
        };

        let measurement = store.recent_since(symbol, self.settings.measurement_window_ms, as_of);

        TickInputs {
            sma: volume_weighted_average(&measurement),
            short_price: latest_price(self.settings.short_ema_window_ms),
            long_price: latest_price(self.settings.long_ema_window_ms),
            closing: store
                .recent_since(symbol, self.settings.closing_lookback_ms, as_of)
                .last()
                .map(|t| (t.price, t.size)),
        }
    }

    fn apply_cascade(series: &mut SymbolIndicators, inputs: &TickInputs, as_of: i64) {
        series.sma.push(inputs.sma, as_of);

        // No trade in the window: the EMA is not stepped and its last value repeats
        let short = match inputs.short_price {
            Some(price) => series.short_ema_state.next(price),
            None => series.short_ema.latest_or_zero(),
        };
        series.short_ema.push(short, as_of);

        let long = match inputs.long_price {
            Some(price) => series.long_ema_state.next(price),
            None => series.long_ema.latest_or_zero(),
        };
        series.long_ema.push(long, as_of);

        let macd = if short != 0.0 && long != 0.0 {
            short - long
        } else {
            series.macd.latest_or_zero()
        };
        series.macd.push(macd, as_of);

        let signal = if macd != 0.0 {
            series.signal_state.next(macd)
        } else {
            series.signal.latest_or_zero()
        };
        series.signal.push(signal, as_of);

        let distance = if macd != 0.0 && signal != 0.0 {
            macd - signal
        } else {
            series.distance.latest_or_zero()
        };
        series.distance.push(distance, as_of);

        let (close, volume) = inputs.closing.unwrap_or_else(|| {
            (
                series.closing_price.latest_or_zero(),
                series.closing_volume.latest_or_zero(),
            )
        });
        series.closing_price.push(close, as_of);
        series.closing_volume.push(volume, as_of);
    }

    /// Run the whole cascade for every configured symbol at boundary `as_of`.
    ///
    /// Store reads happen first; the indicator lock is then held once for the
    /// entire pass, so concurrent readers see all symbols at the same tick.
    /// Returns the SMA point written for each symbol.
    pub fn run_pass(&self, store: &MeasurementStore, as_of: i64) -> Vec<(String, SeriesPoint)> {
        let inputs: Vec<(&String, TickInputs)> = self
            .symbols
            .iter()
            .map(|symbol| (symbol, self.gather_inputs(store, symbol, as_of)))
            .collect();

        let mut state = self.lock();
        inputs
            .into_iter()
            .filter_map(|(symbol, inputs)| {
                let series = state.get_mut(symbol.as_str())?;
                Self::apply_cascade(series, &inputs, as_of);
                debug!(
                    "IndicatorEngine: {} SMA={:.6} EMA(s)={:.6} EMA(l)={:.6} MACD={:.6}",
                    symbol,
                    inputs.sma,
                    series.short_ema.latest_or_zero(),
                    series.long_ema.latest_or_zero(),
                    series.macd.latest_or_zero()
                );
                Some((
                    symbol.clone(),
                    SeriesPoint {
                        value: inputs.sma,
                        timestamp: as_of,
                    },
                ))
            })
            .collect()
    }

    /// Apply the history horizon to every series of every symbol.
    pub fn evict_older_than(&self, as_of: i64) -> usize {
        let retention = self.settings.history_retention_ms;
        self.lock()
            .values_mut()
            .map(|series| series.evict_older_than(retention, as_of))
            .sum()
    }

    /// Trailing `window_points` of one series (all points when `0`).
    /// Unknown symbols yield an empty slice.
    pub fn recent(&self, kind: IndicatorKind, symbol: &str, window_points: usize) -> SeriesSlice {
        self.lock()
            .get(symbol)
            .map(|series| series.series(kind).tail(window_points))
            .unwrap_or_default()
    }

    pub fn recent_averages(&self, symbol: &str, window_points: usize) -> SeriesSlice {
        self.recent(IndicatorKind::Sma, symbol, window_points)
    }

    /// `ema_type` must be `"short"` or `"long"`.
    pub fn recent_ema(
        &self,
        symbol: &str,
        window_points: usize,
        ema_type: &str,
    ) -> Result<SeriesSlice, QueryError> {
        let kind: EmaKind = ema_type.parse()?;
        Ok(self.recent(kind.into(), symbol, window_points))
    }

    pub fn recent_macd(&self, symbol: &str, window_points: usize) -> SeriesSlice {
        self.recent(IndicatorKind::Macd, symbol, window_points)
    }

    pub fn recent_signal(&self, symbol: &str, window_points: usize) -> SeriesSlice {
        self.recent(IndicatorKind::Signal, symbol, window_points)
    }

    pub fn recent_distance(&self, symbol: &str, window_points: usize) -> SeriesSlice {
        self.recent(IndicatorKind::Distance, symbol, window_points)
    }

    pub fn recent_close(&self, symbol: &str, window_points: usize) -> SeriesSlice {
        self.recent(IndicatorKind::ClosingPrice, symbol, window_points)
    }

    pub fn recent_close_volume(&self, symbol: &str, window_points: usize) -> SeriesSlice {
        self.recent(IndicatorKind::ClosingVolume, symbol, window_points)
    }

    /// Copy of every symbol's full SMA series, taken under one lock.
    pub fn sma_snapshot(&self) -> HashMap<String, SeriesSlice> {
        self.lock()
            .iter()
            .map(|(symbol, series)| (symbol.clone(), series.sma.tail(0)))
            .collect()
    }
}
