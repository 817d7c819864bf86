use crate::domain::errors::QueryError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Milliseconds in one minute. EMA windows are expressed in minutes of this length.
pub const MINUTE_MS: i64 = 60_000;

/// A single observed trade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    pub symbol: String,
    pub price: f64,
    pub size: f64,
    /// Exchange timestamp in milliseconds
    pub timestamp: i64,
}

impl Tick {
    pub fn new(symbol: impl Into<String>, price: f64, size: f64, timestamp: i64) -> Self {
        Self {
            symbol: symbol.into(),
            price,
            size,
            timestamp,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub value: f64,
    pub timestamp: i64,
}

/// Column-oriented copy of a series, as served to readers.
///
/// `values` and `timestamps` always have the same length.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SeriesSlice {
    pub values: Vec<f64>,
    pub timestamps: Vec<i64>,
}

impl SeriesSlice {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn last_value(&self) -> Option<f64> {
        self.values.last().copied()
    }

    /// Trailing `count` points. Returns everything when fewer exist.
    pub fn tail(&self, count: usize) -> SeriesSlice {
        let start = self.len().saturating_sub(count);
        SeriesSlice {
            values: self.values[start..].to_vec(),
            timestamps: self.timestamps[start..].to_vec(),
        }
    }
}

impl FromIterator<SeriesPoint> for SeriesSlice {
    fn from_iter<I: IntoIterator<Item = SeriesPoint>>(iter: I) -> Self {
        let iter = iter.into_iter();
        let (lower, _) = iter.size_hint();
        let mut slice = SeriesSlice {
            values: Vec::with_capacity(lower),
            timestamps: Vec::with_capacity(lower),
        };
        for point in iter {
            slice.values.push(point.value);
            slice.timestamps.push(point.timestamp);
        }
        slice
    }
}

/// Every derived series kept per symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IndicatorKind {
    Sma,
    ShortEma,
    LongEma,
    Macd,
    Signal,
    Distance,
    ClosingPrice,
    ClosingVolume,
}

impl IndicatorKind {
    pub const ALL: [IndicatorKind; 8] = [
        IndicatorKind::Sma,
        IndicatorKind::ShortEma,
        IndicatorKind::LongEma,
        IndicatorKind::Macd,
        IndicatorKind::Signal,
        IndicatorKind::Distance,
        IndicatorKind::ClosingPrice,
        IndicatorKind::ClosingVolume,
    ];
}

impl fmt::Display for IndicatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IndicatorKind::Sma => "SMA",
            IndicatorKind::ShortEma => "EMA(short)",
            IndicatorKind::LongEma => "EMA(long)",
            IndicatorKind::Macd => "MACD",
            IndicatorKind::Signal => "Signal",
            IndicatorKind::Distance => "Distance",
            IndicatorKind::ClosingPrice => "Close",
            IndicatorKind::ClosingVolume => "Volume",
        };
        write!(f, "{}", name)
    }
}

/// Discriminator for the two EMA series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmaKind {
    Short,
    Long,
}

impl FromStr for EmaKind {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "short" => Ok(EmaKind::Short),
            "long" => Ok(EmaKind::Long),
            other => Err(QueryError::InvalidEmaType(other.to_string())),
        }
    }
}

impl From<EmaKind> for IndicatorKind {
    fn from(kind: EmaKind) -> Self {
        match kind {
            EmaKind::Short => IndicatorKind::ShortEma,
            EmaKind::Long => IndicatorKind::LongEma,
        }
    }
}

/// Best lagged match for one base symbol at one scheduler tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationResult {
    pub symbol_a: String,
    pub symbol_b: String,
    pub coefficient: f64,
    pub as_of_ms: i64,
    pub lagged_window_start_ms: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ema_kind_parsing() {
        assert_eq!("short".parse::<EmaKind>().unwrap(), EmaKind::Short);
        assert_eq!("long".parse::<EmaKind>().unwrap(), EmaKind::Long);

        let err = "medium".parse::<EmaKind>().unwrap_err();
        assert_eq!(err, QueryError::InvalidEmaType("medium".to_string()));
        // Case matters, as on the wire
        assert!("SHORT".parse::<EmaKind>().is_err());
    }

    #[test]
    fn test_series_slice_from_points_and_tail() {
        let slice: SeriesSlice = (0..5)
            .map(|i| SeriesPoint {
                value: i as f64,
                timestamp: i * MINUTE_MS,
            })
            .collect();

        assert_eq!(slice.len(), 5);
        assert_eq!(slice.last_value(), Some(4.0));

        let tail = slice.tail(2);
        assert_eq!(tail.values, vec![3.0, 4.0]);
        assert_eq!(tail.timestamps, vec![3 * MINUTE_MS, 4 * MINUTE_MS]);

        assert_eq!(slice.tail(50), slice);
    }
}
