use crate::application::analytics::indicator_engine::IndicatorEngine;
use crate::application::analytics::pearson::pearson;
use crate::domain::types::{CorrelationResult, SeriesSlice};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

/// Lagged cross-symbol correlation search over the SMA series.
///
/// For every base symbol the trailing `window` SMA points are matched against
/// every window-sized slice of every symbol's SMA history (its own included),
/// and the single highest-coefficient match is kept.
pub struct CorrelationEngine {
    symbols: Vec<String>,
    window: usize,
    latest: Mutex<HashMap<String, CorrelationResult>>,
}

impl std::fmt::Debug for CorrelationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CorrelationEngine")
            .field("symbols", &self.symbols)
            .field("window", &self.window)
            .finish()
    }
}

impl CorrelationEngine {
    pub fn new(symbols: Vec<String>, window: usize) -> Self {
        Self {
            symbols,
            window,
            latest: Mutex::new(HashMap::new()),
        }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, CorrelationResult>> {
        match self.latest.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                tracing::error!("CorrelationEngine: Lock poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    /// Search every base symbol against a single SMA snapshot.
    ///
    /// Base symbols with too little history, or without any candidate, produce
    /// no result and leave their previous latest result in place.
    pub fn run_pass(&self, indicators: &IndicatorEngine, as_of: i64) -> Vec<CorrelationResult> {
        let snapshot = indicators.sma_snapshot();

        let results: Vec<CorrelationResult> = self
            .symbols
            .iter()
            .filter_map(|base| best_match(base, &snapshot, &self.symbols, self.window, as_of))
            .collect();

        let mut latest = self.lock();
        for result in &results {
            debug!(
                "CorrelationEngine: {} best match {} (r={:.4}, lag start {})",
                result.symbol_a, result.symbol_b, result.coefficient, result.lagged_window_start_ms
            );
            latest.insert(result.symbol_a.clone(), result.clone());
        }

        results
    }

    /// Most recent result recorded for `symbol` as a base.
    pub fn latest(&self, symbol: &str) -> Option<CorrelationResult> {
        self.lock().get(symbol).cloned()
    }
}

/// Number of window offsets to try against a candidate series of length `len`.
///
/// A self-pair stops two offsets short so the base window is never compared
/// with itself.
pub fn slide_count(len: usize, window: usize, self_pair: bool) -> usize {
    if window == 0 || len < window {
        return 0;
    }
    let full = len - window + 1;
    if self_pair { full.saturating_sub(2) } else { full }
}

/// Highest-coefficient `(candidate, offset)` for `base`.
///
/// Candidates are visited in `symbols` order and offsets ascending; the first
/// of several equal coefficients wins.
pub fn best_match(
    base: &str,
    snapshot: &HashMap<String, SeriesSlice>,
    symbols: &[String],
    window: usize,
    as_of: i64,
) -> Option<CorrelationResult> {
    let base_series = snapshot.get(base)?;
    if window == 0 || base_series.len() < window {
        return None;
    }
    let reference = base_series.tail(window).values;

    let mut best: Option<CorrelationResult> = None;
    for candidate in symbols {
        let Some(series) = snapshot.get(candidate) else {
            continue;
        };
        let offsets = slide_count(series.len(), window, candidate == base);

        for offset in 0..offsets {
            let coefficient = pearson(&reference, &series.values[offset..offset + window]);
            if best.as_ref().is_none_or(|b| coefficient > b.coefficient) {
                best = Some(CorrelationResult {
                    symbol_a: base.to_string(),
                    symbol_b: candidate.clone(),
                    coefficient,
                    as_of_ms: as_of,
                    lagged_window_start_ms: series.timestamps[offset],
                });
            }
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slice(values: &[f64]) -> SeriesSlice {
        SeriesSlice {
            values: values.to_vec(),
            timestamps: (0..values.len() as i64).map(|i| i * 60_000).collect(),
        }
    }

    fn names(symbols: &[&str]) -> Vec<String> {
        symbols.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_slide_count() {
        assert_eq!(slide_count(10, 5, false), 6);
        assert_eq!(slide_count(10, 5, true), 4);
        assert_eq!(slide_count(5, 5, false), 1);
        assert_eq!(slide_count(6, 5, true), 0);
        assert_eq!(slide_count(4, 5, false), 0);
    }

    #[test]
    fn test_short_base_is_skipped() {
        let snapshot = HashMap::from([
            ("A".to_string(), slice(&[1.0, 2.0, 3.0])),
            ("B".to_string(), slice(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0])),
        ]);
        assert!(best_match("A", &snapshot, &names(&["A", "B"]), 5, 0).is_none());
    }

    #[test]
    fn test_no_candidate_yields_none() {
        // Self-pair with exactly W + 1 points has no offsets, other symbol too short
        let snapshot = HashMap::from([
            ("A".to_string(), slice(&[1.0, 4.0, 2.0, 8.0, 5.0, 7.0])),
            ("B".to_string(), slice(&[1.0, 2.0])),
        ]);
        assert!(best_match("A", &snapshot, &names(&["A", "B"]), 5, 0).is_none());
    }

    #[test]
    fn test_prefers_maximum_not_absolute() {
        let base = [1.0, 3.0, 2.0, 5.0, 4.0];
        let flipped: Vec<f64> = base.iter().map(|v| -v).collect();
        let weak = [1.0, 2.0, 3.0, 4.0, 5.0];
        let snapshot = HashMap::from([
            ("A".to_string(), slice(&base)),
            ("NEG".to_string(), slice(&flipped)),
            ("WEAK".to_string(), slice(&weak)),
        ]);

        let result = best_match("A", &snapshot, &names(&["A", "NEG", "WEAK"]), 5, 99).unwrap();
        assert_eq!(result.symbol_b, "WEAK");
        assert!(result.coefficient > 0.0 && result.coefficient < 1.0);
        assert_eq!(result.as_of_ms, 99);
    }

    #[test]
    fn test_tie_keeps_first_candidate() {
        let base = [2.0, 9.0, 4.0, 7.0, 1.0];
        let snapshot = HashMap::from([
            ("A".to_string(), slice(&base)),
            ("B".to_string(), slice(&base)),
            ("C".to_string(), slice(&base)),
        ]);

        let result = best_match("A", &snapshot, &names(&["A", "B", "C"]), 5, 0).unwrap();
        assert_eq!(result.symbol_b, "B");
        assert!((result.coefficient - 1.0).abs() < 1e-9);
    }
}
