use crate::domain::types::{SeriesPoint, SeriesSlice};
use std::collections::VecDeque;

/// Append-only indicator history with time-based eviction.
#[derive(Debug, Clone, Default)]
pub struct Series {
    points: VecDeque<SeriesPoint>,
}

impl Series {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, value: f64, timestamp: i64) {
        self.points.push_back(SeriesPoint { value, timestamp });
    }

    pub fn latest(&self) -> Option<f64> {
        self.points.back().map(|p| p.value)
    }

    /// Latest value, with `0.0` standing in for "never written".
    pub fn latest_or_zero(&self) -> f64 {
        self.latest().unwrap_or(0.0)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Trailing `window_points` points, or every point when `window_points == 0`.
    pub fn tail(&self, window_points: usize) -> SeriesSlice {
        let start = if window_points > 0 {
            self.points.len().saturating_sub(window_points)
        } else {
            0
        };
        self.points.iter().skip(start).copied().collect()
    }

    /// Drop points from the head while `as_of - timestamp > retention_ms`.
    ///
    /// The newest point is never dropped: it is the carry-forward source for
    /// the next tick.
    pub fn evict_older_than(&mut self, retention_ms: i64, as_of: i64) -> usize {
        let mut evicted = 0;
        while self.points.len() > 1
            && self
                .points
                .front()
                .is_some_and(|p| as_of - p.timestamp > retention_ms)
        {
            self.points.pop_front();
            evicted += 1;
        }
        evicted
    }
}
