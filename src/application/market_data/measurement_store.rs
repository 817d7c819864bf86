use crate::domain::ports::{AuditRecord, AuditSink, TickSink};
use crate::domain::types::Tick;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

/// Append-only, per-symbol buffer of raw trades.
///
/// Ticks are kept in arrival order, which is taken to be time order. Growth
/// is bounded by [`MeasurementStore::evict_older_than`], called once per
/// scheduler tick, not by a capacity cap.
pub struct MeasurementStore {
    windows: Mutex<HashMap<String, VecDeque<Tick>>>,
    audit: Option<Arc<dyn AuditSink>>,
}

impl std::fmt::Debug for MeasurementStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MeasurementStore")
            .field("windows", &"<Mutex>")
            .field("audit", &self.audit.is_some())
            .finish()
    }
}

impl MeasurementStore {
    pub fn new() -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
            audit: None,
        }
    }

    pub fn with_audit(audit: Arc<dyn AuditSink>) -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
            audit: Some(audit),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, VecDeque<Tick>>> {
        match self.windows.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                tracing::error!("MeasurementStore: Lock poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    /// Insert at the tail of the symbol's window. Timestamp order is not checked.
    pub fn append(&self, tick: Tick) {
        let record = self.audit.as_ref().map(|_| AuditRecord::Tick {
            tick: tick.clone(),
            received_at: chrono::Utc::now().timestamp_millis(),
        });

        self.lock()
            .entry(tick.symbol.clone())
            .or_default()
            .push_back(tick);

        // Audit after the lock is released
        if let (Some(audit), Some(record)) = (&self.audit, record) {
            audit.record(record);
        }
    }

    /// Ticks for `symbol` no older than `window_ms` relative to `as_of`.
    ///
    /// Ticks stamped after `as_of` are included. Unknown symbols yield an
    /// empty vector.
    pub fn recent_since(&self, symbol: &str, window_ms: i64, as_of: i64) -> Vec<Tick> {
        let windows = self.lock();
        match windows.get(symbol) {
            Some(window) => window
                .iter()
                .filter(|t| as_of - t.timestamp <= window_ms)
                .cloned()
                .collect(),
            None => Vec::new(),
        }
    }

    /// Drop ticks from the head of every window while
    /// `as_of - front.timestamp > retention_ms`, always keeping the newest
    /// tick of each symbol. Returns how many were removed.
    pub fn evict_older_than(&self, retention_ms: i64, as_of: i64) -> usize {
        let mut windows = self.lock();
        let mut evicted = 0;
        for (symbol, window) in windows.iter_mut() {
            let before = window.len();
            while window.len() > 1
                && window
                    .front()
                    .is_some_and(|t| as_of - t.timestamp > retention_ms)
            {
                window.pop_front();
            }
            let removed = before - window.len();
            if removed > 0 {
                debug!("MeasurementStore: {} evicted {} ticks", symbol, removed);
            }
            evicted += removed;
        }
        evicted
    }

    /// Number of ticks currently retained for `symbol`.
    pub fn len(&self, symbol: &str) -> usize {
        self.lock().get(symbol).map_or(0, VecDeque::len)
    }

    pub fn is_empty(&self) -> bool {
        self.lock().values().all(VecDeque::is_empty)
    }
}

impl Default for MeasurementStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TickSink for MeasurementStore {
    fn on_tick(&self, tick: Tick) {
        self.append(tick);
    }
}
