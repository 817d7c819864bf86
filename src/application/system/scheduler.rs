use crate::application::analytics::IndicatorEngine;
use crate::application::market_data::MeasurementStore;
use crate::domain::ports::{AuditRecord, AuditSink, CpuSampler};
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Receiving ends of the per-worker tick handshakes.
///
/// Each channel holds at most one pending boundary: a newer boundary sent
/// while a worker is busy replaces the older one, so a slow worker coalesces
/// ticks instead of queueing them.
pub struct TickReceivers {
    pub indicator: watch::Receiver<Option<i64>>,
    pub correlation: watch::Receiver<Option<i64>>,
}

/// Wall-clock aligned driver for the indicator and correlation workers.
pub struct TickScheduler {
    store: Arc<MeasurementStore>,
    indicators: Arc<IndicatorEngine>,
    sampler: Arc<dyn CpuSampler>,
    audit: Arc<dyn AuditSink>,
    interval_ms: i64,
    measurement_retention_ms: i64,
    indicator_tx: watch::Sender<Option<i64>>,
    correlation_tx: watch::Sender<Option<i64>>,
    last_dispatched: AtomicI64,
}

/// First multiple of `interval_ms` strictly after `now_ms`.
pub fn next_boundary(now_ms: i64, interval_ms: i64) -> i64 {
    (now_ms.div_euclid(interval_ms) + 1) * interval_ms
}

impl TickScheduler {
    pub fn new(
        store: Arc<MeasurementStore>,
        indicators: Arc<IndicatorEngine>,
        sampler: Arc<dyn CpuSampler>,
        audit: Arc<dyn AuditSink>,
        interval_ms: i64,
        measurement_retention_ms: i64,
    ) -> (Self, TickReceivers) {
        let (indicator_tx, indicator_rx) = watch::channel(None);
        let (correlation_tx, correlation_rx) = watch::channel(None);

        let scheduler = Self {
            store,
            indicators,
            sampler,
            audit,
            interval_ms,
            measurement_retention_ms,
            indicator_tx,
            correlation_tx,
            last_dispatched: AtomicI64::new(i64::MIN),
        };

        (
            scheduler,
            TickReceivers {
                indicator: indicator_rx,
                correlation: correlation_rx,
            },
        )
    }

    /// Everything that happens at one boundary: evict both histories, wake
    /// both workers, then sample the host CPU. Never waits for the workers.
    ///
    /// Boundaries must increase; a repeated or earlier one (wall clock stepped
    /// back) is skipped and `false` is returned.
    pub fn dispatch(&self, boundary: i64) -> bool {
        let previous = self.last_dispatched.fetch_max(boundary, Ordering::SeqCst);
        if previous >= boundary {
            warn!(
                "TickScheduler: boundary {} not after last dispatched {}, skipping",
                boundary, previous
            );
            return false;
        }

        let ticks = self
            .store
            .evict_older_than(self.measurement_retention_ms, boundary);
        let points = self.indicators.evict_older_than(boundary);
        if ticks > 0 || points > 0 {
            debug!(
                "TickScheduler: evicted {} ticks and {} indicator points at {}",
                ticks, points, boundary
            );
        }

        self.indicator_tx.send_replace(Some(boundary));
        self.correlation_tx.send_replace(Some(boundary));

        let idle_pct = self.sampler.sample_idle_percent();
        if idle_pct < 0.0 {
            debug!("TickScheduler: CPU sample unavailable, skipping");
            return true;
        }
        debug!("TickScheduler: CPU idle {:.2}% at {}", idle_pct, boundary);
        self.audit.record(AuditRecord::CpuIdle {
            timestamp: boundary,
            idle_pct,
        });
        true
    }

    /// Sleep to each boundary and dispatch it until `shutdown` turns true.
    ///
    /// Dropping the scheduler on return closes both tick channels, which is
    /// what stops the workers.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(
            "TickScheduler: started (interval {}ms)",
            self.interval_ms
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            let now = chrono::Utc::now().timestamp_millis();
            let boundary = next_boundary(now, self.interval_ms);
            let wait = Duration::from_millis((boundary - now).max(0) as u64);

            tokio::select! {
                _ = tokio::time::sleep(wait) => {
                    self.dispatch(boundary);
                }
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        warn!("TickScheduler: shutdown sender dropped, stopping");
                    }
                    break;
                }
            }
        }

        info!("TickScheduler: stopped");
    }
}
