use crate::application::analytics::{CorrelationEngine, IndicatorEngine};
use crate::application::market_data::MeasurementStore;
use crate::domain::ports::{AuditRecord, AuditSink};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;
use tracing::{debug, error, info};

/// Wait for the next boundary on `rx`.
///
/// Returns `None` once the scheduler is gone or shutdown has been signalled,
/// even if a boundary is still pending.
async fn next_tick(
    rx: &mut watch::Receiver<Option<i64>>,
    shutdown: &watch::Receiver<bool>,
) -> Option<i64> {
    loop {
        rx.changed().await.ok()?;
        if *shutdown.borrow() {
            return None;
        }
        if let Some(boundary) = *rx.borrow_and_update() {
            return Some(boundary);
        }
    }
}

/// Runs one full indicator pass per received boundary.
///
/// The pass itself is CPU-bound and runs on the blocking pool; audit lines for
/// the SMA points are emitted after it returns, outside the engine lock.
pub async fn run_indicator_worker(
    engine: Arc<IndicatorEngine>,
    store: Arc<MeasurementStore>,
    audit: Arc<dyn AuditSink>,
    mut rx: watch::Receiver<Option<i64>>,
    shutdown: watch::Receiver<bool>,
) {
    info!("IndicatorWorker: started");

    while let Some(boundary) = next_tick(&mut rx, &shutdown).await {
        let started = Instant::now();
        let engine = engine.clone();
        let store = store.clone();

        match tokio::task::spawn_blocking(move || engine.run_pass(&store, boundary)).await {
            Ok(points) => {
                let delay_ms = chrono::Utc::now().timestamp_millis() - boundary;
                for (symbol, point) in points {
                    audit.record(AuditRecord::Average {
                        symbol,
                        point,
                        delay_ms,
                    });
                }
                debug!(
                    "IndicatorWorker: pass for {} done in {:?}",
                    boundary,
                    started.elapsed()
                );
            }
            Err(e) => {
                error!("IndicatorWorker: pass for {} failed: {}", boundary, e);
            }
        }
    }

    info!("IndicatorWorker: stopped");
}

/// Runs one correlation search per received boundary.
pub async fn run_correlation_worker(
    engine: Arc<CorrelationEngine>,
    indicators: Arc<IndicatorEngine>,
    audit: Arc<dyn AuditSink>,
    mut rx: watch::Receiver<Option<i64>>,
    shutdown: watch::Receiver<bool>,
) {
    info!("CorrelationWorker: started");

    while let Some(boundary) = next_tick(&mut rx, &shutdown).await {
        let started = Instant::now();
        let engine = engine.clone();
        let indicators = indicators.clone();

        match tokio::task::spawn_blocking(move || engine.run_pass(&indicators, boundary)).await {
            Ok(results) => {
                let delay_ms = chrono::Utc::now().timestamp_millis() - boundary;
                let found = results.len();
                for result in results {
                    audit.record(AuditRecord::Correlation { result, delay_ms });
                }
                debug!(
                    "CorrelationWorker: {} matches for {} in {:?}",
                    found,
                    boundary,
                    started.elapsed()
                );
            }
            Err(e) => {
                error!("CorrelationWorker: pass for {} failed: {}", boundary, e);
            }
        }
    }

    info!("CorrelationWorker: stopped");
}
