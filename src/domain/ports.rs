use crate::domain::types::{CorrelationResult, SeriesPoint, Tick};

/// Receiver of raw trades coming off the exchange feed.
///
/// Called from the transport's receive path, so implementations must not
/// block for longer than an in-memory append.
pub trait TickSink: Send + Sync {
    fn on_tick(&self, tick: Tick);
}

/// Host CPU utilisation probe, sampled once per scheduler tick.
pub trait CpuSampler: Send + Sync {
    /// Idle percentage since the previous sample, or a negative value when
    /// the probe is unavailable (the tick is then not recorded).
    fn sample_idle_percent(&self) -> f64;
}

/// One line of the write-behind audit trail.
#[derive(Debug, Clone, PartialEq)]
pub enum AuditRecord {
    Tick {
        tick: Tick,
        received_at: i64,
    },
    Average {
        symbol: String,
        point: SeriesPoint,
        delay_ms: i64,
    },
    Correlation {
        result: CorrelationResult,
        delay_ms: i64,
    },
    CpuIdle {
        timestamp: i64,
        idle_pct: f64,
    },
}

/// Fire-and-forget audit trail. Never read back by the engines.
pub trait AuditSink: Send + Sync {
    fn record(&self, record: AuditRecord);
}
