use crate::domain::ports::{AuditRecord, AuditSink};
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

/// Producer half of the write-behind audit trail.
///
/// `record` only enqueues, so it is safe to call from any thread, including
/// the blocking pool. A disabled log drops every record.
#[derive(Debug, Clone)]
pub struct AuditLog {
    tx: Option<mpsc::UnboundedSender<AuditRecord>>,
}

impl AuditLog {
    pub fn new(dir: impl Into<PathBuf>) -> (Self, AuditWriter) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self { tx: Some(tx) },
            AuditWriter {
                dir: dir.into(),
                rx,
            },
        )
    }

    pub fn disabled() -> Self {
        Self { tx: None }
    }
}

impl AuditSink for AuditLog {
    fn record(&self, record: AuditRecord) {
        if let Some(tx) = &self.tx
            && tx.send(record).is_err()
        {
            debug!("AuditLog: writer gone, record dropped");
        }
    }
}

/// Consumer half: the single task that owns the files.
pub struct AuditWriter {
    dir: PathBuf,
    rx: mpsc::UnboundedReceiver<AuditRecord>,
}

/// File a record is appended to, relative to the audit directory.
pub fn file_name(record: &AuditRecord) -> String {
    match record {
        AuditRecord::Tick { tick, .. } => format!("meas_{}.txt", tick.symbol),
        AuditRecord::Average { .. } => "average.txt".to_string(),
        AuditRecord::Correlation { .. } => "pearson.txt".to_string(),
        AuditRecord::CpuIdle { .. } => "cpu_stats.txt".to_string(),
    }
}

/// One whitespace-separated line, newline included.
pub fn format_line(record: &AuditRecord) -> String {
    match record {
        AuditRecord::Tick { tick, received_at } => format!(
            "{} {} {} {}\n",
            tick.price,
            tick.size,
            tick.timestamp,
            received_at - tick.timestamp
        ),
        AuditRecord::Average {
            symbol,
            point,
            delay_ms,
        } => format!(
            "{} {:.6} {} {}\n",
            symbol, point.value, point.timestamp, delay_ms
        ),
        AuditRecord::Correlation { result, delay_ms } => format!(
            "{} {} {:.6} {} {} {}\n",
            result.symbol_a,
            result.symbol_b,
            result.coefficient,
            result.lagged_window_start_ms,
            result.as_of_ms,
            delay_ms
        ),
        AuditRecord::CpuIdle {
            timestamp,
            idle_pct,
        } => format!("{} {:.2}\n", timestamp, idle_pct),
    }
}

impl AuditWriter {
    /// Append records until every producer is gone or `shutdown` fires.
    /// On shutdown the queue is drained before returning.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        if let Err(e) = tokio::fs::create_dir_all(&self.dir).await {
            warn!(
                "AuditWriter: cannot create {}: {}",
                self.dir.display(),
                e
            );
        }
        info!("AuditWriter: writing to {}", self.dir.display());

        loop {
            tokio::select! {
                maybe = self.rx.recv() => match maybe {
                    Some(record) => self.write(&record).await,
                    None => break,
                },
                _ = shutdown.changed() => {
                    while let Ok(record) = self.rx.try_recv() {
                        self.write(&record).await;
                    }
                    break;
                }
            }
        }

        info!("AuditWriter: stopped");
    }

    async fn write(&self, record: &AuditRecord) {
        let path = self.dir.join(file_name(record));
        let result = async {
            let mut file = tokio::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .await?;
            file.write_all(format_line(record).as_bytes()).await
        }
        .await;

        if let Err(e) = result {
            warn!("AuditWriter: write to {} failed: {}", path.display(), e);
        }
    }
}
