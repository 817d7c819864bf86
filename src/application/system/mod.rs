use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

pub mod scheduler;
pub mod workers;

use crate::application::analytics::{CorrelationEngine, IndicatorEngine, IndicatorSettings};
use crate::application::market_data::MeasurementStore;
use crate::application::system::scheduler::TickScheduler;
use crate::application::system::workers::{run_correlation_worker, run_indicator_worker};
use crate::config::Config;
use crate::domain::ports::{AuditSink, CpuSampler, TickSink};
use crate::infrastructure::audit_log::{AuditLog, AuditWriter};
use crate::infrastructure::cpu_stats::ProcStatSampler;
use crate::infrastructure::okx::OkxTradeFeed;
use crate::interfaces::http::{self, QueryState};

/// Running system. Engines stay readable until [`SystemHandle::shutdown`].
pub struct SystemHandle {
    pub store: Arc<MeasurementStore>,
    pub indicators: Arc<IndicatorEngine>,
    pub correlation: Arc<CorrelationEngine>,
    shutdown_tx: watch::Sender<bool>,
    audit_stop_tx: watch::Sender<bool>,
    scheduler: JoinHandle<()>,
    indicator_worker: JoinHandle<()>,
    correlation_worker: JoinHandle<()>,
    feed: Option<JoinHandle<()>>,
    server: Option<JoinHandle<()>>,
    audit_writer: Option<JoinHandle<()>>,
}

impl SystemHandle {
    /// Stop every task. In-flight indicator and correlation passes finish first,
    /// and the audit writer drains only after they have joined.
    pub async fn shutdown(self) {
        info!("Initiating Graceful Shutdown Sequence...");
        self.shutdown_tx.send_replace(true);

        if let Some(feed) = self.feed {
            feed.abort();
            info!("Step 1: Feed client stopped.");
        }

        if let Err(e) = self.scheduler.await {
            error!("Scheduler task ended abnormally: {}", e);
        }
        // The scheduler owned the tick senders, so both workers now drain and exit
        for (name, worker) in [
            ("indicator", self.indicator_worker),
            ("correlation", self.correlation_worker),
        ] {
            if let Err(e) = worker.await {
                error!("The {} worker ended abnormally: {}", name, e);
            }
        }
        info!("Step 2: Scheduler and workers stopped.");

        if let Some(server) = self.server
            && let Err(e) = server.await
        {
            error!("Query server task ended abnormally: {}", e);
        }

        self.audit_stop_tx.send_replace(true);
        if let Some(writer) = self.audit_writer
            && let Err(e) = writer.await
        {
            error!("Audit writer ended abnormally: {}", e);
        }

        info!("Graceful Shutdown Complete.");
    }
}

pub struct Application {
    pub config: Config,
    pub store: Arc<MeasurementStore>,
    pub indicators: Arc<IndicatorEngine>,
    pub correlation: Arc<CorrelationEngine>,
    audit: Arc<dyn AuditSink>,
    audit_writer: Option<AuditWriter>,
    sampler: Arc<dyn CpuSampler>,
}

impl Application {
    pub fn build(config: Config) -> Result<Self> {
        info!(
            "Building Cryptomon Application ({} symbols, tick every {}ms)...",
            config.market.symbols.len(),
            config.indicators.tick_interval_ms
        );

        let (audit, audit_writer) = if config.audit.enabled {
            let (log, writer) = AuditLog::new(config.audit.dir.clone());
            info!("Audit log enabled in {}", config.audit.dir.display());
            (log, Some(writer))
        } else {
            info!("Audit log disabled");
            (AuditLog::disabled(), None)
        };
        let audit: Arc<dyn AuditSink> = Arc::new(audit);

        let symbols = config.market.symbols.clone();
        let store = Arc::new(MeasurementStore::with_audit(audit.clone()));
        let indicators = Arc::new(IndicatorEngine::new(
            symbols.clone(),
            IndicatorSettings::from(&config.indicators),
        )?);
        let correlation = Arc::new(CorrelationEngine::new(
            symbols,
            config.indicators.correlation_window,
        ));

        Ok(Self {
            config,
            store,
            indicators,
            correlation,
            audit,
            audit_writer,
            sampler: Arc::new(ProcStatSampler::new()),
        })
    }

    /// Replace the host CPU probe (tests, non-Linux hosts).
    pub fn with_sampler(mut self, sampler: Arc<dyn CpuSampler>) -> Self {
        self.sampler = sampler;
        self
    }

    pub async fn start(self) -> Result<SystemHandle> {
        info!("Starting tasks...");

        // Bind before spawning so a taken port leaves nothing running
        let listener = if self.config.server.enabled {
            let addr = self.config.server.socket_addr()?;
            let listener = TcpListener::bind(addr)
                .await
                .with_context(|| format!("Failed to bind query server on {}", addr))?;
            info!("Query server listening on {}", addr);
            Some(listener)
        } else {
            None
        };

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (audit_stop_tx, audit_stop_rx) = watch::channel(false);

        let audit_writer = self
            .audit_writer
            .map(|writer| tokio::spawn(writer.run(audit_stop_rx)));

        let (scheduler, receivers) = TickScheduler::new(
            self.store.clone(),
            self.indicators.clone(),
            self.sampler.clone(),
            self.audit.clone(),
            self.config.indicators.tick_interval_ms,
            self.config.indicators.measurement_retention_ms(),
        );

        let indicator_worker = tokio::spawn(run_indicator_worker(
            self.indicators.clone(),
            self.store.clone(),
            self.audit.clone(),
            receivers.indicator,
            shutdown_rx.clone(),
        ));
        let correlation_worker = tokio::spawn(run_correlation_worker(
            self.correlation.clone(),
            self.indicators.clone(),
            self.audit.clone(),
            receivers.correlation,
            shutdown_rx.clone(),
        ));
        let scheduler = tokio::spawn(scheduler.run(shutdown_rx.clone()));

        let feed = if self.config.market.feed_enabled {
            let sink: Arc<dyn TickSink> = self.store.clone();
            let feed = OkxTradeFeed::new(
                self.config.market.okx_ws_url.clone(),
                self.config.market.symbols.clone(),
                sink,
            );
            Some(tokio::spawn(feed.run()))
        } else {
            warn!("Feed client disabled, no trades will be ingested");
            None
        };

        let server = listener.map(|listener| {
            let state = Arc::new(QueryState {
                indicators: self.indicators.clone(),
                correlation: self.correlation.clone(),
                max_points: self.config.server.max_response_points,
            });
            let shutdown = shutdown_rx.clone();
            tokio::spawn(async move {
                if let Err(e) = http::serve(listener, state, shutdown).await {
                    error!("Query server failed: {}", e);
                }
            })
        });

        info!("All tasks started.");

        Ok(SystemHandle {
            store: self.store,
            indicators: self.indicators,
            correlation: self.correlation,
            shutdown_tx,
            audit_stop_tx,
            scheduler,
            indicator_worker,
            correlation_worker,
            feed,
            server,
            audit_writer,
        })
    }
}
