//! Read-only HTTP facade over the indicator and correlation engines.

pub mod downsample;
pub mod error;
pub mod handlers;

pub use error::ApiError;

use crate::application::analytics::{CorrelationEngine, IndicatorEngine};
use axum::Router;
use axum::routing::get;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::cors::CorsLayer;
use tracing::info;

pub struct QueryState {
    pub indicators: Arc<IndicatorEngine>,
    pub correlation: Arc<CorrelationEngine>,
    /// Responses longer than this are downsampled
    pub max_points: usize,
}

pub fn router(state: Arc<QueryState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/sma", get(handlers::sma))
        .route("/ema", get(handlers::ema))
        .route("/macd", get(handlers::macd))
        .route("/signal", get(handlers::signal))
        .route("/distance", get(handlers::distance))
        .route("/close", get(handlers::close))
        .route("/volume", get(handlers::volume))
        .route("/correlation", get(handlers::correlation))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve until `shutdown` turns true.
pub async fn serve(
    listener: TcpListener,
    state: Arc<QueryState>,
    mut shutdown: watch::Receiver<bool>,
) -> std::io::Result<()> {
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move {
            let _ = shutdown.wait_for(|stop| *stop).await;
            info!("Query server shutting down");
        })
        .await
}
