//! Cryptomon - live crypto indicator service
//!
//! Streams OKX public trades, derives per-minute indicators and the lagged
//! correlation search, and serves both over HTTP.
//!
//! # Usage
//! ```sh
//! SYMBOLS=BTC-USDT,ETH-USDT SERVER_PORT=8080 cargo run
//! ```
//!
//! See `config` for every environment variable. `RUST_LOG` overrides the
//! default `info` log level.

use anyhow::Result;
use cryptomon::application::system::Application;
use cryptomon::config::Config;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let stdout_layer = tracing_subscriber::fmt::layer().with_target(false);
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(stdout_layer)
        .init();

    info!("Cryptomon {} starting...", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;
    info!(
        "Configuration loaded: Symbols={:?}, Feed={}, Server={}:{}",
        config.market.symbols,
        config.market.feed_enabled,
        config.server.bind_address,
        config.server.port
    );

    let app = Application::build(config)?;
    let handle = app.start().await?;
    info!("Running. Press Ctrl+C to shutdown.");

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received.");
    handle.shutdown().await;

    Ok(())
}
