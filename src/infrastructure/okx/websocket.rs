use crate::domain::ports::TickSink;
use crate::infrastructure::okx::messages::{FeedMessage, parse_message, subscribe_request};
use anyhow::{Context, Result};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

const MAX_BACKOFF_SECS: u64 = 60;
/// OKX drops idle public connections after 30s.
const PING_INTERVAL: Duration = Duration::from_secs(25);

/// Streams public trades for a fixed symbol list into a [`TickSink`].
pub struct OkxTradeFeed {
    ws_url: String,
    symbols: Vec<String>,
    sink: Arc<dyn TickSink>,
}

impl OkxTradeFeed {
    pub fn new(ws_url: String, symbols: Vec<String>, sink: Arc<dyn TickSink>) -> Self {
        Self {
            ws_url,
            symbols,
            sink,
        }
    }

    /// Connect and stream forever, reconnecting with exponential backoff.
    /// Stops only when the task is aborted.
    pub async fn run(self) {
        let mut backoff = 1;

        loop {
            match self.connect_and_stream().await {
                Ok(_) => {
                    info!("OKX WebSocket connection closed, reconnecting...");
                    tokio::time::sleep(Duration::from_secs(1)).await;
                    backoff = 1;
                }
                Err(e) => {
                    error!("OKX WebSocket error: {:#}. Reconnecting in {}s...", e, backoff);
                    tokio::time::sleep(Duration::from_secs(backoff)).await;
                    backoff = (backoff * 2).min(MAX_BACKOFF_SECS);
                }
            }
        }
    }

    async fn connect_and_stream(&self) -> Result<()> {
        info!("Connecting to OKX WebSocket: {}", self.ws_url);

        let (ws_stream, _) = connect_async(self.ws_url.as_str())
            .await
            .context("Failed to connect to OKX WebSocket")?;
        let (mut write, mut read) = ws_stream.split();

        write
            .send(Message::Text(subscribe_request(&self.symbols).into()))
            .await
            .context("Failed to send subscription")?;
        info!(
            "OKX WebSocket connected, subscribing to {} symbols",
            self.symbols.len()
        );

        let mut ping = tokio::time::interval(PING_INTERVAL);
        ping.tick().await;

        loop {
            tokio::select! {
                _ = ping.tick() => {
                    write
                        .send(Message::Text("ping".into()))
                        .await
                        .context("Failed to send keep-alive")?;
                }
                frame = read.next() => {
                    let Some(frame) = frame else {
                        return Ok(());
                    };
                    match frame.context("OKX WebSocket read error")? {
                        Message::Text(text) => self.handle_text(&text),
                        Message::Ping(payload) => {
                            write.send(Message::Pong(payload)).await.ok();
                        }
                        Message::Close(frame) => {
                            match frame {
                                Some(cf) => info!(
                                    "OKX WebSocket closed by server: Code {} Reason '{}'",
                                    cf.code, cf.reason
                                ),
                                None => info!("OKX WebSocket closed by server (No info)"),
                            }
                            return Ok(());
                        }
                        _ => {}
                    }
                }
            }
        }
    }

    fn handle_text(&self, text: &str) {
        match parse_message(text) {
            Ok(FeedMessage::Trades(ticks)) => {
                for tick in ticks {
                    self.sink.on_tick(tick);
                }
            }
            Ok(FeedMessage::Subscribed) => debug!("OKX subscription confirmed"),
            Ok(FeedMessage::Pong) | Ok(FeedMessage::Other) => {}
            Err(e) => warn!("Skipping OKX frame: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::Tick;
    use std::sync::Mutex;

    #[derive(Default)]
    struct CollectingSink {
        ticks: Mutex<Vec<Tick>>,
    }

    impl TickSink for CollectingSink {
        fn on_tick(&self, tick: Tick) {
            self.ticks.lock().unwrap().push(tick);
        }
    }

    #[test]
    fn test_handle_text_forwards_every_trade_and_skips_garbage() {
        let sink = Arc::new(CollectingSink::default());
        let feed = OkxTradeFeed::new(
            "wss://example.invalid".to_string(),
            vec!["ETH-USDT".to_string()],
            sink.clone(),
        );

        feed.handle_text(r#"{"event":"subscribe","arg":{"channel":"trades","instId":"ETH-USDT"}}"#);
        feed.handle_text(
            r#"{"data":[{"instId":"ETH-USDT","px":"2500.5","sz":"1","ts":"10"},{"instId":"ETH-USDT","px":"2501","sz":"2","ts":"11"}]}"#,
        );
        feed.handle_text("{broken");
        feed.handle_text("pong");

        let ticks = sink.ticks.lock().unwrap();
        assert_eq!(ticks.len(), 2);
        assert_eq!(ticks[1], Tick::new("ETH-USDT", 2501.0, 2.0, 11));
    }
}
