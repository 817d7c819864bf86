use crate::domain::errors::FeedError;
use crate::domain::types::Tick;
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Serialize)]
struct SubscribeRequest<'a> {
    op: &'static str,
    args: Vec<ChannelArg<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ChannelArg<'a> {
    channel: &'static str,
    inst_id: &'a str,
}

/// Subscription frame for the public `trades` channel of every symbol.
pub fn subscribe_request(symbols: &[String]) -> String {
    let request = SubscribeRequest {
        op: "subscribe",
        args: symbols
            .iter()
            .map(|s| ChannelArg {
                channel: "trades",
                inst_id: s,
            })
            .collect(),
    };
    // Serializing plain strings cannot fail
    serde_json::to_string(&request).unwrap_or_default()
}

#[derive(Debug, Deserialize)]
struct RawMessage {
    event: Option<String>,
    code: Option<String>,
    msg: Option<String>,
    data: Option<Vec<RawTrade>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTrade {
    inst_id: String,
    px: String,
    sz: String,
    ts: String,
}

/// Decoded inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedMessage {
    /// Acknowledgement of a subscription request
    Subscribed,
    Trades(Vec<Tick>),
    Pong,
    /// Any other event frame (e.g. `channel-conn-count`)
    Other,
}

fn parse_number<T: std::str::FromStr>(field: &'static str, value: &str) -> Result<T, FeedError> {
    value.parse::<T>().map_err(|_| FeedError::InvalidNumber {
        field,
        value: value.to_string(),
    })
}

impl TryFrom<RawTrade> for Tick {
    type Error = FeedError;

    fn try_from(raw: RawTrade) -> Result<Self, Self::Error> {
        Ok(Tick::new(
            raw.inst_id,
            parse_number("px", &raw.px)?,
            parse_number("sz", &raw.sz)?,
            parse_number("ts", &raw.ts)?,
        ))
    }
}

/// Decode one text frame from the public websocket.
///
/// A trade with an unparseable number is logged and skipped; the rest of its
/// `data` array is still returned.
pub fn parse_message(text: &str) -> Result<FeedMessage, FeedError> {
    if text == "pong" {
        return Ok(FeedMessage::Pong);
    }

    let raw: RawMessage = serde_json::from_str(text)?;

    match raw.event.as_deref() {
        Some("subscribe") => return Ok(FeedMessage::Subscribed),
        Some("error") => {
            return Err(FeedError::Rejected {
                code: raw.code.unwrap_or_default(),
                msg: raw.msg.unwrap_or_default(),
            });
        }
        Some(_) => return Ok(FeedMessage::Other),
        None => {}
    }

    match raw.data {
        Some(trades) => {
            let ticks = trades
                .into_iter()
                .filter_map(|raw| match Tick::try_from(raw) {
                    Ok(tick) => Some(tick),
                    Err(e) => {
                        warn!("OkxTradeFeed: skipping trade: {}", e);
                        None
                    }
                })
                .collect();
            Ok(FeedMessage::Trades(ticks))
        }
        None => Err(FeedError::Malformed {
            reason: "frame has neither event nor data".to_string(),
        }),
    }
}
