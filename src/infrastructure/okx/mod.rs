pub mod messages;
pub mod websocket;

pub use messages::{FeedMessage, parse_message, subscribe_request};
pub use websocket::OkxTradeFeed;
