//! Finnhub WebSocket Message Types
//!
//! Wire format types for the Finnhub push feed. All messages are JSON
//! objects with a `type` discriminator.
//!
//! # Inbound
//!
//! ```json
//! {"type":"trade","data":[{"s":"AAPL","p":150.25,"v":100,"t":1690000000000}]}
//! {"type":"ping"}
//! {"type":"error","msg":"Invalid symbol"}
//! ```
//!
//! # Outbound
//!
//! ```json
//! {"type":"subscribe","symbol":"AAPL"}
//! {"type":"unsubscribe","symbol":"AAPL"}
//! ```

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One trade item inside a `trade` message's `data` array.
///
/// `v` (volume) is optional: Finnhub omits it on some venues, and such
/// items are treated as partial quotes that still update the latest value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeItem {
    /// Ticker symbol.
    #[serde(rename = "s")]
    pub symbol: String,

    /// Last price.
    #[serde(rename = "p")]
    pub price: Decimal,

    /// Volume, if reported.
    #[serde(rename = "v", default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<Decimal>,

    /// Event timestamp in milliseconds since the Unix epoch.
    #[serde(rename = "t")]
    pub timestamp_ms: i64,
}

/// Decoded inbound feed message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FeedMessage {
    /// Batch of trade observations.
    Trade {
        /// The trade items in this batch.
        #[serde(default)]
        data: Vec<TradeItem>,
    },
    /// Server liveness ping. No reply is required; WebSocket-level
    /// ping/pong is handled by the transport.
    Ping,
    /// Server-reported error. The connection stays up.
    Error {
        /// Error description from the server.
        msg: String,
    },
}

/// Outbound subscribe/unsubscribe request for one symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SubscribeRequest {
    /// Subscribe to a symbol's trade stream.
    Subscribe {
        /// Ticker symbol (upper-case).
        symbol: String,
    },
    /// Unsubscribe from a symbol's trade stream.
    Unsubscribe {
        /// Ticker symbol (upper-case).
        symbol: String,
    },
}

impl SubscribeRequest {
    /// Build a subscribe request for one symbol.
    #[must_use]
    pub fn subscribe(symbol: impl Into<String>) -> Self {
        Self::Subscribe {
            symbol: symbol.into(),
        }
    }

    /// Build an unsubscribe request for one symbol.
    #[must_use]
    pub fn unsubscribe(symbol: impl Into<String>) -> Self {
        Self::Unsubscribe {
            symbol: symbol.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trade_message_deserializes() {
        let json = r#"{"type":"trade","data":[{"s":"AAPL","p":150.25,"v":100,"t":1690000000000}]}"#;
        let msg: FeedMessage = serde_json::from_str(json).unwrap();

        let FeedMessage::Trade { data } = msg else {
            panic!("expected Trade, got {msg:?}");
        };
        assert_eq!(data.len(), 1);
        assert_eq!(data[0].symbol, "AAPL");
        assert_eq!(data[0].price, Decimal::new(15025, 2));
        assert_eq!(data[0].volume, Some(Decimal::new(100, 0)));
        assert_eq!(data[0].timestamp_ms, 1_690_000_000_000);
    }

    #[test]
    fn trade_item_without_volume() {
        let json = r#"{"type":"trade","data":[{"s":"MSFT","p":410.5,"t":1000}]}"#;
        let msg: FeedMessage = serde_json::from_str(json).unwrap();

        let FeedMessage::Trade { data } = msg else {
            panic!("expected Trade");
        };
        assert!(data[0].volume.is_none());
    }

    #[test]
    fn ping_message_deserializes() {
        let msg: FeedMessage = serde_json::from_str(r#"{"type":"ping"}"#).unwrap();
        assert_eq!(msg, FeedMessage::Ping);
    }

    #[test]
    fn error_message_deserializes() {
        let msg: FeedMessage =
            serde_json::from_str(r#"{"type":"error","msg":"Invalid symbol"}"#).unwrap();
        assert_eq!(
            msg,
            FeedMessage::Error {
                msg: "Invalid symbol".to_string()
            }
        );
    }

    #[test]
    fn subscribe_request_serializes() {
        let json = serde_json::to_string(&SubscribeRequest::subscribe("AAPL")).unwrap();
        assert_eq!(json, r#"{"type":"subscribe","symbol":"AAPL"}"#);

        let json = serde_json::to_string(&SubscribeRequest::unsubscribe("AAPL")).unwrap();
        assert_eq!(json, r#"{"type":"unsubscribe","symbol":"AAPL"}"#);
    }
}
