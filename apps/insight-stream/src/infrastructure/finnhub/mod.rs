//! Finnhub WebSocket Feed
//!
//! Adapter for Finnhub's push feed: wire message types, the JSON codec,
//! the reconnect policy, shared connection status, and the connector task
//! that owns the connection for the process lifetime.

pub mod codec;
pub mod connector;
pub mod messages;
pub mod reconnect;
pub mod status;

pub use codec::{CodecError, JsonCodec};
pub use connector::{ConnectorConfig, ConnectorError, FeedConnector, FeedEvent};
pub use messages::{FeedMessage, SubscribeRequest, TradeItem};
pub use reconnect::{ReconnectConfig, ReconnectPolicy};
pub use status::{ConnectionState, FeedStatus};
