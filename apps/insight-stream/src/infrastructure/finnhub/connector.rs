//! Feed Connector
//!
//! Owns the upstream WebSocket connection for the process lifetime:
//! connects, subscribes the watched symbols, decodes inbound frames into
//! [`Trade`] events, and supervises reconnection with exponential backoff.
//!
//! Connection failures are retried indefinitely by default; individual
//! malformed messages are dropped and counted. Nothing that happens on
//! this task can unwind into the store or the query layer.

use std::collections::HashSet;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

use crate::domain::market::{Trade, normalize_symbol};
use crate::infrastructure::metrics;

use super::codec::JsonCodec;
use super::messages::{FeedMessage, SubscribeRequest, TradeItem};
use super::reconnect::{ReconnectConfig, ReconnectPolicy};
use super::status::{ConnectionState, FeedStatus};

// =============================================================================
// Error Type
// =============================================================================

/// Errors that can occur in the feed connector.
#[derive(Debug, thiserror::Error)]
pub enum ConnectorError {
    /// WebSocket connection failed.
    #[error("WebSocket connection failed: {0}")]
    ConnectionFailed(String),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Event channel closed; the ingestion task is gone.
    #[error("event channel closed")]
    ChannelClosed,

    /// Maximum reconnection attempts exceeded.
    #[error("maximum reconnection attempts exceeded")]
    MaxReconnectAttemptsExceeded,

    /// Connection closed by the server or the stream ended.
    #[error("connection closed")]
    ConnectionClosed,
}

// =============================================================================
// Connector Events
// =============================================================================

/// Events emitted by the feed connector.
#[derive(Debug, Clone)]
pub enum FeedEvent {
    /// Connected and subscribed to all watched symbols.
    Connected,
    /// Disconnected from the server.
    Disconnected,
    /// Reconnecting to the server.
    Reconnecting {
        /// Reconnection attempt number.
        attempt: u32,
    },
    /// A decoded, validated trade.
    Trade(Trade),
    /// Server-reported error (connection stays up).
    Error(String),
}

// =============================================================================
// Connector Configuration
// =============================================================================

/// Configuration for the feed connector.
#[derive(Clone)]
pub struct ConnectorConfig {
    /// WebSocket endpoint, without the token query parameter.
    pub url: String,
    /// Upstream API token.
    pub token: String,
    /// Symbols to subscribe to (upper-case).
    pub symbols: Vec<String>,
    /// Reconnection configuration.
    pub reconnect: ReconnectConfig,
}

impl ConnectorConfig {
    /// Create a new configuration with default reconnect behavior.
    /// Symbols are upper-case normalized.
    #[must_use]
    pub fn new(url: impl Into<String>, token: impl Into<String>, symbols: &[String]) -> Self {
        Self {
            url: url.into(),
            token: token.into(),
            symbols: symbols.iter().map(|s| normalize_symbol(s)).collect(),
            reconnect: ReconnectConfig::default(),
        }
    }

    /// The full connection URL including the token.
    #[must_use]
    pub fn connect_url(&self) -> String {
        format!("{}?token={}", self.url, self.token)
    }
}

impl std::fmt::Debug for ConnectorConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectorConfig")
            .field("url", &self.url)
            .field("token", &"[REDACTED]")
            .field("symbols", &self.symbols)
            .field("reconnect", &self.reconnect)
            .finish()
    }
}

// =============================================================================
// Feed Connector
// =============================================================================

/// Finnhub WebSocket connector.
///
/// Manages the connection lifecycle:
/// - subscription replay after every (re)connect
/// - trade decoding and validation
/// - automatic reconnection with exponential backoff
pub struct FeedConnector {
    config: ConnectorConfig,
    watched: HashSet<String>,
    codec: JsonCodec,
    event_tx: mpsc::Sender<FeedEvent>,
    cancel: CancellationToken,
    status: Arc<FeedStatus>,
}

impl FeedConnector {
    /// Create a new feed connector.
    #[must_use]
    pub fn new(
        config: ConnectorConfig,
        event_tx: mpsc::Sender<FeedEvent>,
        cancel: CancellationToken,
        status: Arc<FeedStatus>,
    ) -> Self {
        let watched = config.symbols.iter().cloned().collect();
        Self {
            config,
            watched,
            codec: JsonCodec::new(),
            event_tx,
            cancel,
            status,
        }
    }

    /// Shared connection status handle.
    #[must_use]
    pub fn status(&self) -> Arc<FeedStatus> {
        Arc::clone(&self.status)
    }

    /// Run the connector loop until cancelled or retries are exhausted.
    ///
    /// # Errors
    ///
    /// Returns an error only when the reconnect attempt cap (if any) is
    /// exceeded or the downstream event channel is gone; ordinary
    /// connection failures are retried.
    pub async fn run(self: Arc<Self>) -> Result<(), ConnectorError> {
        let mut reconnect_policy = ReconnectPolicy::new(self.config.reconnect.clone());

        loop {
            if self.cancel.is_cancelled() {
                tracing::info!("feed connector cancelled");
                return Ok(());
            }

            match self.connect_and_run(&mut reconnect_policy).await {
                Ok(()) => {
                    tracing::info!("feed connection closed gracefully");
                    return Ok(());
                }
                Err(ConnectorError::ChannelClosed) => {
                    tracing::info!("ingest channel closed, stopping connector");
                    return Err(ConnectorError::ChannelClosed);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "feed connection error");

                    self.status.set_state(ConnectionState::Disconnected);
                    metrics::set_connection_state(ConnectionState::Disconnected);
                    let _ = self.event_tx.send(FeedEvent::Disconnected).await;

                    if let Some(delay) = reconnect_policy.next_delay() {
                        let attempt = reconnect_policy.attempt_count();
                        tracing::info!(
                            attempt,
                            delay_ms = delay.as_millis(),
                            "reconnecting to feed"
                        );

                        self.status.record_reconnect_attempt();
                        metrics::record_reconnect();
                        let _ = self.event_tx.send(FeedEvent::Reconnecting { attempt }).await;

                        tokio::select! {
                            () = self.cancel.cancelled() => {
                                tracing::info!("feed connector cancelled during reconnect delay");
                                return Ok(());
                            }
                            () = tokio::time::sleep(delay) => {}
                        }
                    } else {
                        return Err(ConnectorError::MaxReconnectAttemptsExceeded);
                    }
                }
            }
        }
    }

    /// Connect, subscribe, and process messages until error or cancellation.
    async fn connect_and_run(
        &self,
        reconnect_policy: &mut ReconnectPolicy,
    ) -> Result<(), ConnectorError> {
        tracing::info!(url = %self.config.url, "connecting to feed");
        self.status.set_state(ConnectionState::Connecting);
        metrics::set_connection_state(ConnectionState::Connecting);

        let (ws_stream, _response) =
            tokio_tungstenite::connect_async(self.config.connect_url()).await?;

        let (mut write, mut read) = ws_stream.split();

        // Subscription state does not survive the upstream connection:
        // replay every watched symbol on each (re)connect.
        for symbol in &self.config.symbols {
            let request = SubscribeRequest::subscribe(symbol.clone());
            let json = self.codec.encode(&request).map_err(|e| {
                ConnectorError::ConnectionFailed(format!("failed to serialize subscribe: {e}"))
            })?;
            write.send(Message::Text(json.into())).await?;
            tracing::debug!(symbol = %symbol, "subscribe request sent");
        }

        self.status.set_state(ConnectionState::Subscribed);
        metrics::set_connection_state(ConnectionState::Subscribed);
        reconnect_policy.reset();
        self.status.reset_reconnect_attempts();

        if self.event_tx.send(FeedEvent::Connected).await.is_err() {
            return Err(ConnectorError::ChannelClosed);
        }
        tracing::info!(symbols = self.config.symbols.len(), "feed subscribed");

        loop {
            tokio::select! {
                () = self.cancel.cancelled() => {
                    return Ok(());
                }
                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            self.handle_text_message(&text).await?;
                        }
                        Some(Ok(Message::Ping(data))) => {
                            write.send(Message::Pong(data)).await?;
                        }
                        Some(Ok(Message::Close(_))) => {
                            tracing::info!("server sent close frame");
                            return Err(ConnectorError::ConnectionClosed);
                        }
                        Some(Ok(_)) => {
                            // Ignore pong/binary/frame messages
                        }
                        Some(Err(e)) => {
                            return Err(e.into());
                        }
                        None => {
                            tracing::info!("WebSocket stream ended");
                            return Err(ConnectorError::ConnectionClosed);
                        }
                    }
                }
            }
        }
    }

    /// Handle a text frame from the feed.
    async fn handle_text_message(&self, text: &str) -> Result<(), ConnectorError> {
        self.status.record_message();
        metrics::record_message_received();

        let message = match self.codec.decode(text) {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!(error = %e, "dropping undecodable frame");
                self.status.record_dropped();
                metrics::record_decode_failure();
                return Ok(());
            }
        };

        match message {
            FeedMessage::Trade { data } => {
                if self.status.state() == ConnectionState::Subscribed {
                    self.status.set_state(ConnectionState::Streaming);
                    metrics::set_connection_state(ConnectionState::Streaming);
                }
                for item in data {
                    self.handle_trade_item(item).await?;
                }
            }
            FeedMessage::Ping => {
                tracing::debug!("feed ping received");
            }
            FeedMessage::Error { msg } => {
                tracing::warn!(msg = %msg, "feed error message");
                self.status.record_dropped();
                metrics::record_message_dropped();
                if self.event_tx.send(FeedEvent::Error(msg)).await.is_err() {
                    return Err(ConnectorError::ChannelClosed);
                }
            }
        }

        Ok(())
    }

    /// Validate one trade item and forward it downstream.
    async fn handle_trade_item(&self, item: TradeItem) -> Result<(), ConnectorError> {
        let symbol = normalize_symbol(&item.symbol);

        if !self.watched.contains(&symbol) {
            tracing::debug!(symbol = %symbol, "dropping trade for unwatched symbol");
            self.status.record_dropped();
            metrics::record_message_dropped();
            return Ok(());
        }

        if item.price.is_sign_negative() || item.price.is_zero() {
            tracing::warn!(symbol = %symbol, price = %item.price, "dropping non-positive price");
            self.status.record_dropped();
            metrics::record_message_dropped();
            return Ok(());
        }

        if let Some(volume) = item.volume
            && volume.is_sign_negative()
        {
            tracing::warn!(symbol = %symbol, volume = %volume, "dropping negative volume");
            self.status.record_dropped();
            metrics::record_message_dropped();
            return Ok(());
        }

        let trade = Trade {
            symbol,
            price: item.price,
            volume: item.volume,
            timestamp_ms: item.timestamp_ms,
        };

        self.status.record_trade();
        metrics::record_trade_ingested();

        if self.event_tx.send(FeedEvent::Trade(trade)).await.is_err() {
            return Err(ConnectorError::ChannelClosed);
        }
        Ok(())
    }
}
