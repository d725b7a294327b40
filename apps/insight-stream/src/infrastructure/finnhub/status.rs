//! Feed Connection Status
//!
//! Shared observability state for the feed connection: the connection
//! state machine position plus message and error counters. Written by the
//! connector, read by the health endpoint and tests.

use std::sync::atomic::{AtomicI32, AtomicU64, Ordering};

use parking_lot::RwLock;

/// Position in the connector's state machine.
///
/// `Disconnected → Connecting → Subscribed → Streaming`, regressing to
/// `Disconnected` on any connection error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    /// No connection; either starting up or between reconnect attempts.
    #[default]
    Disconnected,
    /// TCP/TLS/WebSocket handshake in progress.
    Connecting,
    /// Connected; subscribe requests sent, no trade seen yet.
    Subscribed,
    /// Subscribed and at least one message received.
    Streaming,
}

impl ConnectionState {
    /// Whether the upstream connection is currently established.
    #[must_use]
    pub const fn is_connected(&self) -> bool {
        matches!(self, Self::Subscribed | Self::Streaming)
    }

    /// Stable lowercase name, as used in health payloads and metrics.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Subscribed => "subscribed",
            Self::Streaming => "streaming",
        }
    }
}

/// Shared feed connection status.
#[derive(Debug, Default)]
pub struct FeedStatus {
    state: RwLock<ConnectionState>,
    messages_received: AtomicU64,
    messages_dropped: AtomicU64,
    trades_ingested: AtomicU64,
    reconnect_attempts: AtomicI32,
}

impl FeedStatus {
    /// Create a new status in the `Disconnected` state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a state machine transition.
    pub fn set_state(&self, state: ConnectionState) {
        *self.state.write() = state;
    }

    /// Current state machine position.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.state.read()
    }

    /// Count one inbound message (of any kind).
    pub fn record_message(&self) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Count one dropped message (malformed, unknown symbol, bad price).
    pub fn record_dropped(&self) {
        self.messages_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Count one trade delivered to the store pipeline.
    pub fn record_trade(&self) {
        self.trades_ingested.fetch_add(1, Ordering::Relaxed);
    }

    /// Count one reconnect attempt.
    pub fn record_reconnect_attempt(&self) {
        self.reconnect_attempts.fetch_add(1, Ordering::Relaxed);
    }

    /// Zero the reconnect attempt counter after a successful connection.
    pub fn reset_reconnect_attempts(&self) {
        self.reconnect_attempts.store(0, Ordering::Relaxed);
    }

    /// Total inbound messages.
    #[must_use]
    pub fn messages_received(&self) -> u64 {
        self.messages_received.load(Ordering::Relaxed)
    }

    /// Total dropped messages.
    #[must_use]
    pub fn messages_dropped(&self) -> u64 {
        self.messages_dropped.load(Ordering::Relaxed)
    }

    /// Total trades delivered downstream.
    #[must_use]
    pub fn trades_ingested(&self) -> u64 {
        self.trades_ingested.load(Ordering::Relaxed)
    }

    /// Reconnect attempts since the last successful connection.
    #[must_use]
    pub fn reconnect_attempts(&self) -> i32 {
        self.reconnect_attempts.load(Ordering::Relaxed)
    }
}
