#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::match_same_arms,
        clippy::needless_pass_by_value,
        clippy::default_trait_access,
        clippy::items_after_statements
    )
)]

//! Insight Stream - Market Data Ingestion and Change Detection
//!
//! A service that maintains a single WebSocket connection to the Finnhub
//! trade feed, tracks the latest quote per watched symbol, and records an
//! "insight" whenever a symbol's price moves past a configured percentage
//! threshold relative to its reference price. Quotes and insights are
//! served over an HTTP query API.
//!
//! # Layers (inside → outside)
//!
//! - **Domain**: Core market types and detection logic
//!   - `market`: Trades, insights, symbols
//!   - `detector`: Threshold-based change detection
//!
//! - **Application**: Shared state and query semantics
//!   - `store`: Concurrent quote/insight storage
//!   - `query`: Validated filter and pagination parameters
//!
//! - **Infrastructure**: Adapters and external integrations
//!   - `finnhub`: WebSocket feed connector with reconnect/backoff
//!   - `http`: axum query API, health, and metrics endpoints
//!   - `config`: Environment-driven configuration
//!   - `telemetry`: Tracing initialization
//!   - `metrics`: Prometheus metric registration/recording
//!
//! # Data Flow
//!
//! ```text
//! Finnhub WS ──► Feed Connector ──► mpsc ──► Ingest Task ──► Market Store
//!                                                                 │
//!                         HTTP clients ◄── axum Query API ◄───────┘
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - Core market types with no external integrations.
pub mod domain;

/// Application layer - Shared state and query semantics.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::detector::{Evaluation, InsightDetector};
pub use domain::market::{Direction, Insight, InsightDraft, Symbol, Trade, normalize_symbol};

// Application layer
pub use application::query::{InsightQuery, QueryError};
pub use application::store::MarketStore;

// Infrastructure config
pub use infrastructure::config::{
    ApiSettings, AppConfig, ConfigError, FeedCredentials, IngestSettings, WebSocketSettings,
};

// Feed connector (for integration tests)
pub use infrastructure::finnhub::{
    ConnectionState, ConnectorConfig, ConnectorError, FeedConnector, FeedEvent, FeedStatus,
    ReconnectConfig, ReconnectPolicy,
};

// HTTP API (for integration tests)
pub use infrastructure::http::{ApiServer, ApiServerError, ApiState, router};

// Metrics
pub use infrastructure::metrics::init_metrics;

// Telemetry
pub use infrastructure::telemetry::init as init_telemetry;
