//! Infrastructure layer - Adapters and external integrations.

/// Finnhub WebSocket feed connector.
pub mod finnhub;

/// HTTP query API, health, and metrics endpoints.
pub mod http;

/// Environment configuration.
pub mod config;

/// Tracing/logging initialization.
pub mod telemetry;

/// Prometheus metrics.
pub mod metrics;
