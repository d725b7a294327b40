//! Domain layer - Core market data types and detection logic.

/// Market data types (trades, quotes, insights).
pub mod market;

/// Significant-change detection.
pub mod detector;
