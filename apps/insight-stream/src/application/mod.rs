//! Application layer - Shared state and query use cases.

/// Concurrent market store (latest quotes + insight log).
pub mod store;

/// Insight query validation and pagination semantics.
pub mod query;
