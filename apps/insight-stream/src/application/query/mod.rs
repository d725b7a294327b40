//! Insight Query Parameters
//!
//! Validated filter/pagination parameters for reads against the insight
//! log. Validation is strict: negative pagination values and inverted
//! timestamp ranges are rejected rather than clamped, so caller mistakes
//! surface as client errors instead of silently empty results.

use crate::domain::market::{Symbol, normalize_symbol};

/// Errors produced by query parameter validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    /// `limit` was negative.
    #[error("limit must be a non-negative integer, got {0}")]
    NegativeLimit(i64),

    /// `offset` was negative.
    #[error("offset must be a non-negative integer, got {0}")]
    NegativeOffset(i64),

    /// `to_timestamp` was before `from_timestamp`.
    #[error("to_timestamp ({to}) must not be before from_timestamp ({from})")]
    InvertedRange {
        /// Requested lower bound.
        from: i64,
        /// Requested upper bound.
        to: i64,
    },
}

/// A validated insight query.
///
/// Timestamp bounds are inclusive on the insight's event timestamp; absent
/// bounds are unbounded. `offset` skips matches before `limit` applies;
/// an absent limit returns all remaining matches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InsightQuery {
    /// Restrict to one symbol (upper-case normalized), if set.
    pub symbol: Option<Symbol>,
    /// Inclusive lower bound on event timestamp (milliseconds).
    pub from_ts: Option<i64>,
    /// Inclusive upper bound on event timestamp (milliseconds).
    pub to_ts: Option<i64>,
    /// Maximum number of insights to return.
    pub limit: Option<usize>,
    /// Number of matching insights to skip.
    pub offset: usize,
}

impl InsightQuery {
    /// Build a validated query from raw (possibly negative) parameters.
    ///
    /// # Errors
    ///
    /// Returns a [`QueryError`] for negative `limit`/`offset` or an
    /// inverted timestamp range.
    pub fn new(
        symbol: Option<&str>,
        from_ts: Option<i64>,
        to_ts: Option<i64>,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Self, QueryError> {
        let limit = match limit {
            Some(l) if l < 0 => return Err(QueryError::NegativeLimit(l)),
            #[allow(clippy::cast_sign_loss)]
            Some(l) => Some(l as usize),
            None => None,
        };

        let offset = match offset {
            Some(o) if o < 0 => return Err(QueryError::NegativeOffset(o)),
            #[allow(clippy::cast_sign_loss)]
            Some(o) => o as usize,
            None => 0,
        };

        if let (Some(from), Some(to)) = (from_ts, to_ts)
            && to < from
        {
            return Err(QueryError::InvertedRange { from, to });
        }

        Ok(Self {
            symbol: symbol.map(normalize_symbol),
            from_ts,
            to_ts,
            limit,
            offset,
        })
    }

    /// Query matching every insight, in log order.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Query matching every insight for one symbol.
    #[must_use]
    pub fn for_symbol(symbol: &str) -> Self {
        Self {
            symbol: Some(normalize_symbol(symbol)),
            ..Self::default()
        }
    }

    /// Check whether an insight's symbol and timestamp match the filters.
    #[must_use]
    pub fn matches(&self, symbol: &str, timestamp_ms: i64) -> bool {
        if let Some(wanted) = &self.symbol
            && wanted != symbol
        {
            return false;
        }
        if let Some(from) = self.from_ts
            && timestamp_ms < from
        {
            return false;
        }
        if let Some(to) = self.to_ts
            && timestamp_ms > to
        {
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_query_normalizes_symbol() {
        let q = InsightQuery::new(Some("aapl"), Some(1), Some(2), Some(10), Some(5)).unwrap();
        assert_eq!(q.symbol.as_deref(), Some("AAPL"));
        assert_eq!(q.limit, Some(10));
        assert_eq!(q.offset, 5);
    }

    #[test]
    fn negative_limit_rejected() {
        let err = InsightQuery::new(None, None, None, Some(-1), None).unwrap_err();
        assert_eq!(err, QueryError::NegativeLimit(-1));
    }

    #[test]
    fn negative_offset_rejected() {
        let err = InsightQuery::new(None, None, None, None, Some(-3)).unwrap_err();
        assert_eq!(err, QueryError::NegativeOffset(-3));
    }

    #[test]
    fn inverted_range_rejected() {
        let err = InsightQuery::new(None, Some(100), Some(50), None, None).unwrap_err();
        assert_eq!(err, QueryError::InvertedRange { from: 100, to: 50 });
    }

    #[test]
    fn equal_bounds_are_valid() {
        let q = InsightQuery::new(None, Some(100), Some(100), None, None).unwrap();
        assert!(q.matches("AAPL", 100));
        assert!(!q.matches("AAPL", 99));
        assert!(!q.matches("AAPL", 101));
    }

    #[test]
    fn bounds_are_inclusive() {
        let q = InsightQuery::new(None, Some(10), Some(20), None, None).unwrap();
        assert!(q.matches("MSFT", 10));
        assert!(q.matches("MSFT", 20));
        assert!(!q.matches("MSFT", 9));
        assert!(!q.matches("MSFT", 21));
    }

    #[test]
    fn symbol_filter_is_exact_after_normalization() {
        let q = InsightQuery::for_symbol("msft");
        assert!(q.matches("MSFT", 0));
        assert!(!q.matches("AAPL", 0));
    }
}
