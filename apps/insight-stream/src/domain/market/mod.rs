//! Market Data Types
//!
//! Core domain types shared by the ingestion pipeline and the query API.
//! Prices use `rust_decimal::Decimal` to avoid floating point drift in
//! change calculations.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// =============================================================================
// Types
// =============================================================================

/// A ticker symbol string, upper-case normalized.
pub type Symbol = String;

/// Normalize a symbol to its canonical upper-case form.
#[must_use]
pub fn normalize_symbol(symbol: &str) -> Symbol {
    symbol.trim().to_uppercase()
}

/// A single upstream-reported trade observation.
///
/// `volume` is absent for quote-only messages that carry a tradable price
/// but no size; such messages still update the latest quote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    /// Ticker symbol (upper-case).
    pub symbol: Symbol,
    /// Trade price. Always positive; non-positive prices are rejected
    /// before a `Trade` is constructed.
    pub price: Decimal,
    /// Trade volume, if reported.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<Decimal>,
    /// Event timestamp in milliseconds since the Unix epoch.
    pub timestamp_ms: i64,
}

impl Trade {
    /// Create a new trade with an upper-case normalized symbol.
    #[must_use]
    pub fn new(symbol: &str, price: Decimal, volume: Option<Decimal>, timestamp_ms: i64) -> Self {
        Self {
            symbol: normalize_symbol(symbol),
            price,
            volume,
            timestamp_ms,
        }
    }
}

/// Direction of a significant price change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Price moved up relative to the reference.
    Up,
    /// Price moved down relative to the reference.
    Down,
}

impl Direction {
    /// Human-readable verb used in insight messages.
    #[must_use]
    pub const fn as_verb(self) -> &'static str {
        match self {
            Self::Up => "increase",
            Self::Down => "decrease",
        }
    }
}

/// An insight before the store has assigned it a sequence id.
///
/// Produced by the detector; the store turns it into an [`Insight`] when
/// appending it to the log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsightDraft {
    /// Ticker symbol (upper-case).
    pub symbol: Symbol,
    /// Baseline price the change was measured from.
    pub reference_price: Decimal,
    /// Price of the triggering trade.
    pub new_price: Decimal,
    /// Signed percentage change, rounded to 4 decimal places.
    pub percent_change: Decimal,
    /// Direction of the change.
    pub direction: Direction,
    /// Timestamp of the triggering trade (milliseconds since epoch).
    pub timestamp_ms: i64,
}

/// A recorded significant price change.
///
/// Immutable once created; `id` is a monotonic sequence number assigned at
/// append time and is the canonical ordering and pagination key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Insight {
    /// Monotonic sequence number, unique across all symbols.
    pub id: u64,
    /// Ticker symbol (upper-case).
    pub symbol: Symbol,
    /// Baseline price the change was measured from.
    pub reference_price: Decimal,
    /// Price of the triggering trade.
    pub new_price: Decimal,
    /// Signed percentage change, rounded to 4 decimal places.
    pub percent_change: Decimal,
    /// Direction of the change.
    pub direction: Direction,
    /// Timestamp of the triggering trade (milliseconds since epoch).
    pub timestamp_ms: i64,
}

impl Insight {
    /// Build an insight from a draft and its assigned sequence id.
    #[must_use]
    pub fn from_draft(id: u64, draft: InsightDraft) -> Self {
        Self {
            id,
            symbol: draft.symbol,
            reference_price: draft.reference_price,
            new_price: draft.new_price,
            percent_change: draft.percent_change,
            direction: draft.direction,
            timestamp_ms: draft.timestamp_ms,
        }
    }

    /// Signed price difference from the reference, rounded to a whole
    /// unit as in the original insight payload.
    #[must_use]
    pub fn price_change(&self) -> Decimal {
        (self.new_price - self.reference_price).round()
    }

    /// UTC datetime derived from the event timestamp.
    ///
    /// Returns `None` if the timestamp is outside chrono's representable
    /// range.
    #[must_use]
    pub fn datetime_utc(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.timestamp_ms)
    }

    /// Human-readable summary of the change.
    #[must_use]
    pub fn message(&self) -> String {
        format!(
            "Significant price {} of {:.2}%",
            self.direction.as_verb(),
            self.percent_change.abs()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_symbol_uppercases_and_trims() {
        assert_eq!(normalize_symbol(" aapl "), "AAPL");
        assert_eq!(normalize_symbol("MSFT"), "MSFT");
    }

    #[test]
    fn trade_new_normalizes_symbol() {
        let trade = Trade::new("tsla", Decimal::new(25000, 2), None, 1_000);
        assert_eq!(trade.symbol, "TSLA");
        assert!(trade.volume.is_none());
    }

    #[test]
    fn direction_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Direction::Up).unwrap(), "\"up\"");
        assert_eq!(serde_json::to_string(&Direction::Down).unwrap(), "\"down\"");
    }

    #[test]
    fn insight_message_uses_absolute_change() {
        let insight = Insight {
            id: 1,
            symbol: "AAPL".to_string(),
            reference_price: Decimal::new(15000, 2),
            new_price: Decimal::new(14800, 2),
            percent_change: Decimal::new(-13333, 4),
            direction: Direction::Down,
            timestamp_ms: 2_000,
        };
        assert_eq!(insight.message(), "Significant price decrease of 1.33%");
        // 148.00 - 150.00 = -2.00, rounded to a whole unit.
        assert_eq!(insight.price_change(), Decimal::new(-2, 0));
    }

    #[test]
    fn insight_datetime_utc() {
        let insight = Insight {
            id: 1,
            symbol: "AAPL".to_string(),
            reference_price: Decimal::ONE,
            new_price: Decimal::TWO,
            percent_change: Decimal::new(1000000, 4),
            direction: Direction::Up,
            timestamp_ms: 1_700_000_000_000,
        };
        let dt = insight.datetime_utc().unwrap();
        assert_eq!(dt.timestamp_millis(), 1_700_000_000_000);
    }
}
