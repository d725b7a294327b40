//! Significant-Change Detection
//!
//! Pure decision logic: given a trade and the symbol's current reference
//! price, decide whether an insight fires and what the new reference
//! becomes. The detector holds no state of its own; the store owns the
//! per-symbol reference prices and applies the outcome atomically.

use rust_decimal::Decimal;

use crate::domain::market::{Direction, InsightDraft, Trade};

/// Number of decimal places kept on computed percentage changes.
const PERCENT_SCALE: u32 = 4;

/// Outcome of evaluating one trade against its reference price.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Evaluation {
    /// First trade ever seen for the symbol. The caller must set the
    /// reference price to the trade's price; no insight is emitted.
    FirstObservation {
        /// The new baseline: the trade's own price.
        reference: Decimal,
    },
    /// The change did not reach the threshold. Reference is unchanged.
    BelowThreshold {
        /// Signed percentage change that was computed.
        percent_change: Decimal,
    },
    /// The change reached the threshold. The caller must append the
    /// insight and re-baseline the reference to the trade's price.
    Triggered(InsightDraft),
}

/// Threshold-based price change detector.
#[derive(Debug, Clone, Copy)]
pub struct InsightDetector {
    threshold_percent: Decimal,
}

impl InsightDetector {
    /// Create a detector with the given percentage threshold (e.g. `1.0`
    /// for 1%). The threshold applies to all symbols.
    #[must_use]
    pub const fn new(threshold_percent: Decimal) -> Self {
        Self { threshold_percent }
    }

    /// The configured threshold, in percent.
    #[must_use]
    pub const fn threshold_percent(&self) -> Decimal {
        self.threshold_percent
    }

    /// Evaluate a trade against the symbol's current reference price.
    ///
    /// Trades with non-positive prices are rejected upstream by the feed
    /// connector, so `reference` is always positive here and the division
    /// is well-defined.
    #[must_use]
    pub fn evaluate(&self, trade: &Trade, reference: Option<Decimal>) -> Evaluation {
        let Some(reference) = reference else {
            return Evaluation::FirstObservation {
                reference: trade.price,
            };
        };

        // The threshold compares against the exact change; rounding is
        // only applied to the stored value.
        let exact_change = (trade.price - reference) / reference * Decimal::ONE_HUNDRED;
        let percent_change = exact_change.round_dp(PERCENT_SCALE);

        if exact_change.abs() < self.threshold_percent {
            return Evaluation::BelowThreshold { percent_change };
        }

        let direction = if exact_change.is_sign_negative() {
            Direction::Down
        } else {
            Direction::Up
        };

        Evaluation::Triggered(InsightDraft {
            symbol: trade.symbol.clone(),
            reference_price: reference,
            new_price: trade.price,
            percent_change,
            direction,
            timestamp_ms: trade.timestamp_ms,
        })
    }
}
