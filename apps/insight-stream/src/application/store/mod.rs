//! Market Store
//!
//! The single shared mutable structure of the service: latest trade per
//! symbol, per-symbol reference prices, and the append-only insight log.
//!
//! # Concurrency
//!
//! One `parking_lot::RwLock` guards all of it. The ingestion task is the
//! only writer by construction; HTTP handlers take read locks and copy out
//! snapshots. Because [`MarketStore::record_trade`] performs the quote
//! overwrite and any insight append under one write section, no reader can
//! observe a trade without its causally-linked insight and reference-price
//! update.

use std::collections::HashMap;

use parking_lot::RwLock;
use rust_decimal::Decimal;

use crate::application::query::InsightQuery;
use crate::domain::detector::{Evaluation, InsightDetector};
use crate::domain::market::{Insight, InsightDraft, Symbol, Trade, normalize_symbol};

/// Everything guarded by the store lock.
#[derive(Debug, Default)]
struct StoreInner {
    /// Latest trade per symbol, overwritten on every ingest.
    quotes: HashMap<Symbol, Trade>,
    /// Per-symbol baseline for change detection. Updated only on first
    /// observation or when an insight fires.
    references: HashMap<Symbol, Decimal>,
    /// Append-only insight log, ordered by id.
    insights: Vec<Insight>,
    /// Next insight sequence id.
    next_id: u64,
}

/// Concurrent holder of latest quotes and the insight log.
///
/// Constructed once at startup and passed by `Arc` to the ingestion task
/// and the HTTP layer; tests construct isolated instances.
#[derive(Debug, Default)]
pub struct MarketStore {
    inner: RwLock<StoreInner>,
}

impl MarketStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a trade and apply any resulting insight atomically.
    ///
    /// The latest quote is overwritten unconditionally. The detector is
    /// consulted against the symbol's current reference price under the
    /// same write lock; when it triggers, the insight is appended and the
    /// reference re-baselined before the lock is released. Returns the
    /// emitted insight, if any.
    pub fn record_trade(&self, trade: Trade, detector: &InsightDetector) -> Option<Insight> {
        let mut inner = self.inner.write();

        let reference = inner.references.get(&trade.symbol).copied();
        let evaluation = detector.evaluate(&trade, reference);
        let symbol = trade.symbol.clone();
        inner.quotes.insert(symbol.clone(), trade);

        match evaluation {
            Evaluation::FirstObservation { reference } => {
                inner.references.insert(symbol, reference);
                None
            }
            Evaluation::BelowThreshold { .. } => None,
            Evaluation::Triggered(draft) => Some(Self::append_locked(&mut inner, draft)),
        }
    }

    /// Append an insight to the log, assigning the next sequence id and
    /// re-baselining the symbol's reference price.
    pub fn append_insight(&self, draft: InsightDraft) -> Insight {
        let mut inner = self.inner.write();
        Self::append_locked(&mut inner, draft)
    }

    fn append_locked(inner: &mut StoreInner, draft: InsightDraft) -> Insight {
        let id = inner.next_id;
        inner.next_id += 1;

        inner
            .references
            .insert(draft.symbol.clone(), draft.new_price);

        let insight = Insight::from_draft(id, draft);
        inner.insights.push(insight.clone());
        insight
    }

    /// Snapshot of every known symbol's latest trade.
    #[must_use]
    pub fn all_latest(&self) -> HashMap<Symbol, Trade> {
        self.inner.read().quotes.clone()
    }

    /// Latest trade for one symbol, or `None` if never observed.
    #[must_use]
    pub fn latest(&self, symbol: &str) -> Option<Trade> {
        self.inner
            .read()
            .quotes
            .get(&normalize_symbol(symbol))
            .cloned()
    }

    /// Current reference price for a symbol, if any.
    #[must_use]
    pub fn reference_price(&self, symbol: &str) -> Option<Decimal> {
        self.inner
            .read()
            .references
            .get(&normalize_symbol(symbol))
            .copied()
    }

    /// Query the insight log.
    ///
    /// Results are always in id-ascending (insertion) order; because
    /// appends only extend the tail, offset/limit pagination over a
    /// growing log never reorders previously returned pages.
    #[must_use]
    pub fn query_insights(&self, query: &InsightQuery) -> Vec<Insight> {
        let inner = self.inner.read();
        let matching = inner
            .insights
            .iter()
            .filter(|i| query.matches(&i.symbol, i.timestamp_ms))
            .skip(query.offset);

        match query.limit {
            Some(limit) => matching.take(limit).cloned().collect(),
            None => matching.cloned().collect(),
        }
    }

    /// Total number of insights recorded so far.
    #[must_use]
    pub fn insight_count(&self) -> usize {
        self.inner.read().insights.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::market::Direction;

    fn detector() -> InsightDetector {
        InsightDetector::new(Decimal::ONE)
    }

    fn trade(symbol: &str, price_cents: i64, timestamp_ms: i64) -> Trade {
        Trade::new(symbol, Decimal::new(price_cents, 2), None, timestamp_ms)
    }

    #[test]
    fn first_trade_sets_quote_and_reference_without_insight() {
        let store = MarketStore::new();
        let emitted = store.record_trade(trade("AAPL", 15000, 1_000), &detector());

        assert!(emitted.is_none());
        assert_eq!(store.latest("AAPL").unwrap().price, Decimal::new(15000, 2));
        assert_eq!(store.reference_price("AAPL"), Some(Decimal::new(15000, 2)));
        assert_eq!(store.insight_count(), 0);
    }

    #[test]
    fn quote_overwritten_even_when_no_insight_fires() {
        let store = MarketStore::new();
        store.record_trade(trade("AAPL", 15000, 1_000), &detector());
        store.record_trade(trade("AAPL", 15010, 2_000), &detector());

        assert_eq!(store.latest("AAPL").unwrap().price, Decimal::new(15010, 2));
        // Reference stays at the first trade's price.
        assert_eq!(store.reference_price("AAPL"), Some(Decimal::new(15000, 2)));
        assert_eq!(store.insight_count(), 0);
    }

    #[test]
    fn spec_scenario_aapl_threshold_one_percent() {
        let store = MarketStore::new();
        let det = detector();

        assert!(store.record_trade(trade("AAPL", 15000, 1_000), &det).is_none());

        let insight = store
            .record_trade(trade("AAPL", 15160, 2_000), &det)
            .expect("1.07% move should fire");
        assert_eq!(insight.reference_price, Decimal::new(15000, 2));
        assert_eq!(insight.new_price, Decimal::new(15160, 2));
        assert_eq!(insight.direction, Direction::Up);
        assert_eq!(insight.timestamp_ms, 2_000);
        assert_eq!(store.reference_price("AAPL"), Some(Decimal::new(15160, 2)));

        assert!(store.record_trade(trade("AAPL", 15180, 3_000), &det).is_none());

        let results = store.query_insights(&InsightQuery::for_symbol("AAPL"));
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].timestamp_ms, 2_000);
    }

    #[test]
    fn insight_ids_are_monotonic_across_symbols() {
        let store = MarketStore::new();
        let det = detector();
        store.record_trade(trade("AAPL", 10000, 1), &det);
        store.record_trade(trade("MSFT", 20000, 2), &det);
        store.record_trade(trade("AAPL", 10200, 3), &det);
        store.record_trade(trade("MSFT", 20400, 4), &det);

        let all = store.query_insights(&InsightQuery::all());
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, 0);
        assert_eq!(all[0].symbol, "AAPL");
        assert_eq!(all[1].id, 1);
        assert_eq!(all[1].symbol, "MSFT");
    }

    #[test]
    fn latest_lookup_is_case_insensitive() {
        let store = MarketStore::new();
        store.record_trade(trade("AAPL", 10000, 1), &detector());
        assert!(store.latest("aapl").is_some());
        assert!(store.latest("GOOG").is_none());
    }

    #[test]
    fn pagination_returns_exact_window() {
        let store = MarketStore::new();
        let det = detector();
        // Alternate +2% moves so every trade after the first fires.
        let mut price = 10000;
        store.record_trade(trade("AAPL", price, 0), &det);
        for ts in 1..=10 {
            price += price / 50;
            store.record_trade(trade("AAPL", price, ts), &det);
        }
        assert_eq!(store.insight_count(), 10);

        let query = InsightQuery::new(None, None, None, Some(3), Some(4)).unwrap();
        let page = store.query_insights(&query);
        assert_eq!(page.len(), 3);
        assert_eq!(page[0].id, 4);
        assert_eq!(page[2].id, 6);

        // Offset past the end yields an empty page, not an error.
        let query = InsightQuery::new(None, None, None, Some(3), Some(100)).unwrap();
        assert!(store.query_insights(&query).is_empty());

        // Limit past the end returns the remainder.
        let query = InsightQuery::new(None, None, None, Some(50), Some(8)).unwrap();
        assert_eq!(store.query_insights(&query).len(), 2);
    }

    #[test]
    fn timestamp_filter_is_inclusive() {
        let store = MarketStore::new();
        for (id_ts, price) in [(100, 10000), (200, 10200), (300, 10404)] {
            store.append_insight(InsightDraft {
                symbol: "AAPL".to_string(),
                reference_price: Decimal::new(price - 100, 2),
                new_price: Decimal::new(price, 2),
                percent_change: Decimal::ONE,
                direction: Direction::Up,
                timestamp_ms: id_ts,
            });
        }

        let query = InsightQuery::new(None, Some(100), Some(200), None, None).unwrap();
        let results = store.query_insights(&query);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].timestamp_ms, 100);
        assert_eq!(results[1].timestamp_ms, 200);
    }

    #[test]
    fn log_order_is_stable_while_growing() {
        let store = MarketStore::new();
        let det = detector();
        store.record_trade(trade("AAPL", 10000, 1), &det);
        store.record_trade(trade("AAPL", 10200, 2), &det);
        store.record_trade(trade("AAPL", 10404, 3), &det);

        let before = store.query_insights(&InsightQuery::all());

        // Grow the log, then re-issue the same query.
        store.record_trade(trade("AAPL", 10612, 4), &det);
        let after = store.query_insights(&InsightQuery::all());

        assert_eq!(&after[..before.len()], &before[..]);
        assert_eq!(after.len(), before.len() + 1);
    }

    #[test]
    fn out_of_order_timestamps_are_still_processed() {
        let store = MarketStore::new();
        let det = detector();
        store.record_trade(trade("AAPL", 10000, 5_000), &det);
        // Older timestamp, big move: still fires and overwrites the quote.
        let insight = store.record_trade(trade("AAPL", 10300, 1_000), &det);
        assert!(insight.is_some());
        assert_eq!(store.latest("AAPL").unwrap().timestamp_ms, 1_000);
    }
}
