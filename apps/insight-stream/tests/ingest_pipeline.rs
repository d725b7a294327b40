//! Ingestion Pipeline Integration Tests
//!
//! Exercises the store and detector together the way the ingest task
//! drives them, including concurrent reader/writer behavior.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use proptest::prelude::*;
use rust_decimal::Decimal;

use insight_stream::{Direction, InsightDetector, InsightQuery, MarketStore, Trade};

fn trade(symbol: &str, price_cents: i64, ts: i64) -> Trade {
    Trade::new(symbol, Decimal::new(price_cents, 2), None, ts)
}

#[test]
fn threshold_scenario_end_to_end() {
    let store = MarketStore::new();
    let detector = InsightDetector::new(Decimal::ONE);

    assert!(store.record_trade(trade("AAPL", 15000, 1_000), &detector).is_none());
    let insight = store
        .record_trade(trade("AAPL", 15160, 2_000), &detector)
        .expect("1.07% move fires");
    assert_eq!(insight.direction, Direction::Up);
    assert!(store.record_trade(trade("AAPL", 15180, 3_000), &detector).is_none());

    let results = store.query_insights(&InsightQuery::for_symbol("AAPL"));
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].timestamp_ms, 2_000);
    assert_eq!(results[0].reference_price, Decimal::new(15000, 2));
    assert_eq!(results[0].new_price, Decimal::new(15160, 2));
}

#[test]
fn downward_moves_fire_with_down_direction() {
    let store = MarketStore::new();
    let detector = InsightDetector::new(Decimal::ONE);

    store.record_trade(trade("MSFT", 40000, 1), &detector);
    let insight = store
        .record_trade(trade("MSFT", 39500, 2), &detector)
        .expect("-1.25% move fires");
    assert_eq!(insight.direction, Direction::Down);
    assert!(insight.percent_change < Decimal::ZERO);
}

#[test]
fn concurrent_readers_see_consistent_snapshots() {
    let store = Arc::new(MarketStore::new());
    let detector = InsightDetector::new(Decimal::ONE);

    let writer_store = Arc::clone(&store);
    let writer = std::thread::spawn(move || {
        // Alternate +2% moves so every trade after the first fires.
        let mut price = 10000i64;
        writer_store.record_trade(trade("AAPL", price, 0), &detector);
        for ts in 1..=500 {
            price += price / 50;
            writer_store.record_trade(trade("AAPL", price, ts), &detector);
        }
    });

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let reader_store = Arc::clone(&store);
            std::thread::spawn(move || {
                for _ in 0..200 {
                    let insights = reader_store.query_insights(&InsightQuery::all());
                    // Ids are assigned under the write lock, so every
                    // snapshot is a gap-free prefix of the log.
                    for (position, insight) in insights.iter().enumerate() {
                        assert_eq!(insight.id, position as u64);
                    }
                    // Any recorded insight implies a visible quote.
                    if !insights.is_empty() {
                        assert!(reader_store.latest("AAPL").is_some());
                    }
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }

    assert_eq!(store.insight_count(), 500);
}

#[test]
fn pages_issued_before_growth_remain_valid() {
    let store = MarketStore::new();
    let detector = InsightDetector::new(Decimal::ONE);

    let mut price = 10000i64;
    store.record_trade(trade("AAPL", price, 0), &detector);
    for ts in 1..=6 {
        price += price / 50;
        store.record_trade(trade("AAPL", price, ts), &detector);
    }

    let page = store.query_insights(&InsightQuery::new(None, None, None, Some(3), Some(0)).unwrap());
    let ids: Vec<u64> = page.iter().map(|i| i.id).collect();

    // Grow the log, then reissue the identical page.
    for ts in 7..=12 {
        price += price / 50;
        store.record_trade(trade("AAPL", price, ts), &detector);
    }
    let reissued =
        store.query_insights(&InsightQuery::new(None, None, None, Some(3), Some(0)).unwrap());
    assert_eq!(reissued.iter().map(|i| i.id).collect::<Vec<_>>(), ids);
}

proptest! {
    /// The latest quote always reflects the last recorded trade,
    /// regardless of whether any insight fired along the way.
    #[test]
    fn latest_quote_is_last_trade(prices in prop::collection::vec(1i64..1_000_000, 1..50)) {
        let store = MarketStore::new();
        let detector = InsightDetector::new(Decimal::ONE);

        for (ts, price) in prices.iter().enumerate() {
            store.record_trade(trade("AAPL", *price, ts as i64), &detector);
        }

        let latest = store.latest("AAPL").unwrap();
        prop_assert_eq!(latest.price, Decimal::new(*prices.last().unwrap(), 2));
        prop_assert_eq!(latest.timestamp_ms, (prices.len() - 1) as i64);
    }

    /// Replaying the detection rule over the trade sequence predicts
    /// exactly which trades produce insights.
    #[test]
    fn insights_fire_exactly_at_threshold_crossings(
        prices in prop::collection::vec(1i64..1_000_000, 2..50),
    ) {
        let threshold = Decimal::TWO;
        let store = MarketStore::new();
        let detector = InsightDetector::new(threshold);

        let mut expected = 0usize;
        let mut reference: Option<Decimal> = None;
        for (ts, raw) in prices.iter().enumerate() {
            let price = Decimal::new(*raw, 2);
            let emitted = store
                .record_trade(trade("AAPL", *raw, ts as i64), &detector)
                .is_some();

            let should_fire = match reference {
                None => {
                    reference = Some(price);
                    false
                }
                Some(base) => {
                    let change = (price - base) / base * Decimal::ONE_HUNDRED;
                    if change.abs() >= threshold {
                        reference = Some(price);
                        true
                    } else {
                        false
                    }
                }
            };

            prop_assert_eq!(emitted, should_fire);
            if should_fire {
                expected += 1;
            }
        }

        prop_assert_eq!(store.insight_count(), expected);
    }

    /// Every emitted insight carries a percent change at or past the
    /// threshold, and re-baselining means consecutive insights for a
    /// symbol chain reference -> new_price.
    #[test]
    fn insight_chain_rebaselines(prices in prop::collection::vec(1i64..100_000, 2..40)) {
        let store = MarketStore::new();
        let detector = InsightDetector::new(Decimal::ONE);

        for (ts, price) in prices.iter().enumerate() {
            store.record_trade(trade("AAPL", *price, ts as i64), &detector);
        }

        let insights = store.query_insights(&InsightQuery::for_symbol("AAPL"));
        for pair in insights.windows(2) {
            prop_assert_eq!(pair[1].reference_price, pair[0].new_price);
        }
        for insight in &insights {
            prop_assert!(insight.percent_change.abs() >= Decimal::ONE);
        }
    }
}
