//! End-to-end matching scenarios against a single book.

use chrono::{DateTime, Duration, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use oceanbook::engine::match_orders;
use oceanbook::{ContractViolation, Disposition, EngineError, MatchingEngine, Order, OrderBook, Side};

const SYMBOL: &str = "BTC-USDT";

fn at(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(1_703_577_600_000).unwrap() + Duration::milliseconds(ms)
}

fn limit(id: u64, side: Side, price: Decimal, qty: Decimal, ms: i64) -> Order {
    Order::limit(id, SYMBOL, 1000 + id, side, price, qty, at(ms))
}

fn market(id: u64, side: Side, qty: Decimal, ms: i64) -> Order {
    Order::market(id, SYMBOL, 1000 + id, side, qty, at(ms))
}

struct Harness {
    book: OrderBook,
    engine: MatchingEngine,
}

impl Harness {
    fn new() -> Self {
        Self {
            book: OrderBook::with_capacity(SYMBOL, 64),
            engine: MatchingEngine::new(),
        }
    }

    fn submit(&mut self, order: Order) -> oceanbook::MatchResult {
        let now = order.created_at();
        self.engine.match_order(&mut self.book, order, now).unwrap()
    }
}

#[test]
fn filled_quantity_stays_within_bounds() {
    let mut h = Harness::new();
    h.submit(limit(1, Side::Sell, dec!(100), dec!(3), 0));
    h.submit(limit(2, Side::Sell, dec!(100), dec!(3), 1));

    for (i, qty) in [dec!(1), dec!(2.5), dec!(0.5), dec!(9)].into_iter().enumerate() {
        let result = h.submit(limit(10 + i as u64, Side::Buy, dec!(100), qty, 10 + i as i64));
        for trade in &result.trades {
            if let Some(maker) = h.book.get(trade.maker_order_id) {
                assert!(maker.filled_quantity() >= Decimal::ZERO);
                assert!(maker.filled_quantity() <= maker.quantity());
            }
        }
    }

    // 1 + 2.5 + 0.5 + 2 of the last order consume both asks
    assert_eq!(h.book.ask_count(), 0);
    let rest = h.book.best_bid().unwrap();
    assert_eq!(rest.id(), 13);
    assert_eq!(rest.filled_quantity(), dec!(2));
    assert_eq!(rest.pending_quantity(), dec!(7));
}

#[test]
fn higher_bid_beats_earlier_bid() {
    let mut h = Harness::new();
    h.submit(limit(1, Side::Buy, dec!(100), dec!(1), 0));
    h.submit(limit(2, Side::Buy, dec!(101), dec!(1), 5));

    assert_eq!(h.book.best_bid().unwrap().id(), 2);

    let result = h.submit(limit(3, Side::Sell, dec!(99), dec!(1), 10));
    assert_eq!(result.trades[0].maker_order_id, 2);
    assert_eq!(result.trades[0].price, dec!(101));
}

#[test]
fn lowest_ask_is_best() {
    let mut h = Harness::new();
    h.submit(limit(1, Side::Sell, dec!(102), dec!(1), 0));
    h.submit(limit(2, Side::Sell, dec!(100), dec!(1), 1));
    h.submit(limit(3, Side::Sell, dec!(101), dec!(1), 2));

    assert_eq!(h.book.best_ask().unwrap().id(), 2);
    assert_eq!(h.book.spread(), None);
}

#[test]
fn earlier_ask_at_same_price_fills_first() {
    let mut h = Harness::new();
    h.submit(limit(1, Side::Sell, dec!(100), dec!(1), 10));
    h.submit(limit(2, Side::Sell, dec!(100), dec!(1), 5));

    let result = h.submit(limit(3, Side::Buy, dec!(100), dec!(1), 20));

    assert_eq!(result.trades.len(), 1);
    assert_eq!(result.trades[0].maker_order_id, 2);
    assert_eq!(h.book.best_ask().unwrap().id(), 1);
}

#[test]
fn identical_timestamps_fall_back_to_lower_id() {
    let mut h = Harness::new();
    h.submit(limit(9, Side::Buy, dec!(100), dec!(1), 0));
    h.submit(limit(4, Side::Buy, dec!(100), dec!(1), 0));
    h.submit(limit(6, Side::Buy, dec!(100), dec!(1), 0));

    let result = h.submit(limit(20, Side::Sell, dec!(100), dec!(3), 1));

    let makers: Vec<u64> = result.trades.iter().map(|t| t.maker_order_id).collect();
    assert_eq!(makers, vec![4, 6, 9]);
}

#[test]
fn limit_taker_crosses_only_at_or_through_maker_price() {
    let mut h = Harness::new();
    h.submit(limit(1, Side::Sell, dec!(51), dec!(5), 0));

    let miss = h.submit(limit(2, Side::Buy, dec!(50), dec!(5), 1));
    assert!(miss.trades.is_empty());
    assert_eq!(miss.disposition, Disposition::Rested { remaining: dec!(5) });

    let mut h = Harness::new();
    h.submit(limit(1, Side::Sell, dec!(50), dec!(3), 0));

    let hit = h.submit(limit(2, Side::Buy, dec!(51), dec!(5), 1));
    assert_eq!(hit.trades.len(), 1);
    assert_eq!(hit.trades[0].price, dec!(50));
    assert_eq!(hit.trades[0].quantity, dec!(3));
    assert_eq!(hit.trades[0].total, dec!(150));
    assert_eq!(hit.disposition, Disposition::Rested { remaining: dec!(2) });
    assert_eq!(h.book.best_bid().unwrap().price(), Some(dec!(51)));
}

#[test]
fn market_taker_always_crosses() {
    let mut h = Harness::new();
    h.submit(limit(1, Side::Buy, dec!(100), dec!(4), 0));

    let result = h.submit(market(2, Side::Sell, dec!(10), 1));

    assert_eq!(result.trades.len(), 1);
    assert_eq!(result.trades[0].quantity, dec!(4));
    assert_eq!(result.trades[0].price, dec!(100));
    assert_eq!(result.trades[0].taker_side, Side::Sell);
    assert_eq!(result.disposition, Disposition::Discarded { remaining: dec!(6) });
    assert!(h.book.is_empty());
}

#[test]
fn immediate_or_cancel_remainder_never_rests() {
    let mut h = Harness::new();
    h.submit(limit(1, Side::Sell, dec!(100), dec!(4), 0));
    h.submit(limit(2, Side::Sell, dec!(105), dec!(4), 1));

    let ioc = limit(3, Side::Buy, dec!(100), dec!(10), 2).immediate_or_cancel();
    let result = h.submit(ioc);

    assert_eq!(result.trades.len(), 1);
    assert_eq!(result.trades[0].quantity, dec!(4));
    assert_eq!(result.disposition, Disposition::Discarded { remaining: dec!(6) });
    assert!(!h.book.contains_order(3));
    assert!(h.book.best_bid().is_none());
    assert_eq!(h.book.best_ask().unwrap().id(), 2);
}

#[test]
fn sell_stop_fires_when_price_drops_through_it() {
    let mut h = Harness::new();
    h.submit(limit(1, Side::Buy, dec!(89), dec!(1), 0));
    h.submit(limit(2, Side::Buy, dec!(80), dec!(10), 1));

    // Both trigger at 89; the lower-priced sell stop ranks first
    let parked = h.submit(market(3, Side::Sell, dec!(1), 2).with_stop_price(dec!(90)));
    h.submit(limit(4, Side::Sell, dec!(70), dec!(2), 3).with_stop_price(dec!(89)));
    assert_eq!(parked.disposition, Disposition::Parked);
    assert_eq!(h.book.stop_count(), 2);

    let result = h.submit(limit(5, Side::Sell, dec!(89), dec!(1), 4));

    assert_eq!(result.triggered, vec![4, 3]);
    assert_eq!(h.book.stop_count(), 0);

    let fills: Vec<(u64, u64, Decimal, Decimal)> = result
        .trades
        .iter()
        .map(|t| (t.id, t.taker_order_id, t.price, t.quantity))
        .collect();
    assert_eq!(
        fills,
        vec![
            (1, 5, dec!(89), dec!(1)),
            (2, 4, dec!(80), dec!(2)),
            (3, 3, dec!(80), dec!(1)),
        ]
    );
    assert_eq!(h.book.last_price(), Some(dec!(80)));
    assert_eq!(h.book.best_bid().unwrap().pending_quantity(), dec!(7));
}

#[test]
fn buy_stop_cascade() {
    let mut h = Harness::new();
    h.submit(limit(1, Side::Sell, dec!(101), dec!(1), 0));
    h.submit(limit(2, Side::Sell, dec!(105), dec!(1), 1));
    h.submit(limit(3, Side::Sell, dec!(110), dec!(1), 2));

    // Fires at 101, lifts 105, which fires the second stop
    h.submit(market(4, Side::Buy, dec!(1), 3).with_stop_price(dec!(101)));
    h.submit(market(5, Side::Buy, dec!(1), 4).with_stop_price(dec!(104)));

    let result = h.submit(limit(6, Side::Buy, dec!(101), dec!(1), 5));

    assert_eq!(result.triggered, vec![4, 5]);
    let prices: Vec<Decimal> = result.trades.iter().map(|t| t.price).collect();
    assert_eq!(prices, vec![dec!(101), dec!(105), dec!(110)]);
    assert!(h.book.is_empty());
}

#[test]
fn cancel_removes_resting_and_pending_orders() {
    let mut h = Harness::new();
    h.submit(limit(1, Side::Buy, dec!(100), dec!(1), 0));
    h.submit(market(2, Side::Sell, dec!(1), 1).with_stop_price(dec!(90)));

    assert!(h.engine.cancel_order(&mut h.book, 1).unwrap().is_some());
    assert!(h.engine.cancel_order(&mut h.book, 2).unwrap().is_some());
    assert!(h.engine.cancel_order(&mut h.book, 2).unwrap().is_none());
    assert!(h.book.is_empty());
}

#[test]
fn same_side_match_is_a_contract_violation() {
    let mut maker = limit(1, Side::Buy, dec!(100), dec!(1), 0);
    let mut taker = limit(2, Side::Buy, dec!(100), dec!(1), 1);

    let err = match_orders(1, &mut maker, &mut taker, at(2)).unwrap_err();

    assert!(matches!(err, ContractViolation::SameSideMatch { .. }));
    assert_eq!(maker.filled_quantity(), Decimal::ZERO);
    assert_eq!(taker.filled_quantity(), Decimal::ZERO);
}

#[test]
fn violation_halts_the_book_for_good() {
    let mut h = Harness::new();
    h.submit(limit(1, Side::Buy, dec!(100), dec!(1), 0));

    let foreign = Order::limit(2, "ETH-USDT", 1, Side::Sell, dec!(1), dec!(1), at(1));
    let err = h.engine.match_order(&mut h.book, foreign, at(1)).unwrap_err();
    assert!(err.is_fatal());
    assert!(h.book.is_halted());

    let after = h.engine.match_order(&mut h.book, limit(3, Side::Sell, dec!(100), dec!(1), 2), at(2));
    assert!(matches!(after, Err(EngineError::Halted { .. })));
    assert_eq!(h.book.best_bid().unwrap().filled_quantity(), Decimal::ZERO);
}

#[test]
fn state_root_tracks_book_contents() {
    let mut a = Harness::new();
    let mut b = Harness::new();
    for h in [&mut a, &mut b] {
        h.submit(limit(1, Side::Buy, dec!(100), dec!(1), 0));
        h.submit(limit(2, Side::Sell, dec!(101), dec!(2), 1));
    }
    assert_eq!(a.book.state_root(), b.book.state_root());

    b.submit(limit(3, Side::Buy, dec!(101), dec!(1), 2));
    assert_ne!(a.book.state_root(), b.book.state_root());
    assert_eq!(b.book.state_root_hex().len(), 64);
}

#[test]
fn depth_aggregates_levels() {
    let mut h = Harness::new();
    h.submit(limit(1, Side::Buy, dec!(100), dec!(1), 0));
    h.submit(limit(2, Side::Buy, dec!(100), dec!(2), 1));
    h.submit(limit(3, Side::Buy, dec!(99), dec!(5), 2));
    h.submit(limit(4, Side::Sell, dec!(101), dec!(1.5), 3));

    let depth = h.book.depth(1);
    assert_eq!(depth.bids, vec![(dec!(100), dec!(3))]);
    assert_eq!(depth.asks, vec![(dec!(101), dec!(1.5))]);
}
