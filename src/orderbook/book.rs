//! Per-symbol order book.
//!
//! ## Architecture
//!
//! - **Slab**: owns every order resting in the book, O(1) insert/remove
//! - **PriorityBook** x4: bids and asks ranked by price, pending buy and
//!   sell stops ranked by stop price
//! - **HashMap**: order ID to slab slot and collection, for O(1) cancel
//!
//! The book is the exclusive owner of the orders it holds. The matching
//! engine borrows one resting order mutably at a time for a match step;
//! nothing else ever gets mutable access to it.
//!
//! ## Example
//!
//! ```
//! use chrono::Utc;
//! use oceanbook::orderbook::OrderBook;
//! use oceanbook::types::{Order, Side};
//! use rust_decimal::Decimal;
//!
//! let mut book = OrderBook::with_capacity("BTC-USDT", 1_000);
//! let bid = Order::limit(1, "BTC-USDT", 7, Side::Buy, Decimal::new(50_000, 0), Decimal::ONE, Utc::now());
//! book.insert_active(bid).unwrap();
//!
//! assert_eq!(book.best_bid().map(|o| o.id()), Some(1));
//! assert!(book.best_ask().is_none());
//! ```

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::Serialize;
use sha2::{Digest, Sha256};
use slab::Slab;
use tracing::{debug, warn};

use crate::error::{ContractViolation, EngineError};
use crate::orderbook::{Policy, PriorityBook};
use crate::types::{Order, Side};

/// Which kind of collection currently holds an order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Location {
    Active,
    PendingStop,
}

#[derive(Debug, Clone, Copy)]
struct Slot {
    key: usize,
    location: Location,
}

/// Aggregated price levels, best first
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DepthSnapshot {
    pub symbol: String,
    pub bids: Vec<(Decimal, Decimal)>,
    pub asks: Vec<(Decimal, Decimal)>,
}

/// Order book for a single symbol
#[derive(Debug)]
pub struct OrderBook {
    symbol: String,

    /// Storage for every resting and pending-stop order
    orders: Slab<Order>,

    /// Order ID to slab slot
    index: HashMap<u64, Slot>,

    bids: PriorityBook,
    asks: PriorityBook,
    stop_bids: PriorityBook,
    stop_asks: PriorityBook,

    /// Price of the most recent trade
    last_price: Option<Decimal>,

    /// Sequence number for the next trade
    next_trade_id: u64,

    /// Set after a contract violation; never cleared
    halted: bool,
}

impl OrderBook {
    /// Create a new empty book
    pub fn new(symbol: impl Into<String>) -> Self {
        Self::with_capacity(symbol, 0)
    }

    /// Create a book with pre-allocated order slots
    pub fn with_capacity(symbol: impl Into<String>, order_capacity: usize) -> Self {
        let symbol = symbol.into();
        debug!(symbol = %symbol, capacity = order_capacity, "order book created");
        Self {
            symbol,
            orders: Slab::with_capacity(order_capacity),
            index: HashMap::with_capacity(order_capacity),
            bids: PriorityBook::new(Side::Buy, Policy::Price),
            asks: PriorityBook::new(Side::Sell, Policy::Price),
            stop_bids: PriorityBook::new(Side::Buy, Policy::Stop),
            stop_asks: PriorityBook::new(Side::Sell, Policy::Stop),
            last_price: None,
            next_trade_id: 1,
            halted: false,
        }
    }

    // ========================================================================
    // Capacity and Size
    // ========================================================================

    #[inline]
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.orders.capacity()
    }

    /// Orders held in any collection
    #[inline]
    pub fn order_count(&self) -> usize {
        self.orders.len()
    }

    #[inline]
    pub fn bid_count(&self) -> usize {
        self.bids.len()
    }

    #[inline]
    pub fn ask_count(&self) -> usize {
        self.asks.len()
    }

    /// Pending stop orders on both sides
    #[inline]
    pub fn stop_count(&self) -> usize {
        self.stop_bids.len() + self.stop_asks.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    #[inline]
    pub fn contains_order(&self, order_id: u64) -> bool {
        self.index.contains_key(&order_id)
    }

    /// Look up a resting or pending-stop order by ID
    pub fn get(&self, order_id: u64) -> Option<&Order> {
        let slot = self.index.get(&order_id)?;
        self.orders.get(slot.key)
    }

    /// True if the order is waiting for its stop price
    pub fn is_pending_stop(&self, order_id: u64) -> bool {
        self.index
            .get(&order_id)
            .is_some_and(|slot| slot.location == Location::PendingStop)
    }

    // ========================================================================
    // Halt state
    // ========================================================================

    #[inline]
    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// Stop the book for good after a contract violation
    pub fn halt(&mut self) {
        if !self.halted {
            warn!(symbol = %self.symbol, "order book halted");
        }
        self.halted = true;
    }

    // ========================================================================
    // Order Management
    // ========================================================================

    /// Rest an order in its side's active collection.
    pub fn insert_active(&mut self, order: Order) -> Result<(), EngineError> {
        self.insert(order, Location::Active)
    }

    /// Park a stop order in its side's pending-stop collection.
    pub fn insert_stop(&mut self, order: Order) -> Result<(), EngineError> {
        self.insert(order, Location::PendingStop)
    }

    fn insert(&mut self, order: Order, location: Location) -> Result<(), EngineError> {
        if order.symbol() != self.symbol {
            return Err(ContractViolation::SymbolMismatch {
                order_id: order.id(),
                order_symbol: order.symbol().to_string(),
                book_symbol: self.symbol.clone(),
            }
            .into());
        }
        if self.index.contains_key(&order.id()) {
            return Err(EngineError::DuplicateOrder {
                symbol: self.symbol.clone(),
                order_id: order.id(),
            });
        }

        let order_key = order.key();
        let key = self.orders.vacant_entry().key();
        self.collection_mut(order.side(), location)
            .insert(&order_key, key)?;

        self.orders.insert(order);
        self.index.insert(order_key.id, Slot { key, location });
        Ok(())
    }

    /// Remove an order by ID from whichever collection holds it.
    ///
    /// Returns `None` if no such order is resting or pending.
    pub fn cancel_order(&mut self, order_id: u64) -> Option<Order> {
        let slot = *self.index.get(&order_id)?;
        Some(self.remove_slot(slot))
    }

    fn remove_slot(&mut self, slot: Slot) -> Order {
        let order = self.orders.remove(slot.key);
        let removed = self
            .collection_mut(order.side(), slot.location)
            .remove(&order.key());
        debug_assert_eq!(removed, Some(slot.key), "collection out of sync with slab");
        self.index.remove(&order.id());
        order
    }

    fn collection_mut(&mut self, side: Side, location: Location) -> &mut PriorityBook {
        match (side, location) {
            (Side::Buy, Location::Active) => &mut self.bids,
            (Side::Sell, Location::Active) => &mut self.asks,
            (Side::Buy, Location::PendingStop) => &mut self.stop_bids,
            (Side::Sell, Location::PendingStop) => &mut self.stop_asks,
        }
    }

    fn active(&self, side: Side) -> &PriorityBook {
        match side {
            Side::Buy => &self.bids,
            Side::Sell => &self.asks,
        }
    }

    // ========================================================================
    // Best Bid/Ask
    // ========================================================================

    /// Highest-priority resting buy order
    pub fn best_bid(&self) -> Option<&Order> {
        self.best(Side::Buy)
    }

    /// Highest-priority resting sell order
    pub fn best_ask(&self) -> Option<&Order> {
        self.best(Side::Sell)
    }

    fn best(&self, side: Side) -> Option<&Order> {
        let (_, key) = self.active(side).best()?;
        self.orders.get(key)
    }

    /// best_ask - best_bid, when both sides have orders
    pub fn spread(&self) -> Option<Decimal> {
        let bid = self.best_bid()?.price()?;
        let ask = self.best_ask()?.price()?;
        Some(ask - bid)
    }

    /// Top `levels` aggregated price levels of each side
    pub fn depth(&self, levels: usize) -> DepthSnapshot {
        let pending = |key: usize| {
            self.orders
                .get(key)
                .map_or(Decimal::ZERO, Order::pending_quantity)
        };
        DepthSnapshot {
            symbol: self.symbol.clone(),
            bids: self.bids.levels(levels, pending),
            asks: self.asks.levels(levels, pending),
        }
    }

    // ========================================================================
    // Matching Engine Access
    // ========================================================================

    /// Slab slot of the best resting order on `side`
    pub(crate) fn best_slot(&self, side: Side) -> Option<usize> {
        self.active(side).best().map(|(_, key)| key)
    }

    /// Mutable access to a resting order for one match step
    pub(crate) fn order_mut(&mut self, key: usize) -> &mut Order {
        self.orders
            .get_mut(key)
            .expect("best_slot returned a key missing from the slab")
    }

    /// Remove a filled maker from the active book
    pub(crate) fn remove_active(&mut self, key: usize) -> Order {
        self.remove_slot(Slot {
            key,
            location: Location::Active,
        })
    }

    /// Pull every stop order `last_price` triggers out of the pending
    /// collections, buy stops first, each side in stop-priority order.
    pub(crate) fn take_triggered(&mut self, last_price: Decimal) -> Vec<Order> {
        let mut slots = self.stop_bids.triggered(last_price);
        slots.extend(self.stop_asks.triggered(last_price));

        slots
            .into_iter()
            .map(|key| {
                self.remove_slot(Slot {
                    key,
                    location: Location::PendingStop,
                })
            })
            .collect()
    }

    // ========================================================================
    // Trade sequencing
    // ========================================================================

    /// Sequence number the next trade will carry
    #[inline]
    pub fn peek_trade_id(&self) -> u64 {
        self.next_trade_id
    }

    /// Record an emitted trade: advance the sequence, move the last price
    pub(crate) fn record_trade(&mut self, trade_id: u64, price: Decimal) {
        self.next_trade_id = trade_id + 1;
        self.last_price = Some(price);
    }

    /// Price of the most recent trade in this book
    #[inline]
    pub fn last_price(&self) -> Option<Decimal> {
        self.last_price
    }

    // ========================================================================
    // State root
    // ========================================================================

    /// SHA-256 over every held order, collection by collection in priority
    /// order, plus the last price and trade sequence.
    ///
    /// Identical input sequences produce identical roots.
    pub fn state_root(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(self.symbol.as_bytes());

        for collection in [&self.bids, &self.asks, &self.stop_bids, &self.stop_asks] {
            hasher.update([0xff]);
            for (_, key) in collection.iter_by_priority() {
                if let Some(order) = self.orders.get(key) {
                    hash_order(&mut hasher, order);
                }
            }
        }

        hasher.update([0xfe]);
        if let Some(price) = self.last_price {
            hasher.update(price.normalize().to_string().as_bytes());
        }
        hasher.update(self.next_trade_id.to_le_bytes());

        let mut root = [0u8; 32];
        root.copy_from_slice(&hasher.finalize());
        root
    }

    /// State root as a hex string
    pub fn state_root_hex(&self) -> String {
        hex::encode(self.state_root())
    }
}

fn hash_order(hasher: &mut Sha256, order: &Order) {
    hasher.update(order.id().to_le_bytes());
    hasher.update(order.member_id().to_le_bytes());
    hasher.update([match order.side() {
        Side::Buy => 0u8,
        Side::Sell => 1u8,
    }]);
    for value in [order.price(), order.stop_price()] {
        match value {
            Some(value) => hasher.update(value.normalize().to_string().as_bytes()),
            None => hasher.update(b"-"),
        }
        hasher.update([0]);
    }
    hasher.update(order.quantity().normalize().to_string().as_bytes());
    hasher.update([0]);
    hasher.update(order.filled_quantity().normalize().to_string().as_bytes());
    hasher.update([0, order.is_immediate_or_cancel() as u8]);
    hasher.update(order.created_at().timestamp_micros().to_le_bytes());
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use rust_decimal_macros::dec;

    const SYMBOL: &str = "BTC-USDT";

    fn t(ms: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(1_703_577_600_000 + ms).unwrap()
    }

    fn buy(id: u64, price: Decimal, qty: Decimal) -> Order {
        Order::limit(id, SYMBOL, 100, Side::Buy, price, qty, t(id as i64))
    }

    fn sell(id: u64, price: Decimal, qty: Decimal) -> Order {
        Order::limit(id, SYMBOL, 100, Side::Sell, price, qty, t(id as i64))
    }

    #[test]
    fn test_book_new() {
        let book = OrderBook::new(SYMBOL);

        assert!(book.is_empty());
        assert_eq!(book.symbol(), SYMBOL);
        assert_eq!(book.order_count(), 0);
        assert!(book.best_bid().is_none());
        assert!(book.best_ask().is_none());
        assert!(book.last_price().is_none());
        assert!(!book.is_halted());
        assert_eq!(book.peek_trade_id(), 1);
    }

    #[test]
    fn test_book_with_capacity() {
        let book = OrderBook::with_capacity(SYMBOL, 10_000);
        assert!(book.capacity() >= 10_000);
    }

    #[test]
    fn test_bid_price_priority() {
        let mut book = OrderBook::new(SYMBOL);
        book.insert_active(buy(1, dec!(49000), dec!(1))).unwrap();
        book.insert_active(buy(2, dec!(51000), dec!(1))).unwrap();
        book.insert_active(buy(3, dec!(50000), dec!(1))).unwrap();

        assert_eq!(book.best_bid().unwrap().id(), 2);
        assert_eq!(book.bid_count(), 3);
    }

    #[test]
    fn test_ask_price_priority() {
        let mut book = OrderBook::new(SYMBOL);
        book.insert_active(sell(1, dec!(52000), dec!(1))).unwrap();
        book.insert_active(sell(2, dec!(50000), dec!(1))).unwrap();
        book.insert_active(sell(3, dec!(51000), dec!(1))).unwrap();

        assert_eq!(book.best_ask().unwrap().id(), 2);
        assert_eq!(book.ask_count(), 3);
    }

    #[test]
    fn test_spread() {
        let mut book = OrderBook::new(SYMBOL);
        assert!(book.spread().is_none());

        book.insert_active(buy(1, dec!(50000), dec!(1))).unwrap();
        assert!(book.spread().is_none());

        book.insert_active(sell(2, dec!(51000), dec!(1))).unwrap();
        assert_eq!(book.spread(), Some(dec!(1000)));
    }

    #[test]
    fn test_cancel_active_order() {
        let mut book = OrderBook::new(SYMBOL);
        book.insert_active(buy(42, dec!(50000), dec!(1))).unwrap();
        book.insert_active(buy(43, dec!(49000), dec!(1))).unwrap();

        let cancelled = book.cancel_order(42).unwrap();
        assert_eq!(cancelled.id(), 42);
        assert!(!book.contains_order(42));
        assert_eq!(book.best_bid().unwrap().id(), 43);
    }

    #[test]
    fn test_cancel_pending_stop() {
        let mut book = OrderBook::new(SYMBOL);
        let stop = Order::market(5, SYMBOL, 1, Side::Sell, dec!(1), t(0)).with_stop_price(dec!(90));
        book.insert_stop(stop).unwrap();

        assert!(book.is_pending_stop(5));
        assert_eq!(book.stop_count(), 1);
        assert!(book.best_ask().is_none(), "stops are not active");

        assert!(book.cancel_order(5).is_some());
        assert_eq!(book.stop_count(), 0);
        assert!(book.is_empty());
    }

    #[test]
    fn test_cancel_nonexistent() {
        let mut book = OrderBook::new(SYMBOL);
        assert!(book.cancel_order(999).is_none());
    }

    #[test]
    fn test_duplicate_order_rejected() {
        let mut book = OrderBook::new(SYMBOL);
        book.insert_active(buy(1, dec!(100), dec!(1))).unwrap();

        let err = book.insert_active(buy(1, dec!(101), dec!(1))).unwrap_err();
        assert!(matches!(err, EngineError::DuplicateOrder { order_id: 1, .. }));
        assert_eq!(book.order_count(), 1);
        assert_eq!(book.best_bid().unwrap().price(), Some(dec!(100)));
    }

    #[test]
    fn test_market_order_cannot_rest() {
        let mut book = OrderBook::new(SYMBOL);
        let market = Order::market(1, SYMBOL, 1, Side::Buy, dec!(1), t(0));

        let err = book.insert_active(market).unwrap_err();
        assert!(matches!(
            err,
            EngineError::ContractViolation(ContractViolation::MissingSortPrice { order_id: 1 })
        ));
        assert!(book.is_empty(), "failed insert must not leak a slab entry");
    }

    #[test]
    fn test_symbol_mismatch() {
        let mut book = OrderBook::new(SYMBOL);
        let other = Order::limit(1, "ETH-USDT", 1, Side::Buy, dec!(1), dec!(1), t(0));
        assert!(matches!(
            book.insert_active(other),
            Err(EngineError::ContractViolation(ContractViolation::SymbolMismatch { .. }))
        ));
    }

    #[test]
    fn test_take_triggered() {
        let mut book = OrderBook::new(SYMBOL);
        let s1 = Order::market(1, SYMBOL, 1, Side::Sell, dec!(1), t(0)).with_stop_price(dec!(90));
        let s2 = Order::market(2, SYMBOL, 1, Side::Sell, dec!(1), t(1)).with_stop_price(dec!(80));
        let b1 = Order::market(3, SYMBOL, 1, Side::Buy, dec!(1), t(2)).with_stop_price(dec!(120));
        book.insert_stop(s1).unwrap();
        book.insert_stop(s2).unwrap();
        book.insert_stop(b1).unwrap();

        let triggered = book.take_triggered(dec!(89));
        let ids: Vec<u64> = triggered.iter().map(Order::id).collect();
        assert_eq!(ids, vec![1]);
        assert_eq!(book.stop_count(), 2);
        assert!(!book.contains_order(1));
    }

    #[test]
    fn test_depth() {
        let mut book = OrderBook::new(SYMBOL);
        book.insert_active(buy(1, dec!(100), dec!(1))).unwrap();
        book.insert_active(buy(2, dec!(100), dec!(2))).unwrap();
        book.insert_active(buy(3, dec!(99), dec!(5))).unwrap();
        book.insert_active(sell(4, dec!(101), dec!(0.5))).unwrap();

        let depth = book.depth(5);
        assert_eq!(depth.bids, vec![(dec!(100), dec!(3)), (dec!(99), dec!(5))]);
        assert_eq!(depth.asks, vec![(dec!(101), dec!(0.5))]);
    }

    #[test]
    fn test_state_root_deterministic() {
        let build = || {
            let mut book = OrderBook::new(SYMBOL);
            book.insert_active(buy(1, dec!(100), dec!(1))).unwrap();
            book.insert_active(sell(2, dec!(101), dec!(2))).unwrap();
            book
        };
        assert_eq!(build().state_root(), build().state_root());
        assert_eq!(build().state_root_hex().len(), 64);

        let mut changed = build();
        changed.cancel_order(1);
        assert_ne!(changed.state_root(), build().state_root());
    }

    #[test]
    fn test_record_trade() {
        let mut book = OrderBook::new(SYMBOL);
        book.record_trade(1, dec!(100.5));
        assert_eq!(book.peek_trade_id(), 2);
        assert_eq!(book.last_price(), Some(dec!(100.5)));
    }

    #[test]
    fn test_halt_is_sticky() {
        let mut book = OrderBook::new(SYMBOL);
        book.halt();
        book.halt();
        assert!(book.is_halted());
    }
}
