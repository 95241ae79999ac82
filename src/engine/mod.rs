//! Matching engine module for oceanbook.
//!
//! ## Design Principles
//!
//! 1. **Determinism**: Same input sequence always produces the same trades
//! 2. **Decimal Math**: No floating-point operations
//! 3. **Synchronous Execution**: No async/await in the matching path
//! 4. **Price-Time Priority**: Best price first, then earliest, then lowest ID
//!
//! ## Matching Rules
//!
//! - **Buy orders** match against asks (lowest price first)
//! - **Sell orders** match against bids (highest price first)
//! - Trades execute at the **maker's** price
//! - **Partial fills** are supported
//! - Unfilled limit quantity rests; IOC and market remainders are discarded
//! - Trades move the last price, which may release pending stop orders
//!
//! ## Example
//!
//! ```
//! use chrono::Utc;
//! use oceanbook::engine::MatchingEngine;
//! use oceanbook::orderbook::OrderBook;
//! use oceanbook::types::{Order, Side};
//! use rust_decimal::Decimal;
//!
//! let mut book = OrderBook::with_capacity("BTC-USDT", 1000);
//! let mut engine = MatchingEngine::new();
//! let price = Decimal::new(50_000, 0);
//!
//! // Resting sell order
//! let sell = Order::limit(1, "BTC-USDT", 100, Side::Sell, price, Decimal::ONE, Utc::now());
//! engine.match_order(&mut book, sell, Utc::now()).unwrap();
//!
//! // Incoming buy order matches it
//! let buy = Order::limit(2, "BTC-USDT", 101, Side::Buy, price, Decimal::ONE, Utc::now());
//! let result = engine.match_order(&mut book, buy, Utc::now()).unwrap();
//!
//! assert!(result.fully_filled());
//! assert_eq!(result.trades.len(), 1);
//! ```

pub mod matcher;
pub mod processor;

pub use matcher::match_orders;
pub use processor::{Disposition, MatchResult, MatchingEngine};
