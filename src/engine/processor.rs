//! Order processing: the matching loop and the stop trigger sweep.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, error, info};

use crate::engine::matcher::match_orders;
use crate::error::{ContractViolation, EngineError};
use crate::orderbook::OrderBook;
use crate::types::{Order, Trade};

/// What happened to the submitted order itself
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Disposition {
    /// Completely filled during the pass
    Filled,
    /// Unfilled remainder rests in the active book
    Rested { remaining: Decimal },
    /// Unfilled remainder dropped (immediate-or-cancel or market order)
    Discarded { remaining: Decimal },
    /// Held in a pending-stop collection until its stop price trades
    Parked,
}

/// Outcome of one submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchResult {
    pub order_id: u64,
    pub disposition: Disposition,
    /// Every trade of the pass, in execution order, including trades made
    /// by stop orders the pass triggered
    pub trades: Vec<Trade>,
    /// IDs of stop orders released into the active book, in release order
    pub triggered: Vec<u64>,
}

impl MatchResult {
    #[inline]
    pub fn fully_filled(&self) -> bool {
        self.disposition == Disposition::Filled
    }
}

/// Runs submissions and cancels against one [`OrderBook`] at a time.
///
/// The engine keeps only counters; all order state lives in the book.
#[derive(Debug, Default)]
pub struct MatchingEngine {
    orders_processed: u64,
    trades_executed: u64,
}

impl MatchingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn orders_processed(&self) -> u64 {
        self.orders_processed
    }

    #[inline]
    pub fn trades_executed(&self) -> u64 {
        self.trades_executed
    }

    /// Submit `order` to `book`.
    ///
    /// A stop order is parked until a trade reaches its stop price. If the
    /// book's last traded price has already crossed the stop price when the
    /// order arrives, it is activated on submission and matched right away
    /// instead of being parked.
    ///
    /// A contract violation halts the book before the error is returned;
    /// every later call on that book fails with [`EngineError::Halted`].
    /// When trades of this call executed before the violation (for example
    /// earlier steps of a stop cascade), they are final and come back in
    /// [`EngineError::ViolationAfterTrades`].
    pub fn match_order(
        &mut self,
        book: &mut OrderBook,
        order: Order,
        now: DateTime<Utc>,
    ) -> Result<MatchResult, EngineError> {
        ensure_running(book)?;

        let mut result = MatchResult {
            order_id: order.id(),
            disposition: Disposition::Parked,
            trades: Vec::new(),
            triggered: Vec::new(),
        };
        match self.process(book, order, now, &mut result) {
            Ok(()) => Ok(result),
            Err(EngineError::ContractViolation(violation)) => {
                error!(
                    symbol = %book.symbol(),
                    %violation,
                    executed = result.trades.len(),
                    "contract violation while matching"
                );
                book.halt();
                if result.trades.is_empty() {
                    Err(violation.into())
                } else {
                    Err(EngineError::ViolationAfterTrades {
                        violation,
                        trades: result.trades,
                    })
                }
            }
            Err(err) => Err(err),
        }
    }

    /// Cancel a resting or pending-stop order.
    ///
    /// `Ok(None)` when the book holds no order with that ID.
    pub fn cancel_order(
        &mut self,
        book: &mut OrderBook,
        order_id: u64,
    ) -> Result<Option<Order>, EngineError> {
        ensure_running(book)?;

        let cancelled = book.cancel_order(order_id);
        match &cancelled {
            Some(order) => debug!(
                symbol = %book.symbol(),
                order_id,
                pending = %order.pending_quantity(),
                "order cancelled"
            ),
            None => debug!(symbol = %book.symbol(), order_id, "cancel: order not found"),
        }
        Ok(cancelled)
    }

    fn process(
        &mut self,
        book: &mut OrderBook,
        mut order: Order,
        now: DateTime<Utc>,
        result: &mut MatchResult,
    ) -> Result<(), EngineError> {
        if order.symbol() != book.symbol() {
            return Err(ContractViolation::SymbolMismatch {
                order_id: order.id(),
                order_symbol: order.symbol().to_string(),
                book_symbol: book.symbol().to_string(),
            }
            .into());
        }
        if book.contains_order(order.id()) {
            return Err(EngineError::DuplicateOrder {
                symbol: book.symbol().to_string(),
                order_id: order.id(),
            });
        }

        self.orders_processed += 1;

        if let Some(stop_price) = order.stop_price() {
            let armed = book
                .last_price()
                .is_some_and(|last| order.side().stop_triggered(stop_price, last));
            if !armed {
                debug!(symbol = %book.symbol(), order_id = order.id(), %stop_price, "stop order parked");
                book.insert_stop(order)?;
                return Ok(());
            }
            debug!(symbol = %book.symbol(), order_id = order.id(), %stop_price, "stop already crossed, activating");
            order.activate();
        }

        result.disposition = self.execute(book, order, now, &mut result.trades)?;

        let mut released = VecDeque::new();
        if !result.trades.is_empty() {
            self.sweep(book, &mut released);
        }

        while let Some(mut stop_order) = released.pop_front() {
            stop_order.activate();
            result.triggered.push(stop_order.id());

            let traded = result.trades.len();
            self.execute(book, stop_order, now, &mut result.trades)?;
            if result.trades.len() > traded {
                self.sweep(book, &mut released);
            }
        }

        Ok(())
    }

    /// Match `taker` until it is filled or the best opposing order no
    /// longer crosses, then rest or discard the remainder.
    fn execute(
        &mut self,
        book: &mut OrderBook,
        mut taker: Order,
        now: DateTime<Utc>,
        trades: &mut Vec<Trade>,
    ) -> Result<Disposition, EngineError> {
        let opposite = taker.side().opposite();

        while !taker.filled() {
            let Some(slot) = book.best_slot(opposite) else {
                break;
            };

            let trade_id = book.peek_trade_id();
            let maker = book.order_mut(slot);
            let Some(trade) = match_orders(trade_id, maker, &mut taker, now)? else {
                break;
            };
            let maker_filled = maker.filled();

            book.record_trade(trade.id, trade.price);
            self.trades_executed += 1;
            if maker_filled {
                let maker = book.remove_active(slot);
                debug!(symbol = %book.symbol(), order_id = maker.id(), "maker filled");
            }
            trades.push(trade);
        }

        if taker.filled() {
            return Ok(Disposition::Filled);
        }

        let remaining = taker.pending_quantity();
        if taker.is_immediate_or_cancel() || taker.is_market() {
            debug!(
                symbol = %book.symbol(),
                order_id = taker.id(),
                %remaining,
                "unfilled remainder discarded"
            );
            return Ok(Disposition::Discarded { remaining });
        }

        debug!(symbol = %book.symbol(), order_id = taker.id(), %remaining, "order rested");
        book.insert_active(taker)?;
        Ok(Disposition::Rested { remaining })
    }

    /// Release the stop orders the current last price triggers.
    fn sweep(&mut self, book: &mut OrderBook, released: &mut VecDeque<Order>) {
        let Some(last_price) = book.last_price() else {
            return;
        };
        for order in book.take_triggered(last_price) {
            info!(
                symbol = %book.symbol(),
                order_id = order.id(),
                stop_price = ?order.stop_price(),
                %last_price,
                "stop order triggered"
            );
            released.push_back(order);
        }
    }
}

fn ensure_running(book: &OrderBook) -> Result<(), EngineError> {
    if book.is_halted() {
        return Err(EngineError::Halted {
            symbol: book.symbol().to_string(),
        });
    }
    Ok(())
}

// ============================================================================
// Unit Tests
// ============================================================================
