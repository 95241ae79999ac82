//! Trade type representing an executed match between two orders.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::Side;

/// A trade represents a single match between a maker and taker order.
///
/// ## Terminology
///
/// - **Maker**: The resting order that was already in the book
/// - **Taker**: The incoming order that triggered the match
///
/// ## Price Discovery
///
/// The trade always executes at the maker's price (the resting order's price).
///
/// Trades are created once by the match function and handed to the caller
/// by value; nothing in the book keeps a reference to them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    /// Per-book sequence number, strictly increasing
    pub id: u64,

    pub symbol: String,

    /// Execution price, always the maker's price
    pub price: Decimal,

    /// Executed quantity
    pub quantity: Decimal,

    /// price × quantity
    pub total: Decimal,

    /// Side of the incoming (aggressor) order
    pub taker_side: Side,

    /// Maker order ID (the resting order)
    pub maker_order_id: u64,

    /// Taker order ID (the incoming order)
    pub taker_order_id: u64,

    pub maker_member_id: u64,

    pub taker_member_id: u64,

    /// Match time
    pub created_at: DateTime<Utc>,
}

impl Trade {
    /// Notional value of the trade recomputed from price and quantity.
    pub fn notional(&self) -> Option<Decimal> {
        checked_total(self.price, self.quantity)
    }
}

/// `price × quantity`, or `None` when the product overflows or needs more
/// fractional digits than a `Decimal` holds.
///
/// `Decimal` multiplication silently rounds once the combined scale passes
/// 28 or the mantissa outgrows 96 bits; a rounded product keeps fewer
/// decimal places than `price.scale() + quantity.scale()`.
///
/// ```
/// use oceanbook::types::checked_total;
/// use rust_decimal::Decimal;
///
/// assert_eq!(checked_total(Decimal::new(150, 2), Decimal::new(3, 0)), Some(Decimal::new(450, 2)));
/// assert_eq!(checked_total(Decimal::new(1, 14), Decimal::new(1, 15)), None);
/// ```
pub fn checked_total(price: Decimal, quantity: Decimal) -> Option<Decimal> {
    if price.is_zero() || quantity.is_zero() {
        return Some(Decimal::ZERO);
    }
    let total = price.checked_mul(quantity)?;
    (total.scale() == price.scale() + quantity.scale()).then_some(total)
}

// ============================================================================
// Unit Tests
// ============================================================================
