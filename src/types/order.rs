//! Order types for the oceanbook matching core.
//!
//! ## Decimal Representation
//!
//! Prices and quantities are `rust_decimal::Decimal` values. Binary floating
//! point is never used: filled-quantity accounting must not accumulate
//! rounding error.
//!
//! ## Limit, Market and Stop
//!
//! - `price` present ⇒ limit order, absent ⇒ market order
//! - `stop_price` present ⇒ the order waits in a pending-stop collection
//!   until the last traded price crosses it

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::OrderError;
use crate::orderbook::OrderKey;
use crate::types::checked_total;

// ============================================================================
// Side enum
// ============================================================================

/// Order side: Buy or Sell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Buy order (bid) - wants to purchase the asset
    Buy,
    /// Sell order (ask) - wants to sell the asset
    Sell,
}

impl Side {
    /// Returns the opposite side
    pub fn opposite(self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }

    /// Whether a stop order on this side fires at `last_price`.
    ///
    /// Buy stops fire when the market trades at or above the stop,
    /// sell stops when it trades at or below.
    pub fn stop_triggered(self, stop_price: Decimal, last_price: Decimal) -> bool {
        match self {
            Side::Buy => last_price >= stop_price,
            Side::Sell => last_price <= stop_price,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Side::Buy => "buy",
            Side::Sell => "sell",
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Order struct
// ============================================================================

/// One order, resting or incoming.
///
/// Identity, side, prices and creation time are fixed at construction.
/// The only mutable state is the filled quantity, which grows through
/// [`Order::fill`] and never exceeds the order quantity.
///
/// ## Example
///
/// ```
/// use chrono::Utc;
/// use oceanbook::types::{Order, Side};
/// use rust_decimal::Decimal;
///
/// let order = Order::limit(1, "BTC-USDT", 100, Side::Buy, Decimal::new(50_000, 0), Decimal::ONE, Utc::now());
/// assert!(order.is_limit());
/// assert_eq!(order.pending_quantity(), Decimal::ONE);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    id: u64,
    symbol: String,
    member_id: u64,
    side: Side,
    price: Option<Decimal>,
    stop_price: Option<Decimal>,
    quantity: Decimal,
    filled_quantity: Decimal,
    immediate_or_cancel: bool,
    created_at: DateTime<Utc>,
}

impl Order {
    /// Create a limit order
    ///
    /// # Arguments
    ///
    /// * `id` - Unique order identifier (lower ID ⇒ earlier submission)
    /// * `symbol` - Traded symbol
    /// * `member_id` - Owning member
    /// * `side` - Buy or Sell
    /// * `price` - Limit price
    /// * `quantity` - Order quantity
    /// * `created_at` - Submission time
    pub fn limit(
        id: u64,
        symbol: impl Into<String>,
        member_id: u64,
        side: Side,
        price: Decimal,
        quantity: Decimal,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            symbol: symbol.into(),
            member_id,
            side,
            price: Some(price),
            stop_price: None,
            quantity,
            filled_quantity: Decimal::ZERO,
            immediate_or_cancel: false,
            created_at,
        }
    }

    /// Create a market order (no price)
    pub fn market(
        id: u64,
        symbol: impl Into<String>,
        member_id: u64,
        side: Side,
        quantity: Decimal,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            price: None,
            ..Self::limit(id, symbol, member_id, side, Decimal::ZERO, quantity, created_at)
        }
    }

    /// Attach a stop price, turning this into a stop(-limit) order
    pub fn with_stop_price(mut self, stop_price: Decimal) -> Self {
        self.stop_price = Some(stop_price);
        self
    }

    /// Mark the order immediate-or-cancel
    pub fn immediate_or_cancel(mut self) -> Self {
        self.immediate_or_cancel = true;
        self
    }

    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[inline]
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    #[inline]
    pub fn member_id(&self) -> u64 {
        self.member_id
    }

    #[inline]
    pub fn side(&self) -> Side {
        self.side
    }

    #[inline]
    pub fn price(&self) -> Option<Decimal> {
        self.price
    }

    #[inline]
    pub fn stop_price(&self) -> Option<Decimal> {
        self.stop_price
    }

    #[inline]
    pub fn quantity(&self) -> Decimal {
        self.quantity
    }

    #[inline]
    pub fn filled_quantity(&self) -> Decimal {
        self.filled_quantity
    }

    #[inline]
    pub fn is_immediate_or_cancel(&self) -> bool {
        self.immediate_or_cancel
    }

    #[inline]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// True when the order has a price
    #[inline]
    pub fn is_limit(&self) -> bool {
        self.price.is_some()
    }

    /// True when the order has no price
    #[inline]
    pub fn is_market(&self) -> bool {
        self.price.is_none()
    }

    /// True while the order still waits for its stop price
    #[inline]
    pub fn is_stop(&self) -> bool {
        self.stop_price.is_some()
    }

    /// Check if the order is fully filled
    #[inline]
    pub fn filled(&self) -> bool {
        self.filled_quantity == self.quantity
    }

    /// Quantity not yet filled
    #[inline]
    pub fn pending_quantity(&self) -> Decimal {
        self.quantity - self.filled_quantity
    }

    /// Add `amount` to the filled quantity.
    ///
    /// The caller guarantees `amount <= pending_quantity()`; the match
    /// function is the only caller and always passes the minimum of both
    /// sides' pending quantities.
    #[inline]
    pub fn fill(&mut self, amount: Decimal) {
        self.filled_quantity += amount;
        debug_assert!(
            self.filled_quantity <= self.quantity,
            "order {} overfilled: {} > {}",
            self.id,
            self.filled_quantity,
            self.quantity
        );
    }

    /// Release a triggered stop order into the active book.
    pub(crate) fn activate(&mut self) {
        self.stop_price = None;
    }

    /// The fields used to rank this order against others of its side.
    pub fn key(&self) -> OrderKey {
        OrderKey {
            id: self.id,
            side: self.side,
            price: self.price,
            stop_price: self.stop_price,
            created_at: self.created_at,
        }
    }

    /// Most decimal places accepted for a price or quantity at intake.
    ///
    /// Two such values multiply to at most 28 places, the `Decimal` limit,
    /// so trade totals never need rounding.
    pub const MAX_SCALE: u32 = 14;

    /// Intake checks run before an order reaches a book.
    ///
    /// The matching core assumes validated input; this is what the
    /// exchange layer calls on every submission. Besides sign checks it
    /// bounds precision by [`Order::MAX_SCALE`] and requires a limit
    /// order's own notional to be exactly representable.
    pub fn validate(&self) -> Result<(), OrderError> {
        if self.symbol.is_empty() {
            return Err(OrderError::EmptySymbol { order_id: self.id });
        }
        if self.quantity <= Decimal::ZERO {
            return Err(OrderError::NonPositiveQuantity {
                order_id: self.id,
                quantity: self.quantity,
            });
        }
        if self.filled_quantity.is_sign_negative() || self.filled_quantity > self.quantity {
            return Err(OrderError::FilledOutOfRange {
                order_id: self.id,
                filled: self.filled_quantity,
                quantity: self.quantity,
            });
        }
        if let Some(price) = self.price {
            if price <= Decimal::ZERO {
                return Err(OrderError::NonPositivePrice { order_id: self.id, price });
            }
        }
        if let Some(stop_price) = self.stop_price {
            if stop_price <= Decimal::ZERO {
                return Err(OrderError::NonPositivePrice {
                    order_id: self.id,
                    price: stop_price,
                });
            }
        }

        let fields = [
            ("quantity", Some(self.quantity)),
            ("price", self.price),
            ("stop price", self.stop_price),
        ];
        for (field, value) in fields {
            if let Some(value) = value.filter(|v| v.scale() > Self::MAX_SCALE) {
                return Err(OrderError::ScaleTooLarge {
                    order_id: self.id,
                    field,
                    value,
                    max: Self::MAX_SCALE,
                });
            }
        }

        if let Some(price) = self.price {
            if checked_total(price, self.quantity).is_none() {
                return Err(OrderError::NotionalOutOfRange {
                    order_id: self.id,
                    price,
                    quantity: self.quantity,
                });
            }
        }
        Ok(())
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
