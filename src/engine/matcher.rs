//! The match function: one resting order against one incoming order.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::error::ContractViolation;
use crate::types::{checked_total, Order, Side, Trade};

/// Match a resting `maker` against an incoming `taker`.
///
/// - Limit taker: trades only if `bid.price >= ask.price`
/// - Market taker: always trades
///
/// On a match both orders are filled by `min(bid pending, ask pending)`
/// at the maker's price and a [`Trade`] carrying `trade_id` is returned.
/// `Ok(None)` means the prices do not cross; neither order is touched.
///
/// # Errors
///
/// Same-side inputs, a maker without a price, an order with nothing left
/// to fill, or a total that `Decimal` cannot hold exactly are contract
/// violations. No fill happens in those cases.
pub fn match_orders(
    trade_id: u64,
    maker: &mut Order,
    taker: &mut Order,
    now: DateTime<Utc>,
) -> Result<Option<Trade>, ContractViolation> {
    if maker.side() == taker.side() {
        return Err(ContractViolation::SameSideMatch {
            side: maker.side(),
            maker_id: maker.id(),
            taker_id: taker.id(),
        });
    }

    let maker_price = maker
        .price()
        .ok_or(ContractViolation::MakerWithoutPrice { order_id: maker.id() })?;

    if let Some(taker_price) = taker.price() {
        let (bid_price, ask_price) = match maker.side() {
            Side::Buy => (maker_price, taker_price),
            Side::Sell => (taker_price, maker_price),
        };
        if bid_price < ask_price {
            return Ok(None);
        }
    }

    for order in [&*maker, &*taker] {
        if order.pending_quantity() <= Decimal::ZERO {
            return Err(ContractViolation::ExhaustedOrder { order_id: order.id() });
        }
    }

    let quantity = maker.pending_quantity().min(taker.pending_quantity());
    let total = checked_total(maker_price, quantity).ok_or(ContractViolation::TotalOutOfRange {
        maker_id: maker.id(),
        taker_id: taker.id(),
        price: maker_price,
        quantity,
    })?;
    maker.fill(quantity);
    taker.fill(quantity);

    Ok(Some(Trade {
        id: trade_id,
        symbol: maker.symbol().to_string(),
        price: maker_price,
        quantity,
        total,
        taker_side: taker.side(),
        maker_order_id: maker.id(),
        taker_order_id: taker.id(),
        maker_member_id: maker.member_id(),
        taker_member_id: taker.member_id(),
        created_at: now,
    }))
}

// ============================================================================
// Unit Tests
// ============================================================================
