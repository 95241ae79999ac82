//! Ordering keys and the two ordering policies.
//!
//! ## Best = Maximum
//!
//! Both policies rank orders of one side so that the best order is the
//! maximum element, on either side:
//!
//! | Side | Higher priority |
//! |------|-----------------|
//! | Buy  | higher price    |
//! | Sell | lower price     |
//!
//! Ties on price go to the earlier `created_at`, then to the lower ID.
//!
//! The price policy ranks active orders by limit price; the stop policy
//! ranks pending stop orders by stop price. Comparing keys of different
//! sides is a [`ContractViolation`].

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::error::ContractViolation;
use crate::types::Side;

/// The subset of an order's fields used for ranking.
///
/// Derived from an [`Order`](crate::types::Order) with
/// [`Order::key`](crate::types::Order::key); never mutated independently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderKey {
    pub id: u64,
    pub side: Side,
    pub price: Option<Decimal>,
    pub stop_price: Option<Decimal>,
    pub created_at: DateTime<Utc>,
}

/// Which price an ordering policy ranks by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Policy {
    /// Limit price; ranks the active bid/ask collections
    Price,
    /// Stop price; ranks the pending-stop collections
    Stop,
}

impl Policy {
    /// The price this policy ranks `key` by, if the order has one
    #[inline]
    pub fn sort_price(self, key: &OrderKey) -> Option<Decimal> {
        match self {
            Policy::Price => key.price,
            Policy::Stop => key.stop_price,
        }
    }

    /// Compare two keys of the same side.
    ///
    /// `Ordering::Greater` means `a` has the higher matching priority.
    /// Keys with equal IDs are equal regardless of their other fields.
    pub fn compare(self, a: &OrderKey, b: &OrderKey) -> Result<Ordering, ContractViolation> {
        if a.side != b.side {
            return Err(ContractViolation::CrossSideComparison {
                left_id: a.id,
                left_side: a.side,
                right_id: b.id,
                right_side: b.side,
            });
        }
        if a.id == b.id {
            return Ok(Ordering::Equal);
        }

        Ok(self.rank(a)?.cmp(&self.rank(b)?))
    }

    /// Extract the totally ordered rank of `key` under this policy.
    pub fn rank(self, key: &OrderKey) -> Result<RankedKey, ContractViolation> {
        let price = self
            .sort_price(key)
            .ok_or(ContractViolation::MissingSortPrice { order_id: key.id })?;

        Ok(RankedKey {
            side: key.side,
            price,
            created_at: key.created_at,
            id: key.id,
        })
    }
}

/// A ranked position inside one side-homogeneous collection.
///
/// `Ord` implements the ordering policy directly so a `BTreeMap` keyed by
/// `RankedKey` keeps the best order last. Only keys of one side are ever
/// stored together; [`PriorityBook`](super::PriorityBook) checks that on
/// insertion.
#[derive(Debug, Clone, Copy)]
pub struct RankedKey {
    pub side: Side,
    pub price: Decimal,
    pub created_at: DateTime<Utc>,
    pub id: u64,
}

impl Ord for RankedKey {
    fn cmp(&self, other: &Self) -> Ordering {
        debug_assert_eq!(self.side, other.side, "ranked keys of different sides compared");

        if self.id == other.id {
            return Ordering::Equal;
        }

        let by_price = match self.side {
            Side::Buy => self.price.cmp(&other.price),
            Side::Sell => other.price.cmp(&self.price),
        };

        by_price
            .then_with(|| other.created_at.cmp(&self.created_at))
            .then_with(|| other.id.cmp(&self.id))
    }
}

impl PartialOrd for RankedKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for RankedKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for RankedKey {}

// ============================================================================
// Unit Tests
// ============================================================================
