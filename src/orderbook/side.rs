//! Priority-ordered collection of one side's orders.
//!
//! ## Design
//!
//! A `PriorityBook` maps [`RankedKey`] to the slab key of the order it
//! ranks. Every entry shares the collection's side, so the ranking is a
//! strict total order and the best order is always the last map entry.
//!
//! ```text
//! lowest priority ... best
//!   first()            last()
//! ```

use std::collections::BTreeMap;

use rust_decimal::Decimal;

use crate::error::ContractViolation;
use crate::orderbook::{OrderKey, Policy, RankedKey};
use crate::types::Side;

/// One of the four collections of an order book
#[derive(Debug, Clone)]
pub struct PriorityBook {
    side: Side,
    policy: Policy,
    entries: BTreeMap<RankedKey, usize>,
}

impl PriorityBook {
    pub fn new(side: Side, policy: Policy) -> Self {
        Self {
            side,
            policy,
            entries: BTreeMap::new(),
        }
    }

    #[inline]
    pub fn side(&self) -> Side {
        self.side
    }

    #[inline]
    pub fn policy(&self) -> Policy {
        self.policy
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insert an order's key with the slab slot holding it.
    ///
    /// Fails if the key belongs to the other side or lacks the price this
    /// collection ranks by.
    pub fn insert(&mut self, key: &OrderKey, slot: usize) -> Result<(), ContractViolation> {
        if key.side != self.side {
            return Err(ContractViolation::WrongCollection {
                order_id: key.id,
                side: key.side,
                collection_side: self.side,
            });
        }
        let ranked = self.policy.rank(key)?;
        self.entries.insert(ranked, slot);
        Ok(())
    }

    /// Remove an order's key, returning its slab slot
    pub fn remove(&mut self, key: &OrderKey) -> Option<usize> {
        let ranked = self.policy.rank(key).ok()?;
        self.entries.remove(&ranked)
    }

    /// The highest-priority entry
    #[inline]
    pub fn best(&self) -> Option<(&RankedKey, usize)> {
        self.entries.last_key_value().map(|(key, slot)| (key, *slot))
    }

    /// All entries from highest to lowest priority
    pub fn iter_by_priority(&self) -> impl Iterator<Item = (&RankedKey, usize)> + '_ {
        self.entries.iter().rev().map(|(key, slot)| (key, *slot))
    }

    /// Slots of the stop orders that `last_price` triggers, best first.
    ///
    /// Triggered entries always form a prefix of the ascending map: buy
    /// stops ascend by stop price and fire at or below the last price, sell
    /// stops ascend by descending stop price and fire at or above it.
    pub fn triggered(&self, last_price: Decimal) -> Vec<usize> {
        debug_assert_eq!(self.policy, Policy::Stop);

        let mut slots: Vec<usize> = self
            .entries
            .iter()
            .take_while(|(key, _)| self.side.stop_triggered(key.price, last_price))
            .map(|(_, slot)| *slot)
            .collect();
        slots.reverse();
        slots
    }

    /// Aggregate `(price, slot)` pairs into at most `levels` price levels,
    /// best first. `pending` maps a slot to its pending quantity.
    pub fn levels<F>(&self, levels: usize, pending: F) -> Vec<(Decimal, Decimal)>
    where
        F: Fn(usize) -> Decimal,
    {
        let mut out: Vec<(Decimal, Decimal)> = Vec::with_capacity(levels);
        for (key, slot) in self.iter_by_priority() {
            match out.last_mut() {
                Some((price, total)) if *price == key.price => *total += pending(slot),
                _ => {
                    if out.len() == levels {
                        break;
                    }
                    out.push((key.price, pending(slot)));
                }
            }
        }
        out
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
