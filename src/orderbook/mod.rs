//! Order book module for the oceanbook matching core.
//!
//! ## Architecture
//!
//! Each symbol has one [`OrderBook`] holding four priority-ordered
//! collections:
//!
//! | Collection | Side | Ranked by |
//! |------------|------|-----------|
//! | bids       | Buy  | price     |
//! | asks       | Sell | price     |
//! | stop bids  | Buy  | stop price|
//! | stop asks  | Sell | stop price|
//!
//! ## Components
//!
//! - [`OrderKey`], [`Policy`], [`RankedKey`]: the ordering policies
//! - [`PriorityBook`]: one side-homogeneous ranked collection
//! - [`OrderBook`]: slab-owned orders plus the four collections
//!
//! ## Performance
//!
//! | Operation | Complexity |
//! |-----------|------------|
//! | Insert order | O(log n) |
//! | Cancel order by ID | O(log n) |
//! | Best bid/ask | O(log n) |
//! | Stop sweep | O(k log n) for k triggered |

pub mod priority;
pub mod side;
pub mod book;

pub use priority::{OrderKey, Policy, RankedKey};
pub use side::PriorityBook;
pub use book::{DepthSnapshot, OrderBook};
