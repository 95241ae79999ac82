//! Core data types for oceanbook
//!
//! ## Types
//!
//! - [`Order`]: A limit, market or stop order and its fill progress
//! - [`Side`]: Buy or Sell
//! - [`Trade`]: An executed trade between two orders
//!
//! All prices and quantities are `rust_decimal::Decimal`.

mod order;
mod trade;

pub use order::{Order, Side};
pub use trade::{checked_total, Trade};
