//! # oceanbook
//!
//! Price-time priority order matching core with stop orders.
//!
//! ## Architecture
//!
//! - **Types**: `Order`, `Trade`, `Side`
//! - **OrderBook**: per-symbol book; slab-owned orders ranked in four
//!   priority collections (bids, asks, stop bids, stop asks)
//! - **Engine**: the match function, the matching loop and the stop sweep
//! - **Exchange**: one tokio task per symbol owning that symbol's book
//!
//! ## Design Principles
//!
//! 1. **Determinism**: identical input sequences produce identical trades
//!    and identical book state roots
//! 2. **No Floating Point**: prices and quantities are `rust_decimal::Decimal`
//! 3. **Sequential per symbol**: a book is only ever touched by its owner
//! 4. **Fail fast**: a contract violation halts the book; it never resumes
//! 5. **Synchronous matching**: no async in the matching path

// ============================================================================
// Module declarations
// ============================================================================

/// Core data types: Order, Trade, Side
pub mod types;

/// Order book: ordering policies, priority collections, per-symbol book
pub mod orderbook;

/// Matching engine: match function, matching loop, stop sweep
pub mod engine;

/// Per-symbol book actors
pub mod exchange;

pub mod config;
pub mod error;
pub mod logging;

// ============================================================================
// Re-exports for convenience
// ============================================================================

pub use config::EngineConfig;
pub use engine::{Disposition, MatchResult, MatchingEngine};
pub use error::{ConfigError, ContractViolation, EngineError, OrderError};
pub use exchange::Exchange;
pub use orderbook::{DepthSnapshot, OrderBook};
pub use types::{Order, Side, Trade};
