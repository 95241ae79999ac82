//! Error types for the matching core.
//!
//! Three kinds of outcome are kept apart:
//!
//! - [`ContractViolation`]: a bug in the caller (same-side match, cross-side
//!   comparison, ...). Fatal for the symbol's book: the engine halts it and
//!   every later operation on it fails with [`EngineError::Halted`].
//! - No match and not found: ordinary return values (`None`, `false`),
//!   never errors.
//! - [`OrderError`]: malformed input rejected by the intake layer before it
//!   reaches a book.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::types::{Side, Trade};

/// A programming-contract violation. Never recoverable.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContractViolation {
    #[error("match order with same side {side}: maker {maker_id}, taker {taker_id}")]
    SameSideMatch { side: Side, maker_id: u64, taker_id: u64 },

    #[error("compare order keys with different sides: {left_id} ({left_side}) vs {right_id} ({right_side})")]
    CrossSideComparison {
        left_id: u64,
        left_side: Side,
        right_id: u64,
        right_side: Side,
    },

    #[error("order {order_id} has no price to rank by")]
    MissingSortPrice { order_id: u64 },

    #[error("resting maker order {order_id} has no price")]
    MakerWithoutPrice { order_id: u64 },

    #[error("order {order_id} has nothing left to fill")]
    ExhaustedOrder { order_id: u64 },

    #[error("order {order_id} ({side}) inserted into the {collection_side} collection")]
    WrongCollection {
        order_id: u64,
        side: Side,
        collection_side: Side,
    },

    #[error("trade total {price} x {quantity} between maker {maker_id} and taker {taker_id} is not exactly representable")]
    TotalOutOfRange {
        maker_id: u64,
        taker_id: u64,
        price: Decimal,
        quantity: Decimal,
    },

    #[error("order {order_id} for symbol {order_symbol} routed to book {book_symbol}")]
    SymbolMismatch {
        order_id: u64,
        order_symbol: String,
        book_symbol: String,
    },
}

/// Intake validation failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OrderError {
    #[error("order {order_id} has no symbol")]
    EmptySymbol { order_id: u64 },

    #[error("order {order_id} has non-positive quantity {quantity}")]
    NonPositiveQuantity { order_id: u64, quantity: Decimal },

    #[error("order {order_id} has non-positive price {price}")]
    NonPositivePrice { order_id: u64, price: Decimal },

    #[error("order {order_id} {field} {value} has more than {max} decimal places")]
    ScaleTooLarge {
        order_id: u64,
        field: &'static str,
        value: Decimal,
        max: u32,
    },

    #[error("order {order_id} notional {price} x {quantity} is out of range")]
    NotionalOutOfRange {
        order_id: u64,
        price: Decimal,
        quantity: Decimal,
    },

    #[error("order {order_id} filled quantity {filled} outside 0..={quantity}")]
    FilledOutOfRange {
        order_id: u64,
        filled: Decimal,
        quantity: Decimal,
    },
}

/// Top-level engine error
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("contract violation: {0}")]
    ContractViolation(#[from] ContractViolation),

    /// A violation hit after some trades of the same submission had
    /// already executed; those trades are final and must be settled.
    #[error("contract violation after {} trades: {violation}", trades.len())]
    ViolationAfterTrades {
        #[source]
        violation: ContractViolation,
        trades: Vec<Trade>,
    },

    #[error("book {symbol} is halted after a contract violation")]
    Halted { symbol: String },

    #[error("invalid order: {0}")]
    InvalidOrder(#[from] OrderError),

    #[error("unknown symbol: {symbol}")]
    UnknownSymbol { symbol: String },

    #[error("order {order_id} is already in book {symbol}")]
    DuplicateOrder { symbol: String, order_id: u64 },

    #[error("book {symbol} is not accepting commands")]
    Unavailable { symbol: String },
}

impl EngineError {
    /// True for errors that mean the book can no longer be trusted
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            EngineError::ContractViolation(_)
                | EngineError::ViolationAfterTrades { .. }
                | EngineError::Halted { .. }
        )
    }
}

/// Configuration loading failures
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}
