// ============================================================================
// Exchange Errors
// Recoverable error taxonomy surfaced by the exchange facade
// ============================================================================

use crate::domain::config::ConfigError;
use crate::domain::{AccountId, OrderId, OrderStatus, Symbol};
use crate::numeric::{Cash, NumericError, Price, Quantity};
use thiserror::Error;

/// Malformed order or listing request. Rejected before anything touches a book.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("order quantity must be positive")]
    ZeroQuantity,

    #[error("order quantity exceeds maximum of {max}")]
    QuantityTooLarge { max: Quantity },

    #[error("limit orders require a limit price")]
    MissingLimitPrice,

    #[error("limit price must be positive, got {0}")]
    NonPositiveLimitPrice(Price),

    #[error("market orders must not carry a limit price")]
    UnexpectedLimitPrice,

    #[error("price {price} is not a multiple of tick size {tick_size}")]
    OffTick { price: Price, tick_size: Price },

    #[error("instrument price must be positive, got {0}")]
    NonPositivePrice(Price),

    #[error("initial cash must not be negative, got {0}")]
    NegativeCash(Cash),

    #[error("instrument symbol must not be empty")]
    EmptySymbol,
}

/// Top-level error returned by every fallible exchange operation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExchangeError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("insufficient funds: required {required}, available {available}")]
    InsufficientFunds { required: Cash, available: Cash },

    #[error("insufficient position in {symbol}: required {required}, available {available}")]
    InsufficientPosition {
        symbol: Symbol,
        required: Quantity,
        available: Quantity,
    },

    #[error("order not found: {0}")]
    OrderNotFound(OrderId),

    #[error("order {order_id} is already terminal ({status:?})")]
    AlreadyTerminalOrder {
        order_id: OrderId,
        status: OrderStatus,
    },

    #[error("account not found: {0}")]
    AccountNotFound(AccountId),

    #[error("instrument not found: {0}")]
    InstrumentNotFound(Symbol),

    #[error("instrument already listed: {0}")]
    DuplicateInstrument(Symbol),

    #[error("no opposite liquidity for market order on {0}")]
    NoLiquidity(Symbol),

    #[error("numeric error: {0}")]
    Numeric(#[from] NumericError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Result alias used across the crate's public surface
pub type ExchangeResult<T> = Result<T, ExchangeError>;
