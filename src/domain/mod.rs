// ============================================================================
// Domain Models Module
// Contains all core domain entities and value objects
// ============================================================================

pub mod account;
pub mod config;
pub mod execution_policy;
pub mod instrument;
pub mod order;
pub mod order_book;
pub mod trade;

pub use account::{Account, AccountId, AccountRegistry, AccountSnapshot, Ledger};
pub use config::{
    ConfigError, EngineConfig, MarketOrderPolicy, SettlementFailurePolicy, TradePricing,
};
pub use execution_policy::EffectivePrice;
pub use instrument::{Instrument, InstrumentId, Symbol};
pub use order::{
    Order, OrderId, OrderKind, OrderStatusReport, OrderType, Side, MAX_ORDER_QUANTITY,
};
pub use order_book::{OrderBook, OrderBookLevel, OrderBookSide, OrderBookSnapshot};
pub use trade::Trade;

// Re-export state machine
pub use order::state::{OrderStatus, OrderStatusTransition};
