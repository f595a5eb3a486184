// ============================================================================
// Exchange Engine Library
// Per-instrument order books, price-time matching and atomic settlement
// ============================================================================

//! # Exchange Engine
//!
//! Order matching core for a simplified stock brokerage.
//!
//! ## Features
//!
//! - **One book per instrument**, each behind its own lock, so unrelated
//!   symbols never contend
//! - **Price/time priority** matching run to a fixed point after every change
//! - **All-or-nothing settlement** of cash and shares across two ledgers
//! - **Lock-free status reads**: order progress is packed into one atomic word
//! - **Bounded notification channels** for order-status and price watchers
//!
//! ## Example
//!
//! ```rust
//! use exchange_engine::prelude::*;
//! use rust_decimal::Decimal;
//!
//! let exchange = Exchange::new(EngineConfig::default()).unwrap();
//! exchange.list_instrument("AAPL", Decimal::from(100)).unwrap();
//!
//! let alice = exchange.open_account(Decimal::from(1000)).unwrap();
//! let bob = exchange.open_account(Decimal::ZERO).unwrap();
//! exchange.grant_position(bob, "AAPL", 10).unwrap();
//!
//! let buy = exchange
//!     .submit_order(alice, "AAPL", Side::Buy, OrderType::Limit, 10, Some(Decimal::from(100)))
//!     .unwrap();
//! exchange
//!     .submit_order(bob, "AAPL", Side::Sell, OrderType::Limit, 10, Some(Decimal::from(100)))
//!     .unwrap();
//!
//! assert_eq!(exchange.get_order_status(buy).unwrap().status, OrderStatus::Filled);
//! assert_eq!(exchange.get_account_snapshot(alice).unwrap().position("AAPL"), 10);
//! ```

pub mod domain;
pub mod engine;
pub mod errors;
pub mod interfaces;
pub mod numeric;
pub mod service;

#[cfg(feature = "logging")]
pub mod logging;

// Re-exports for convenience
pub mod prelude {
    pub use crate::domain::order::state::{OrderStatus, OrderStatusTransition};
    pub use crate::domain::{
        AccountId, AccountRegistry, AccountSnapshot, EngineConfig, Instrument, InstrumentId,
        MarketOrderPolicy, Order, OrderBookSnapshot, OrderId, OrderKind, OrderStatusReport,
        OrderType, SettlementFailurePolicy, Side, Symbol, Trade, TradePricing,
    };
    pub use crate::engine::{
        create_from_config, CancelOutcome, MatchingEngine, MatchingEngineBuilder,
        PriceTimePriority,
    };
    pub use crate::errors::{ExchangeError, ExchangeResult, ValidationError};
    pub use crate::interfaces::{
        EventHandler, FanOutEventHandler, LoggingEventHandler, MatchingAlgorithm,
        NoOpEventHandler, OrderEvent,
    };
    pub use crate::numeric::{Cash, Price, Quantity};
    pub use crate::service::{Exchange, Notification, SubscriptionFilter};
}
