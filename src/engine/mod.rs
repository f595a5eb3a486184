// ============================================================================
// Engine Module
// Contains the core matching engine business logic
// ============================================================================

mod matching_engine;
mod price_time;
mod settlement;

pub mod factory;

pub use factory::{create_from_config, MatchingEngineBuilder};
pub use matching_engine::{CancelOutcome, MatchingEngine};
pub use price_time::PriceTimePriority;
pub use settlement::{Settlement, SettlementError, TradeExecutor};
