// ============================================================================
// Matching Engine Factory
// Creates matching engines with proper configuration
// ============================================================================

use crate::domain::config::{
    ConfigError, EngineConfig, MarketOrderPolicy, SettlementFailurePolicy, TradePricing,
};
use crate::domain::{AccountRegistry, Instrument};
use crate::engine::{MatchingEngine, PriceTimePriority};
use crate::interfaces::{EventHandler, MatchingAlgorithm, NoOpEventHandler};
use std::sync::Arc;

// ============================================================================
// Factory Functions
// ============================================================================

/// Creates a matching engine for one instrument from configuration
///
/// # Arguments
/// * `config` - Engine configuration, validated first
/// * `instrument` - The listed instrument the book trades
/// * `accounts` - Registry the engine settles against
/// * `event_handler` - Event handler for order and trade events
///
/// # Example
/// ```
/// use exchange_engine::prelude::*;
/// use exchange_engine::engine::factory::create_from_config;
/// use rust_decimal::Decimal;
/// use std::sync::Arc;
///
/// let instrument = Arc::new(Instrument::new(Symbol::from("AAPL"), Decimal::from(100)));
/// let accounts = Arc::new(AccountRegistry::new());
/// let engine = create_from_config(
///     &EngineConfig::default(),
///     instrument,
///     accounts,
///     Arc::new(NoOpEventHandler),
/// )
/// .unwrap();
/// assert_eq!(engine.symbol().as_str(), "AAPL");
/// ```
pub fn create_from_config(
    config: &EngineConfig,
    instrument: Arc<Instrument>,
    accounts: Arc<AccountRegistry>,
    event_handler: Arc<dyn EventHandler>,
) -> Result<MatchingEngine, ConfigError> {
    config.validate()?;

    let algorithm = create_matching_algorithm(config);
    Ok(MatchingEngine::new(
        instrument,
        algorithm,
        accounts,
        event_handler,
        config,
    ))
}

fn create_matching_algorithm(config: &EngineConfig) -> Box<dyn MatchingAlgorithm> {
    Box::new(PriceTimePriority::new(config.trade_pricing))
}

// ============================================================================
// Builder Pattern for Advanced Configuration
// ============================================================================

/// Builder for creating matching engines with fluent API
///
/// # Example
/// ```
/// use exchange_engine::prelude::*;
/// use exchange_engine::engine::factory::MatchingEngineBuilder;
/// use rust_decimal::Decimal;
/// use std::sync::Arc;
///
/// let instrument = Arc::new(Instrument::new(Symbol::from("MSFT"), Decimal::from(300)));
/// let engine = MatchingEngineBuilder::new(instrument, Arc::new(AccountRegistry::new()))
///     .midpoint_pricing()
///     .reject_market_orders_without_liquidity()
///     .build()
///     .unwrap();
/// assert_eq!(engine.algorithm_name(), "PriceTime-Midpoint");
/// ```
pub struct MatchingEngineBuilder {
    config: EngineConfig,
    instrument: Arc<Instrument>,
    accounts: Arc<AccountRegistry>,
    event_handler: Arc<dyn EventHandler>,
}

impl MatchingEngineBuilder {
    /// Create a new builder for the specified instrument
    pub fn new(instrument: Arc<Instrument>, accounts: Arc<AccountRegistry>) -> Self {
        Self {
            config: EngineConfig::default(),
            instrument,
            accounts,
            event_handler: Arc::new(NoOpEventHandler),
        }
    }

    /// Replace the whole configuration
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_event_handler(mut self, event_handler: Arc<dyn EventHandler>) -> Self {
        self.event_handler = event_handler;
        self
    }

    // ========================================================================
    // Policy Configuration
    // ========================================================================

    /// Crossing limit orders trade at the resting order's price (default)
    pub fn resting_order_pricing(mut self) -> Self {
        self.config.trade_pricing = TradePricing::RestingOrder;
        self
    }

    /// Crossing limit orders trade halfway between their limits
    pub fn midpoint_pricing(mut self) -> Self {
        self.config.trade_pricing = TradePricing::Midpoint;
        self
    }

    pub fn reject_market_orders_without_liquidity(mut self) -> Self {
        self.config.market_order_policy = MarketOrderPolicy::RejectWithoutLiquidity;
        self
    }

    pub fn with_settlement_failure_policy(mut self, policy: SettlementFailurePolicy) -> Self {
        self.config.settlement_failure_policy = policy;
        self
    }

    // ========================================================================
    // Build
    // ========================================================================

    /// Build the matching engine
    pub fn build(self) -> Result<MatchingEngine, ConfigError> {
        create_from_config(
            &self.config,
            self.instrument,
            self.accounts,
            self.event_handler,
        )
    }

    /// Get the configuration without building (for inspection)
    pub fn get_config(&self) -> &EngineConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Symbol;
    use rust_decimal::Decimal;

    fn instrument(symbol: &str) -> Arc<Instrument> {
        Arc::new(Instrument::new(Symbol::from(symbol), Decimal::from(100)))
    }

    #[test]
    fn test_create_default_engine() {
        let engine = create_from_config(
            &EngineConfig::default(),
            instrument("AAPL"),
            Arc::new(AccountRegistry::new()),
            Arc::new(NoOpEventHandler),
        )
        .unwrap();
        assert_eq!(engine.symbol().as_str(), "AAPL");
        assert_eq!(engine.algorithm_name(), "PriceTime");
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = EngineConfig::default().with_tick_size(Decimal::ZERO);
        let result = create_from_config(
            &config,
            instrument("AAPL"),
            Arc::new(AccountRegistry::new()),
            Arc::new(NoOpEventHandler),
        );
        assert!(matches!(result, Err(ConfigError::NonPositiveTickSize(_))));
    }

    #[test]
    fn test_builder_pattern() {
        let builder = MatchingEngineBuilder::new(instrument("BTC"), Arc::new(AccountRegistry::new()))
            .midpoint_pricing()
            .reject_market_orders_without_liquidity()
            .with_settlement_failure_policy(SettlementFailurePolicy::CancelBoth);

        assert_eq!(builder.get_config().trade_pricing, TradePricing::Midpoint);
        assert_eq!(
            builder.get_config().market_order_policy,
            MarketOrderPolicy::RejectWithoutLiquidity
        );

        let engine = builder.resting_order_pricing().build().unwrap();
        assert_eq!(engine.symbol().as_str(), "BTC");
        assert_eq!(engine.algorithm_name(), "PriceTime");
    }

    #[test]
    fn test_builder_with_preset() {
        let engine = MatchingEngineBuilder::new(instrument("ETH"), Arc::new(AccountRegistry::new()))
            .with_config(EngineConfig::midpoint())
            .build()
            .unwrap();
        assert_eq!(engine.algorithm_name(), "PriceTime-Midpoint");
    }
}
