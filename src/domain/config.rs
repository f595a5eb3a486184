// ============================================================================
// Engine Configuration
// Policy choices and limits applied to every order book of an exchange
// ============================================================================

use crate::numeric::Price;
use rust_decimal::Decimal;
use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Default per-subscriber notification queue size
pub const DEFAULT_NOTIFICATION_CAPACITY: usize = 1024;

/// Default number of price levels in a book snapshot
pub const DEFAULT_SNAPSHOT_DEPTH: usize = 10;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("tick size must be positive, got {0}")]
    NonPositiveTickSize(Price),

    #[error("notification capacity must be positive")]
    ZeroNotificationCapacity,

    #[error("snapshot depth must be positive")]
    ZeroSnapshotDepth,
}

// ============================================================================
// Policies
// ============================================================================

/// What happens to a market order that arrives when the opposite side is empty
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum MarketOrderPolicy {
    /// Accept it and let it rest until liquidity arrives or it is cancelled
    #[default]
    RestInBook,
    /// Refuse it at submission time with `NoLiquidity`
    RejectWithoutLiquidity,
}

/// Price at which two crossing limit orders trade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TradePricing {
    /// The limit of whichever order reached the book first
    #[default]
    RestingOrder,
    /// Halfway between the two limits
    Midpoint,
}

/// Which orders to cancel when settlement of a match fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SettlementFailurePolicy {
    /// Cancel only the order(s) whose ledger could not cover the trade
    #[default]
    CancelOffending,
    /// Cancel both sides of the failed match
    CancelBoth,
}

// ============================================================================
// Complete Engine Configuration
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EngineConfig {
    pub market_order_policy: MarketOrderPolicy,
    pub trade_pricing: TradePricing,
    pub settlement_failure_policy: SettlementFailurePolicy,

    /// Optional: Price tick size (minimum price increment)
    /// None means no tick size enforcement
    pub tick_size: Option<Price>,

    /// Bounded queue size of each notification subscriber
    pub notification_capacity: usize,

    /// Price levels per side in default book snapshots
    pub snapshot_depth: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            market_order_policy: MarketOrderPolicy::default(),
            trade_pricing: TradePricing::default(),
            settlement_failure_policy: SettlementFailurePolicy::default(),
            tick_size: None,
            notification_capacity: DEFAULT_NOTIFICATION_CAPACITY,
            snapshot_depth: DEFAULT_SNAPSHOT_DEPTH,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: Set market order policy
    pub fn with_market_order_policy(mut self, policy: MarketOrderPolicy) -> Self {
        self.market_order_policy = policy;
        self
    }

    /// Builder method: Set limit-vs-limit trade pricing
    pub fn with_trade_pricing(mut self, pricing: TradePricing) -> Self {
        self.trade_pricing = pricing;
        self
    }

    /// Builder method: Set settlement failure policy
    pub fn with_settlement_failure_policy(mut self, policy: SettlementFailurePolicy) -> Self {
        self.settlement_failure_policy = policy;
        self
    }

    /// Builder method: Set price tick size
    pub fn with_tick_size(mut self, tick: Price) -> Self {
        self.tick_size = Some(tick);
        self
    }

    /// Builder method: Set notification queue capacity
    pub fn with_notification_capacity(mut self, capacity: usize) -> Self {
        self.notification_capacity = capacity;
        self
    }

    /// Builder method: Set default snapshot depth
    pub fn with_snapshot_depth(mut self, depth: usize) -> Self {
        self.snapshot_depth = depth;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(tick) = self.tick_size {
            if tick <= Decimal::ZERO {
                return Err(ConfigError::NonPositiveTickSize(tick));
            }
        }

        if self.notification_capacity == 0 {
            return Err(ConfigError::ZeroNotificationCapacity);
        }

        if self.snapshot_depth == 0 {
            return Err(ConfigError::ZeroSnapshotDepth);
        }

        Ok(())
    }
}

// ============================================================================
// Preset Configurations
// ============================================================================

impl EngineConfig {
    /// Strict venue
    /// - Market orders need opposite liquidity on arrival
    /// - Tick size: $0.01
    pub fn strict() -> Self {
        Self::default()
            .with_market_order_policy(MarketOrderPolicy::RejectWithoutLiquidity)
            .with_tick_size(Decimal::new(1, 2))
    }

    /// Crossing limit orders split the price improvement evenly
    pub fn midpoint() -> Self {
        Self::default().with_trade_pricing(TradePricing::Midpoint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();

        assert_eq!(config.market_order_policy, MarketOrderPolicy::RestInBook);
        assert_eq!(config.trade_pricing, TradePricing::RestingOrder);
        assert_eq!(
            config.settlement_failure_policy,
            SettlementFailurePolicy::CancelOffending
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_pattern() {
        let config = EngineConfig::new()
            .with_tick_size(Decimal::new(5, 2))
            .with_notification_capacity(16)
            .with_snapshot_depth(3);

        assert_eq!(config.tick_size, Some(Decimal::new(5, 2)));
        assert_eq!(config.notification_capacity, 16);
        assert_eq!(config.snapshot_depth, 3);
    }

    #[test]
    fn test_validation() {
        let config = EngineConfig::new().with_tick_size(Decimal::ZERO);
        assert_eq!(
            config.validate(),
            Err(ConfigError::NonPositiveTickSize(Decimal::ZERO))
        );

        let config = EngineConfig::new().with_notification_capacity(0);
        assert_eq!(config.validate(), Err(ConfigError::ZeroNotificationCapacity));
    }

    #[test]
    fn test_preset_configs() {
        let strict = EngineConfig::strict();
        assert_eq!(
            strict.market_order_policy,
            MarketOrderPolicy::RejectWithoutLiquidity
        );
        assert!(strict.validate().is_ok());

        let midpoint = EngineConfig::midpoint();
        assert_eq!(midpoint.trade_pricing, TradePricing::Midpoint);
    }
}
