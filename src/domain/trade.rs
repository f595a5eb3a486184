// ============================================================================
// Trade Domain Model
// ============================================================================

use crate::numeric::{notional, Cash, NumericResult, Price, Quantity};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{AccountId, OrderId, Symbol};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A settled match between one buy order and one sell order
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Trade {
    /// Unique trade identifier
    pub id: Uuid,

    /// Traded instrument
    pub symbol: Symbol,

    pub buy_order_id: OrderId,
    pub sell_order_id: OrderId,

    pub buyer: AccountId,
    pub seller: AccountId,

    /// Execution price
    pub price: Price,

    /// Executed quantity
    pub quantity: Quantity,

    /// Trade timestamp
    pub timestamp: DateTime<Utc>,
}

impl Trade {
    pub fn new(
        symbol: Symbol,
        buy_order_id: OrderId,
        sell_order_id: OrderId,
        buyer: AccountId,
        seller: AccountId,
        price: Price,
        quantity: Quantity,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            symbol,
            buy_order_id,
            sell_order_id,
            buyer,
            seller,
            price,
            quantity,
            timestamp: Utc::now(),
        }
    }

    /// Cash that moved from buyer to seller (price * quantity)
    pub fn notional_value(&self) -> NumericResult<Cash> {
        notional(self.price, self.quantity)
    }

    pub fn involves(&self, order_id: OrderId) -> bool {
        self.buy_order_id == order_id || self.sell_order_id == order_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn test_trade_creation() {
        let buy = OrderId::new();
        let trade = Trade::new(
            Symbol::from("AAPL"),
            buy,
            OrderId::new(),
            AccountId::new(),
            AccountId::new(),
            Decimal::from(100),
            10,
        );

        assert_eq!(trade.symbol.as_str(), "AAPL");
        assert_eq!(trade.notional_value().unwrap(), Decimal::from(1000));
        assert!(trade.involves(buy));
        assert!(!trade.involves(OrderId::new()));
    }

    #[test]
    fn test_notional_value_with_fractional() {
        let trade = Trade::new(
            Symbol::from("AAPL"),
            OrderId::new(),
            OrderId::new(),
            AccountId::new(),
            AccountId::new(),
            Decimal::new(1005, 1), // 100.5
            2,
        );

        assert_eq!(trade.notional_value().unwrap(), Decimal::from(201));
    }
}
