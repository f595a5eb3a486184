// ============================================================================
// Event Handler Interface
// Defines the contract for handling order, trade and price events
// ============================================================================

use crate::domain::{AccountId, OrderId, OrderKind, OrderStatus, Side, Symbol, Trade};
use crate::numeric::{Price, Quantity};
use chrono::{DateTime, Utc};
use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Events emitted by the matching engine
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum OrderEvent {
    /// Order accepted into the book
    OrderAccepted {
        order_id: OrderId,
        account_id: AccountId,
        symbol: Symbol,
        side: Side,
        kind: OrderKind,
        quantity: Quantity,
        sequence: u64,
        timestamp: DateTime<Utc>,
    },

    /// Order refused at submission; it never entered the book
    OrderRejected {
        order_id: OrderId,
        reason: String,
        timestamp: DateTime<Utc>,
    },

    /// Two orders matched and settled
    OrderMatched {
        trade: Trade,
        timestamp: DateTime<Utc>,
    },

    /// Order moved to a new lifecycle status
    OrderStatusChanged {
        order_id: OrderId,
        account_id: AccountId,
        symbol: Symbol,
        status: OrderStatus,
        remaining_quantity: Quantity,
        timestamp: DateTime<Utc>,
    },

    /// Reference price moved after a trade
    PriceChanged {
        symbol: Symbol,
        previous_price: Price,
        price: Price,
        timestamp: DateTime<Utc>,
    },

    /// A match was found but the ledgers could not cover it
    SettlementFailed {
        buy_order_id: OrderId,
        sell_order_id: OrderId,
        reason: String,
        timestamp: DateTime<Utc>,
    },
}

impl OrderEvent {
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            OrderEvent::OrderAccepted { timestamp, .. }
            | OrderEvent::OrderRejected { timestamp, .. }
            | OrderEvent::OrderMatched { timestamp, .. }
            | OrderEvent::OrderStatusChanged { timestamp, .. }
            | OrderEvent::PriceChanged { timestamp, .. }
            | OrderEvent::SettlementFailed { timestamp, .. } => *timestamp,
        }
    }
}

/// Event handler trait for processing matching engine events.
///
/// Handlers run while the instrument's book lock is held, so they must not
/// block: hand events off (channel, buffer) rather than doing I/O inline.
pub trait EventHandler: Send + Sync {
    /// Handle an order event
    fn on_event(&self, event: OrderEvent);

    /// Batch event handler (optional optimization)
    fn on_events(&self, events: Vec<OrderEvent>) {
        for event in events {
            self.on_event(event);
        }
    }
}

/// No-op event handler for testing
pub struct NoOpEventHandler;

impl EventHandler for NoOpEventHandler {
    fn on_event(&self, _event: OrderEvent) {}
}

/// Logging event handler
pub struct LoggingEventHandler;

impl EventHandler for LoggingEventHandler {
    fn on_event(&self, event: OrderEvent) {
        match &event {
            OrderEvent::SettlementFailed {
                buy_order_id,
                sell_order_id,
                reason,
                ..
            } => tracing::warn!(%buy_order_id, %sell_order_id, %reason, "settlement failed"),
            _ => tracing::debug!("Matching engine event: {:?}", event),
        }
    }
}

/// Forwards every event to each inner handler in order
#[derive(Clone, Default)]
pub struct FanOutEventHandler {
    handlers: Vec<Arc<dyn EventHandler>>,
}

impl FanOutEventHandler {
    pub fn new(handlers: Vec<Arc<dyn EventHandler>>) -> Self {
        Self { handlers }
    }

    pub fn push(&mut self, handler: Arc<dyn EventHandler>) {
        self.handlers.push(handler);
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl EventHandler for FanOutEventHandler {
    fn on_event(&self, event: OrderEvent) {
        if let Some((last, rest)) = self.handlers.split_last() {
            for handler in rest {
                handler.on_event(event.clone());
            }
            last.on_event(event);
        }
    }
}
