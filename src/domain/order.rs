// ============================================================================
// Order Domain Model
// ============================================================================

use crate::domain::{AccountId, Symbol};
use crate::errors::ValidationError;
use crate::numeric::{Price, Quantity};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use state::{OrderStatus, OrderStatusTransition};

// ============================================================================
// Value Objects
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct OrderId(Uuid);

impl OrderId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for OrderId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn opposite(self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

/// Order type as requested by a client, before the limit price is attached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum OrderType {
    Market,
    Limit,
}

/// Validated order kind carrying its price constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum OrderKind {
    /// Fills at whatever price the book offers
    Market,
    /// Fills only at `limit_price` or better
    Limit { limit_price: Price },
}

impl OrderKind {
    /// Build a kind from a client request, enforcing that a limit price is
    /// present and positive exactly when the order is a limit order.
    pub fn from_request(
        order_type: OrderType,
        limit_price: Option<Price>,
    ) -> Result<Self, ValidationError> {
        match (order_type, limit_price) {
            (OrderType::Market, None) => Ok(OrderKind::Market),
            (OrderType::Market, Some(_)) => Err(ValidationError::UnexpectedLimitPrice),
            (OrderType::Limit, None) => Err(ValidationError::MissingLimitPrice),
            (OrderType::Limit, Some(price)) if price <= Decimal::ZERO => {
                Err(ValidationError::NonPositiveLimitPrice(price))
            },
            (OrderType::Limit, Some(price)) => Ok(OrderKind::Limit { limit_price: price }),
        }
    }

    pub fn limit_price(&self) -> Option<Price> {
        match self {
            OrderKind::Market => None,
            OrderKind::Limit { limit_price } => Some(*limit_price),
        }
    }

    pub fn order_type(&self) -> OrderType {
        match self {
            OrderKind::Market => OrderType::Market,
            OrderKind::Limit { .. } => OrderType::Limit,
        }
    }
}

// ============================================================================
// Order State Machine
// ============================================================================

pub mod state {
    #[cfg(feature = "serde")]
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    #[repr(u8)]
    #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
    pub enum OrderStatus {
        Open = 0,
        PartiallyFilled = 1,
        Filled = 2,
        Cancelled = 3,
    }

    impl OrderStatus {
        pub fn from_u8(val: u8) -> Self {
            match val {
                0 => OrderStatus::Open,
                1 => OrderStatus::PartiallyFilled,
                2 => OrderStatus::Filled,
                _ => OrderStatus::Cancelled,
            }
        }

        pub fn is_terminal(&self) -> bool {
            matches!(self, OrderStatus::Filled | OrderStatus::Cancelled)
        }

        pub fn can_be_cancelled(&self) -> bool {
            !self.is_terminal()
        }
    }

    /// Valid state transitions for the order state machine
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum OrderStatusTransition {
        PartialFill,
        Fill,
        Cancel,
    }

    impl OrderStatus {
        /// Terminal states accept no transition at all.
        pub fn transition(
            &self,
            transition: OrderStatusTransition,
        ) -> Result<OrderStatus, OrderStatus> {
            match (self, transition) {
                (OrderStatus::Open | OrderStatus::PartiallyFilled, OrderStatusTransition::PartialFill) => {
                    Ok(OrderStatus::PartiallyFilled)
                },
                (OrderStatus::Open | OrderStatus::PartiallyFilled, OrderStatusTransition::Fill) => {
                    Ok(OrderStatus::Filled)
                },
                (OrderStatus::Open | OrderStatus::PartiallyFilled, OrderStatusTransition::Cancel) => {
                    Ok(OrderStatus::Cancelled)
                },
                (terminal, _) => Err(*terminal),
            }
        }
    }
}

// ============================================================================
// Packed progress word
// ============================================================================
//
// Status and remaining quantity share one AtomicU64 so a reader can never see
// a FILLED order with shares left, or an OPEN order with none.
//
//   bits 56..64  status (OrderStatus as u8)
//   bits  0..56  remaining quantity

const STATUS_SHIFT: u32 = 56;
const REMAINING_MASK: u64 = (1 << STATUS_SHIFT) - 1;

/// Largest quantity a single order may carry
pub const MAX_ORDER_QUANTITY: Quantity = REMAINING_MASK;

#[inline]
fn pack(status: OrderStatus, remaining: Quantity) -> u64 {
    ((status as u64) << STATUS_SHIFT) | (remaining & REMAINING_MASK)
}

#[inline]
fn unpack(word: u64) -> (OrderStatus, Quantity) {
    (
        OrderStatus::from_u8((word >> STATUS_SHIFT) as u8),
        word & REMAINING_MASK,
    )
}

/// Status and remaining quantity read together
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct OrderStatusReport {
    pub order_id: OrderId,
    pub status: OrderStatus,
    pub remaining_quantity: Quantity,
    pub filled_quantity: Quantity,
}

// ============================================================================
// Order Entity
// ============================================================================

/// An order: immutable intent plus lock-free readable progress.
///
/// Progress is only written while the owning instrument's book lock is held;
/// the atomics exist so status queries never need that lock.
#[derive(Debug)]
pub struct Order {
    pub id: OrderId,
    pub account_id: AccountId,
    pub symbol: Symbol,
    pub side: Side,
    pub kind: OrderKind,
    pub quantity: Quantity,
    pub timestamp: DateTime<Utc>,

    progress: AtomicU64,
    sequence_number: AtomicU64,
}

impl Order {
    pub fn new(
        account_id: AccountId,
        symbol: Symbol,
        side: Side,
        kind: OrderKind,
        quantity: Quantity,
    ) -> Self {
        debug_assert!(quantity > 0 && quantity <= MAX_ORDER_QUANTITY);
        Self {
            id: OrderId::new(),
            account_id,
            symbol,
            side,
            kind,
            quantity,
            timestamp: Utc::now(),
            progress: AtomicU64::new(pack(OrderStatus::Open, quantity)),
            sequence_number: AtomicU64::new(0),
        }
    }

    pub fn limit(
        account_id: AccountId,
        symbol: Symbol,
        side: Side,
        limit_price: Price,
        quantity: Quantity,
    ) -> Self {
        Self::new(
            account_id,
            symbol,
            side,
            OrderKind::Limit { limit_price },
            quantity,
        )
    }

    pub fn market(account_id: AccountId, symbol: Symbol, side: Side, quantity: Quantity) -> Self {
        Self::new(account_id, symbol, side, OrderKind::Market, quantity)
    }

    // ========================================================================
    // Atomic Getters
    // ========================================================================

    pub fn get_status(&self) -> OrderStatus {
        unpack(self.progress.load(Ordering::Acquire)).0
    }

    pub fn get_remaining_quantity(&self) -> Quantity {
        unpack(self.progress.load(Ordering::Acquire)).1
    }

    pub fn get_filled_quantity(&self) -> Quantity {
        self.quantity - self.get_remaining_quantity()
    }

    pub fn get_sequence_number(&self) -> u64 {
        self.sequence_number.load(Ordering::Acquire)
    }

    pub fn status_report(&self) -> OrderStatusReport {
        let (status, remaining) = unpack(self.progress.load(Ordering::Acquire));
        OrderStatusReport {
            order_id: self.id,
            status,
            remaining_quantity: remaining,
            filled_quantity: self.quantity - remaining,
        }
    }

    // ========================================================================
    // Atomic Operations
    // ========================================================================

    /// Atomically fill `quantity` units.
    ///
    /// Returns the new status, or `None` if the order is terminal or has fewer
    /// than `quantity` units left (nothing is changed in that case).
    pub fn try_fill(&self, quantity: Quantity) -> Option<OrderStatus> {
        if quantity == 0 {
            return None;
        }

        loop {
            let current = self.progress.load(Ordering::Acquire);
            let (status, remaining) = unpack(current);

            if remaining < quantity {
                return None;
            }

            let new_remaining = remaining - quantity;
            let transition = if new_remaining == 0 {
                OrderStatusTransition::Fill
            } else {
                OrderStatusTransition::PartialFill
            };
            let new_status = status.transition(transition).ok()?;

            if self
                .progress
                .compare_exchange(
                    current,
                    pack(new_status, new_remaining),
                    Ordering::AcqRel,
                    Ordering::Acquire,
                )
                .is_ok()
            {
                return Some(new_status);
            }
            // CAS failed, retry
        }
    }

    /// Atomically cancel this order.
    ///
    /// Returns `Err(status)` with the terminal status if it was already
    /// filled or cancelled. Remaining quantity is left as-is for history.
    pub fn try_cancel(&self) -> Result<(), OrderStatus> {
        loop {
            let current = self.progress.load(Ordering::Acquire);
            let (status, remaining) = unpack(current);
            let cancelled = status.transition(OrderStatusTransition::Cancel)?;

            if self
                .progress
                .compare_exchange(
                    current,
                    pack(cancelled, remaining),
                    Ordering::AcqRel,
                    Ordering::Acquire,
                )
                .is_ok()
            {
                return Ok(());
            }
        }
    }

    /// Set the sequence number (called by matching engine)
    pub(crate) fn set_sequence_number(&self, seq: u64) {
        self.sequence_number.store(seq, Ordering::Release);
    }

    // ========================================================================
    // Helper Methods
    // ========================================================================

    pub fn is_market_order(&self) -> bool {
        matches!(self.kind, OrderKind::Market)
    }

    pub fn is_limit_order(&self) -> bool {
        matches!(self.kind, OrderKind::Limit { .. })
    }

    pub fn limit_price(&self) -> Option<Price> {
        self.kind.limit_price()
    }

    /// True if this order reached the book before `other`.
    ///
    /// Sequence numbers are assigned under the book lock, so they give a
    /// strict arrival order even when wall-clock timestamps collide.
    pub fn has_time_priority_over(&self, other: &Order) -> bool {
        self.get_sequence_number() < other.get_sequence_number()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limit_buy(quantity: Quantity) -> Order {
        Order::limit(
            AccountId::new(),
            Symbol::from("AAPL"),
            Side::Buy,
            Decimal::from(100),
            quantity,
        )
    }

    #[test]
    fn test_order_creation() {
        let order = limit_buy(1);

        assert_eq!(order.get_remaining_quantity(), 1);
        assert_eq!(order.get_filled_quantity(), 0);
        assert_eq!(order.get_status(), OrderStatus::Open);
        assert_eq!(order.limit_price(), Some(Decimal::from(100)));
    }

    #[test]
    fn test_atomic_fill() {
        let order = limit_buy(10);

        assert_eq!(order.try_fill(3), Some(OrderStatus::PartiallyFilled));
        assert_eq!(order.get_filled_quantity(), 3);
        assert_eq!(order.get_remaining_quantity(), 7);

        assert_eq!(order.try_fill(7), Some(OrderStatus::Filled));
        assert_eq!(order.get_remaining_quantity(), 0);
        assert_eq!(order.get_status(), OrderStatus::Filled);
    }

    #[test]
    fn test_overfill_protection() {
        let order = limit_buy(5);

        assert_eq!(order.try_fill(10), None);
        assert_eq!(order.get_filled_quantity(), 0);
        assert_eq!(order.get_status(), OrderStatus::Open);
    }

    #[test]
    fn test_cancel() {
        let order = limit_buy(4);
        order.try_fill(1);

        assert_eq!(order.try_cancel(), Ok(()));
        assert_eq!(order.get_status(), OrderStatus::Cancelled);
        assert_eq!(order.get_remaining_quantity(), 3);

        // Terminal orders reject both cancel and fill
        assert_eq!(order.try_cancel(), Err(OrderStatus::Cancelled));
        assert_eq!(order.try_fill(1), None);
    }

    #[test]
    fn test_filled_order_cannot_be_cancelled() {
        let order = limit_buy(2);
        order.try_fill(2);
        assert_eq!(order.try_cancel(), Err(OrderStatus::Filled));
    }

    #[test]
    fn test_state_machine_transitions() {
        use OrderStatusTransition::*;

        assert_eq!(OrderStatus::Open.transition(PartialFill), Ok(OrderStatus::PartiallyFilled));
        assert_eq!(
            OrderStatus::PartiallyFilled.transition(PartialFill),
            Ok(OrderStatus::PartiallyFilled)
        );
        assert_eq!(OrderStatus::PartiallyFilled.transition(Fill), Ok(OrderStatus::Filled));
        assert_eq!(OrderStatus::Open.transition(Cancel), Ok(OrderStatus::Cancelled));
        assert_eq!(OrderStatus::Filled.transition(Cancel), Err(OrderStatus::Filled));
        assert_eq!(OrderStatus::Cancelled.transition(Fill), Err(OrderStatus::Cancelled));
    }

    #[test]
    fn test_kind_from_request() {
        assert_eq!(
            OrderKind::from_request(OrderType::Market, None),
            Ok(OrderKind::Market)
        );
        assert_eq!(
            OrderKind::from_request(OrderType::Limit, None),
            Err(ValidationError::MissingLimitPrice)
        );
        assert_eq!(
            OrderKind::from_request(OrderType::Limit, Some(Decimal::ZERO)),
            Err(ValidationError::NonPositiveLimitPrice(Decimal::ZERO))
        );
        assert_eq!(
            OrderKind::from_request(OrderType::Market, Some(Decimal::ONE)),
            Err(ValidationError::UnexpectedLimitPrice)
        );
        assert_eq!(
            OrderKind::from_request(OrderType::Limit, Some(Decimal::from(5)))
                .map(|kind| kind.order_type()),
            Ok(OrderType::Limit)
        );
    }

    #[test]
    fn test_packing_round_trip_at_max_quantity() {
        let order = limit_buy(MAX_ORDER_QUANTITY);
        assert_eq!(order.get_remaining_quantity(), MAX_ORDER_QUANTITY);
        assert_eq!(order.get_status(), OrderStatus::Open);
    }
}
