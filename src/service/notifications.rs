// ============================================================================
// Notification Hub
// Fans order-status and price events out to bounded per-subscriber channels
// ============================================================================

use crate::domain::{AccountId, OrderId, OrderStatus, Symbol};
use crate::interfaces::{EventHandler, OrderEvent};
use crate::numeric::{Price, Quantity};
use crossbeam::channel::{bounded, Receiver, Sender, TrySendError};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Message delivered to subscribers
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Notification {
    OrderStatus {
        order_id: OrderId,
        account_id: AccountId,
        symbol: Symbol,
        status: OrderStatus,
        remaining_quantity: Quantity,
    },
    Price {
        symbol: Symbol,
        previous_price: Price,
        price: Price,
    },
}

impl Notification {
    /// Translate an engine event; events with no subscriber-facing meaning
    /// map to `None`.
    pub fn from_event(event: &OrderEvent) -> Option<Self> {
        match event {
            OrderEvent::OrderStatusChanged {
                order_id,
                account_id,
                symbol,
                status,
                remaining_quantity,
                ..
            } => Some(Notification::OrderStatus {
                order_id: *order_id,
                account_id: *account_id,
                symbol: symbol.clone(),
                status: *status,
                remaining_quantity: *remaining_quantity,
            }),
            OrderEvent::PriceChanged {
                symbol,
                previous_price,
                price,
                ..
            } => Some(Notification::Price {
                symbol: symbol.clone(),
                previous_price: *previous_price,
                price: *price,
            }),
            _ => None,
        }
    }
}

/// Which notifications a subscriber receives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionFilter {
    /// Status changes of orders owned by one account
    Account(AccountId),
    /// Price changes of one instrument
    Prices(Symbol),
    /// Everything
    All,
}

impl SubscriptionFilter {
    pub fn matches(&self, notification: &Notification) -> bool {
        match (self, notification) {
            (SubscriptionFilter::All, _) => true,
            (SubscriptionFilter::Account(id), Notification::OrderStatus { account_id, .. }) => {
                id == account_id
            },
            (SubscriptionFilter::Prices(watched), Notification::Price { symbol, .. }) => {
                watched == symbol
            },
            _ => false,
        }
    }
}

struct Subscriber {
    id: u64,
    filter: SubscriptionFilter,
    sender: Sender<Notification>,
}

/// Best-effort notification fan-out.
///
/// Delivery never blocks: a full queue drops the message (counted in
/// [`NotificationHub::dropped`]) and a subscriber whose receiver is gone is
/// pruned on the next publish.
pub struct NotificationHub {
    capacity: usize,
    subscribers: RwLock<Vec<Subscriber>>,
    next_id: AtomicU64,
    dropped: AtomicU64,
}

impl NotificationHub {
    pub fn new(capacity: usize) -> Self {
        debug_assert!(capacity > 0);
        Self {
            capacity,
            subscribers: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        }
    }

    /// Register a subscriber and hand back its receiving end
    pub fn subscribe(&self, filter: SubscriptionFilter) -> Receiver<Notification> {
        let (sender, receiver) = bounded(self.capacity);
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(subscriber = id, ?filter, "subscriber registered");
        self.subscribers.write().push(Subscriber { id, filter, sender });
        receiver
    }

    /// Deliver to every matching subscriber without blocking
    pub fn publish(&self, notification: &Notification) {
        let mut disconnected = Vec::new();
        {
            let subscribers = self.subscribers.read();
            for subscriber in subscribers
                .iter()
                .filter(|subscriber| subscriber.filter.matches(notification))
            {
                match subscriber.sender.try_send(notification.clone()) {
                    Ok(()) => {},
                    Err(TrySendError::Full(_)) => {
                        self.dropped.fetch_add(1, Ordering::Relaxed);
                    },
                    Err(TrySendError::Disconnected(_)) => disconnected.push(subscriber.id),
                }
            }
        }

        if !disconnected.is_empty() {
            tracing::debug!(count = disconnected.len(), "pruning disconnected subscribers");
            self.subscribers
                .write()
                .retain(|subscriber| !disconnected.contains(&subscriber.id));
        }
    }

    /// Messages lost to full queues since creation
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl EventHandler for NotificationHub {
    fn on_event(&self, event: OrderEvent) {
        if let Some(notification) = Notification::from_event(&event) {
            self.publish(&notification);
        }
    }
}
