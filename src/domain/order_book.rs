// ============================================================================
// Order Book Domain Model
// ============================================================================

use rust_decimal::Decimal;
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use super::{Order, OrderId, OrderKind, Side, Symbol};
use crate::numeric::{midpoint, Price, Quantity};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

// ============================================================================
// Order Book Level
// ============================================================================

/// FIFO queue of resting limit orders at one price
#[derive(Debug)]
pub struct OrderBookLevel {
    pub price: Price,
    orders: VecDeque<Arc<Order>>,
    total_quantity: Quantity,
}

impl OrderBookLevel {
    pub fn new(price: Price) -> Self {
        Self {
            price,
            orders: VecDeque::new(),
            total_quantity: 0,
        }
    }

    pub fn add_order(&mut self, order: Arc<Order>) {
        self.total_quantity += order.get_remaining_quantity();
        self.orders.push_back(order);
    }

    pub fn front(&self) -> Option<&Arc<Order>> {
        self.orders.front()
    }

    pub fn get_total_quantity(&self) -> Quantity {
        self.total_quantity
    }

    pub fn subtract_quantity(&mut self, quantity: Quantity) {
        debug_assert!(quantity <= self.total_quantity);
        self.total_quantity = self.total_quantity.saturating_sub(quantity);
    }

    /// Remove an order from the level, releasing its remaining quantity
    pub fn remove(&mut self, order_id: OrderId) -> Option<Arc<Order>> {
        let index = self.orders.iter().position(|order| order.id == order_id)?;
        let order = self.orders.remove(index)?;
        self.subtract_quantity(order.get_remaining_quantity());
        Some(order)
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Order>> {
        self.orders.iter()
    }
}

// ============================================================================
// Order Book Side
// ============================================================================

/// One side of a book (bids or asks).
///
/// Market orders rank ahead of every limit order and queue among themselves
/// by arrival; limit orders sit in price levels, best level first.
#[derive(Debug)]
pub struct OrderBookSide {
    pub side: Side,
    market_orders: OrderBookLevel,
    levels: BTreeMap<Price, OrderBookLevel>,
}

impl OrderBookSide {
    pub fn new(side: Side) -> Self {
        Self {
            side,
            market_orders: OrderBookLevel::new(Decimal::ZERO),
            levels: BTreeMap::new(),
        }
    }

    /// Add an order to the back of its queue
    pub fn add_order(&mut self, order: Arc<Order>) {
        debug_assert_eq!(order.side, self.side);
        match order.kind {
            OrderKind::Market => self.market_orders.add_order(order),
            OrderKind::Limit { limit_price } => self
                .levels
                .entry(limit_price)
                .or_insert_with(|| OrderBookLevel::new(limit_price))
                .add_order(order),
        }
    }

    /// Remove an order from wherever it rests
    pub fn remove_order(&mut self, order: &Order) -> Option<Arc<Order>> {
        match order.kind {
            OrderKind::Market => self.market_orders.remove(order.id),
            OrderKind::Limit { limit_price } => {
                let level = self.levels.get_mut(&limit_price)?;
                let removed = level.remove(order.id);
                if level.is_empty() {
                    self.levels.remove(&limit_price);
                }
                removed
            },
        }
    }

    /// Account for `quantity` units of a resting order having traded.
    /// Drops the order from the book once it has nothing left.
    pub fn record_fill(&mut self, order: &Order, quantity: Quantity) {
        match order.kind {
            OrderKind::Market => {
                self.market_orders.subtract_quantity(quantity);
                if order.get_remaining_quantity() == 0 {
                    self.market_orders.remove(order.id);
                }
            },
            OrderKind::Limit { limit_price } => {
                if let Some(level) = self.levels.get_mut(&limit_price) {
                    level.subtract_quantity(quantity);
                    if order.get_remaining_quantity() == 0 {
                        level.remove(order.id);
                    }
                    if level.is_empty() {
                        self.levels.remove(&limit_price);
                    }
                }
            },
        }
    }

    /// Highest-priority order: oldest market order, else the oldest order at
    /// the best limit price.
    pub fn best_order(&self) -> Option<&Arc<Order>> {
        self.market_orders
            .front()
            .or_else(|| self.best_level().and_then(|level| level.front()))
    }

    /// Get the best limit price level
    pub fn best_level(&self) -> Option<&OrderBookLevel> {
        match self.side {
            // Highest bid (last in sorted order)
            Side::Buy => self.levels.values().next_back(),
            // Lowest ask (first in sorted order)
            Side::Sell => self.levels.values().next(),
        }
    }

    /// Get the best (top-of-book) limit price
    pub fn best_price(&self) -> Option<Price> {
        self.best_level().map(|level| level.price)
    }

    /// Get depth at N limit price levels, best first
    pub fn get_depth(&self, num_levels: usize) -> Vec<(Price, Quantity)> {
        let iter: Box<dyn Iterator<Item = &OrderBookLevel> + '_> = match self.side {
            Side::Buy => Box::new(self.levels.values().rev()),
            Side::Sell => Box::new(self.levels.values()),
        };

        iter.take(num_levels)
            .map(|level| (level.price, level.get_total_quantity()))
            .collect()
    }

    pub fn market_quantity(&self) -> Quantity {
        self.market_orders.get_total_quantity()
    }

    /// All resting orders in priority order
    pub fn orders(&self) -> Vec<Arc<Order>> {
        let levels: Box<dyn Iterator<Item = &OrderBookLevel> + '_> = match self.side {
            Side::Buy => Box::new(self.levels.values().rev()),
            Side::Sell => Box::new(self.levels.values()),
        };
        self.market_orders
            .iter()
            .chain(levels.flat_map(|level| level.iter()))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.market_orders.len() + self.levels.values().map(OrderBookLevel::len).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.market_orders.is_empty() && self.levels.is_empty()
    }
}

// ============================================================================
// Order Book
// ============================================================================

/// Open buy and sell orders of one instrument
#[derive(Debug)]
pub struct OrderBook {
    pub symbol: Symbol,
    pub bids: OrderBookSide,
    pub asks: OrderBookSide,
}

impl OrderBook {
    pub fn new(symbol: Symbol) -> Self {
        Self {
            symbol,
            bids: OrderBookSide::new(Side::Buy),
            asks: OrderBookSide::new(Side::Sell),
        }
    }

    pub fn side(&self, side: Side) -> &OrderBookSide {
        match side {
            Side::Buy => &self.bids,
            Side::Sell => &self.asks,
        }
    }

    pub fn side_mut(&mut self, side: Side) -> &mut OrderBookSide {
        match side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        }
    }

    pub fn add_order(&mut self, order: Arc<Order>) {
        self.side_mut(order.side).add_order(order);
    }

    pub fn remove_order(&mut self, order: &Order) -> Option<Arc<Order>> {
        self.side_mut(order.side).remove_order(order)
    }

    pub fn record_fill(&mut self, order: &Order, quantity: Quantity) {
        self.side_mut(order.side).record_fill(order, quantity);
    }

    pub fn best_buy(&self) -> Option<&Arc<Order>> {
        self.bids.best_order()
    }

    pub fn best_sell(&self) -> Option<&Arc<Order>> {
        self.asks.best_order()
    }

    pub fn len(&self) -> usize {
        self.bids.len() + self.asks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }

    pub fn snapshot(&self, depth: usize) -> OrderBookSnapshot {
        let mut snapshot = OrderBookSnapshot::with_depth(
            self.symbol.clone(),
            self.bids.get_depth(depth),
            self.asks.get_depth(depth),
        );
        snapshot.market_bid_quantity = self.bids.market_quantity();
        snapshot.market_ask_quantity = self.asks.market_quantity();
        snapshot
    }
}

// ============================================================================
// Order Book Snapshot
// ============================================================================

/// Immutable snapshot of the order book state
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct OrderBookSnapshot {
    pub symbol: Symbol,
    /// Bid levels (price, quantity), best first
    pub bids: Vec<(Price, Quantity)>,
    /// Ask levels (price, quantity), best first
    pub asks: Vec<(Price, Quantity)>,
    /// Resting market buy quantity
    pub market_bid_quantity: Quantity,
    /// Resting market sell quantity
    pub market_ask_quantity: Quantity,
    /// Current spread (ask - bid)
    pub spread: Option<Price>,
    /// Mid price
    pub mid_price: Option<Price>,
}

impl OrderBookSnapshot {
    pub fn with_depth(
        symbol: Symbol,
        bids: Vec<(Price, Quantity)>,
        asks: Vec<(Price, Quantity)>,
    ) -> Self {
        let spread = match (bids.first(), asks.first()) {
            (Some((bid, _)), Some((ask, _))) => Some(ask - bid),
            _ => None,
        };

        let mid_price = match (bids.first(), asks.first()) {
            (Some((bid, _)), Some((ask, _))) => Some(midpoint(*bid, *ask)),
            _ => None,
        };

        Self {
            symbol,
            bids,
            asks,
            market_bid_quantity: 0,
            market_ask_quantity: 0,
            spread,
            mid_price,
        }
    }

    pub fn best_bid(&self) -> Option<Price> {
        self.bids.first().map(|(price, _)| *price)
    }

    pub fn best_ask(&self) -> Option<Price> {
        self.asks.first().map(|(price, _)| *price)
    }

    pub fn total_bid_quantity(&self) -> Quantity {
        self.market_bid_quantity + self.bids.iter().map(|(_, qty)| qty).sum::<Quantity>()
    }

    pub fn total_ask_quantity(&self) -> Quantity {
        self.market_ask_quantity + self.asks.iter().map(|(_, qty)| qty).sum::<Quantity>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::AccountId;

    fn limit(side: Side, price: i64, quantity: Quantity) -> Arc<Order> {
        Arc::new(Order::limit(
            AccountId::new(),
            Symbol::from("AAPL"),
            side,
            Decimal::from(price),
            quantity,
        ))
    }

    #[test]
    fn test_order_book_level() {
        let mut level = OrderBookLevel::new(Decimal::from(100));
        let order = limit(Side::Buy, 100, 3);

        level.add_order(Arc::clone(&order));
        assert_eq!(level.get_total_quantity(), 3);
        assert!(!level.is_empty());

        assert!(level.remove(order.id).is_some());
        assert_eq!(level.get_total_quantity(), 0);
        assert!(level.is_empty());
    }

    #[test]
    fn test_order_book_side_best_price() {
        let mut side = OrderBookSide::new(Side::Buy);
        side.add_order(limit(Side::Buy, 100, 1));
        side.add_order(limit(Side::Buy, 101, 1));

        // Best bid should be highest price
        assert_eq!(side.best_price(), Some(Decimal::from(101)));

        let mut asks = OrderBookSide::new(Side::Sell);
        asks.add_order(limit(Side::Sell, 105, 1));
        asks.add_order(limit(Side::Sell, 103, 1));
        assert_eq!(asks.best_price(), Some(Decimal::from(103)));
    }

    #[test]
    fn test_market_orders_rank_first() {
        let mut side = OrderBookSide::new(Side::Sell);
        let resting = limit(Side::Sell, 10, 1);
        let market = Arc::new(Order::market(
            AccountId::new(),
            Symbol::from("AAPL"),
            Side::Sell,
            2,
        ));

        side.add_order(Arc::clone(&resting));
        side.add_order(Arc::clone(&market));

        assert_eq!(side.best_order().map(|o| o.id), Some(market.id));
        assert_eq!(side.market_quantity(), 2);
        assert_eq!(side.len(), 2);

        let ids: Vec<_> = side.orders().iter().map(|o| o.id).collect();
        assert_eq!(ids, vec![market.id, resting.id]);
    }

    #[test]
    fn test_fifo_within_level() {
        let mut side = OrderBookSide::new(Side::Buy);
        let first = limit(Side::Buy, 100, 1);
        let second = limit(Side::Buy, 100, 1);
        side.add_order(Arc::clone(&first));
        side.add_order(Arc::clone(&second));

        assert_eq!(side.best_order().map(|o| o.id), Some(first.id));
    }

    #[test]
    fn test_record_fill_removes_filled_orders_and_empty_levels() {
        let mut book = OrderBook::new(Symbol::from("AAPL"));
        let bid = limit(Side::Buy, 100, 5);
        book.add_order(Arc::clone(&bid));

        bid.try_fill(2);
        book.record_fill(&bid, 2);
        assert_eq!(book.bids.get_depth(1), vec![(Decimal::from(100), 3)]);

        bid.try_fill(3);
        book.record_fill(&bid, 3);
        assert!(book.is_empty());
        assert_eq!(book.bids.best_price(), None);
    }

    #[test]
    fn test_remove_order() {
        let mut book = OrderBook::new(Symbol::from("AAPL"));
        let ask = limit(Side::Sell, 100, 5);
        book.add_order(Arc::clone(&ask));

        assert!(book.remove_order(&ask).is_some());
        assert!(book.remove_order(&ask).is_none());
        assert!(book.asks.is_empty());
    }

    #[test]
    fn test_order_book_snapshot() {
        let snapshot = OrderBookSnapshot::with_depth(
            Symbol::from("AAPL"),
            vec![(Decimal::from(100), 1)],
            vec![(Decimal::from(102), 2)],
        );

        assert_eq!(snapshot.best_bid(), Some(Decimal::from(100)));
        assert_eq!(snapshot.best_ask(), Some(Decimal::from(102)));
        assert_eq!(snapshot.spread, Some(Decimal::from(2)));
        assert_eq!(snapshot.mid_price, Some(Decimal::from(101)));
        assert_eq!(snapshot.total_ask_quantity(), 2);
    }

    #[test]
    fn test_snapshot_mid_price_near_decimal_max() {
        let snapshot = OrderBookSnapshot::with_depth(
            Symbol::from("AAPL"),
            vec![(Decimal::ONE, 1)],
            vec![(Decimal::MAX, 1)],
        );

        let mid = snapshot.mid_price.unwrap();
        assert!(mid > Decimal::ONE && mid < Decimal::MAX);
        assert_eq!(snapshot.spread, Some(Decimal::MAX - Decimal::ONE));
    }
}
