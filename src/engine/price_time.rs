// ============================================================================
// Price/Time Priority Matching Algorithm (FIFO)
// Best price first, earliest arrival first within a price
// ============================================================================

use crate::domain::execution_policy::{can_fill_at, EffectivePrice};
use crate::domain::{Order, OrderBook, OrderBookSide, OrderKind, Side, TradePricing};
use crate::interfaces::{MatchProposal, MatchingAlgorithm};
use crate::numeric::{midpoint, Price};
use std::cmp::Ordering;
use std::sync::Arc;

/// Price/Time Priority (FIFO) matching algorithm
///
/// The best bid is matched against the best ask. Market orders rank ahead of
/// every limit order on their side; ties go to the order that reached the
/// book first.
///
/// # Example
/// ```text
/// Bids:  55 x 10 (Order A, seq=1)
///        52 x 10 (Order B, seq=2)
///
/// Incoming: Sell 20 @ 50
/// Result: 10 with A @ 55, then 10 with B @ 52
/// ```
pub struct PriceTimePriority {
    pricing: TradePricing,
}

impl PriceTimePriority {
    pub fn new(pricing: TradePricing) -> Self {
        Self { pricing }
    }

    pub fn pricing(&self) -> TradePricing {
        self.pricing
    }

    /// Price for a crossing pair.
    ///
    /// - both market: the reference price
    /// - market vs limit: the reference price when the limit order accepts
    ///   it, otherwise the limit order's own price
    /// - both limit: the resting order's limit, or the midpoint
    pub fn trade_price(&self, buy: &Order, sell: &Order, reference_price: Price) -> Price {
        match (buy.kind, sell.kind) {
            (OrderKind::Market, OrderKind::Market) => reference_price,
            (OrderKind::Market, OrderKind::Limit { limit_price }) => {
                if can_fill_at(Side::Sell, &sell.kind, reference_price) {
                    reference_price
                } else {
                    limit_price
                }
            },
            (OrderKind::Limit { limit_price }, OrderKind::Market) => {
                if can_fill_at(Side::Buy, &buy.kind, reference_price) {
                    reference_price
                } else {
                    limit_price
                }
            },
            (OrderKind::Limit { limit_price: bid }, OrderKind::Limit { limit_price: ask }) => {
                match self.pricing {
                    TradePricing::RestingOrder => {
                        if buy.has_time_priority_over(sell) {
                            bid
                        } else {
                            ask
                        }
                    },
                    TradePricing::Midpoint => midpoint(bid, ask),
                }
            },
        }
    }
}

/// No limit level on `book_side` outranks `order`
fn ranks_first(book_side: &OrderBookSide, order: &Order) -> bool {
    book_side.best_price().map_or(true, |best| {
        EffectivePrice::of(&order.kind).rank(&EffectivePrice::Limit(best), book_side.side)
            != Ordering::Less
    })
}

impl Default for PriceTimePriority {
    fn default() -> Self {
        Self::new(TradePricing::default())
    }
}

impl MatchingAlgorithm for PriceTimePriority {
    fn next_match(&self, book: &OrderBook, reference_price: Price) -> Option<MatchProposal> {
        let buy = book.best_buy()?;
        let sell = book.best_sell()?;
        debug_assert!(
            ranks_first(book.side(Side::Buy), buy) && ranks_first(book.side(Side::Sell), sell),
            "best order outranked on its own side"
        );

        // Best prices do not cross, so no other pair can either
        if !self.prices_cross(buy, sell) {
            return None;
        }

        let price = self.trade_price(buy, sell, reference_price);
        debug_assert!(
            can_fill_at(Side::Buy, &buy.kind, price) && can_fill_at(Side::Sell, &sell.kind, price),
            "trade price {price} violates a limit"
        );

        let quantity = buy
            .get_remaining_quantity()
            .min(sell.get_remaining_quantity());
        debug_assert!(quantity > 0, "resting order with nothing left");

        Some(MatchProposal {
            buy: Arc::clone(buy),
            sell: Arc::clone(sell),
            quantity,
            price,
        })
    }

    fn name(&self) -> &str {
        match self.pricing {
            TradePricing::RestingOrder => "PriceTime",
            TradePricing::Midpoint => "PriceTime-Midpoint",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AccountId, Symbol};
    use crate::numeric::Quantity;
    use rust_decimal::Decimal;

    fn add(book: &mut OrderBook, order: Order) -> Arc<Order> {
        let order = Arc::new(order);
        // Sequence follows arrival, as the engine does it
        order.set_sequence_number(book.len() as u64 + 1);
        book.add_order(Arc::clone(&order));
        order
    }

    fn limit(side: Side, price: i64, quantity: Quantity) -> Order {
        Order::limit(
            AccountId::new(),
            Symbol::from("AAPL"),
            side,
            Decimal::from(price),
            quantity,
        )
    }

    fn market(side: Side, quantity: Quantity) -> Order {
        Order::market(AccountId::new(), Symbol::from("AAPL"), side, quantity)
    }

    #[test]
    fn test_price_time_fifo_order() {
        let algo = PriceTimePriority::default();
        let mut book = OrderBook::new(Symbol::from("AAPL"));

        // Two buys at the same price, different arrival
        let first = add(&mut book, limit(Side::Buy, 100, 1));
        let _second = add(&mut book, limit(Side::Buy, 100, 1));
        let sell = add(&mut book, limit(Side::Sell, 100, 1));

        let proposal = algo.next_match(&book, Decimal::from(90)).unwrap();
        assert_eq!(proposal.buy.id, first.id);
        assert_eq!(proposal.sell.id, sell.id);
        assert_eq!(proposal.quantity, 1);
    }

    #[test]
    fn test_no_match_when_prices_do_not_cross() {
        let algo = PriceTimePriority::default();
        let mut book = OrderBook::new(Symbol::from("AAPL"));
        add(&mut book, limit(Side::Buy, 99, 5));
        add(&mut book, limit(Side::Sell, 100, 5));

        assert!(algo.next_match(&book, Decimal::from(100)).is_none());
    }

    #[test]
    fn test_no_match_with_one_empty_side() {
        let algo = PriceTimePriority::default();
        let mut book = OrderBook::new(Symbol::from("AAPL"));
        add(&mut book, market(Side::Buy, 5));

        assert!(algo.next_match(&book, Decimal::from(100)).is_none());
    }

    #[test]
    fn test_resting_order_sets_price() {
        let algo = PriceTimePriority::default();

        // Resting buy at 55, incoming sell at 50 -> 55
        let mut book = OrderBook::new(Symbol::from("AAPL"));
        add(&mut book, limit(Side::Buy, 55, 10));
        add(&mut book, limit(Side::Sell, 50, 20));
        let proposal = algo.next_match(&book, Decimal::from(1)).unwrap();
        assert_eq!(proposal.price, Decimal::from(55));
        assert_eq!(proposal.quantity, 10);

        // Resting sell at 50, incoming buy at 55 -> 50
        let mut book = OrderBook::new(Symbol::from("AAPL"));
        add(&mut book, limit(Side::Sell, 50, 10));
        add(&mut book, limit(Side::Buy, 55, 10));
        let proposal = algo.next_match(&book, Decimal::from(1)).unwrap();
        assert_eq!(proposal.price, Decimal::from(50));
    }

    #[test]
    fn test_midpoint_pricing() {
        let algo = PriceTimePriority::new(TradePricing::Midpoint);
        let mut book = OrderBook::new(Symbol::from("AAPL"));
        add(&mut book, limit(Side::Buy, 55, 10));
        add(&mut book, limit(Side::Sell, 50, 10));

        let proposal = algo.next_match(&book, Decimal::from(1)).unwrap();
        assert_eq!(proposal.price, Decimal::new(525, 1));
        assert_eq!(algo.name(), "PriceTime-Midpoint");
    }

    #[test]
    fn test_market_orders_use_reference_price() {
        let algo = PriceTimePriority::default();
        let mut book = OrderBook::new(Symbol::from("AAPL"));
        add(&mut book, market(Side::Buy, 3));
        add(&mut book, market(Side::Sell, 5));

        let proposal = algo.next_match(&book, Decimal::from(77)).unwrap();
        assert_eq!(proposal.price, Decimal::from(77));
        assert_eq!(proposal.quantity, 3);
    }

    #[test]
    fn test_market_buy_respects_sell_limit() {
        let algo = PriceTimePriority::default();
        let mut book = OrderBook::new(Symbol::from("AAPL"));
        add(&mut book, limit(Side::Sell, 105, 5));
        add(&mut book, market(Side::Buy, 5));

        // Reference 100 is below the seller's limit, so the seller's price wins
        let proposal = algo.next_match(&book, Decimal::from(100)).unwrap();
        assert_eq!(proposal.price, Decimal::from(105));

        // Reference 110 satisfies the seller
        let proposal = algo.next_match(&book, Decimal::from(110)).unwrap();
        assert_eq!(proposal.price, Decimal::from(110));
    }

    #[test]
    fn test_market_sell_respects_buy_limit() {
        let algo = PriceTimePriority::default();
        let mut book = OrderBook::new(Symbol::from("AAPL"));
        add(&mut book, limit(Side::Buy, 95, 5));
        add(&mut book, market(Side::Sell, 5));

        // Reference 100 is above the buyer's limit, so the buyer's price wins
        let proposal = algo.next_match(&book, Decimal::from(100)).unwrap();
        assert_eq!(proposal.price, Decimal::from(95));

        // Reference 90 satisfies the buyer
        let proposal = algo.next_match(&book, Decimal::from(90)).unwrap();
        assert_eq!(proposal.price, Decimal::from(90));
    }

    #[test]
    fn test_midpoint_near_decimal_max_stays_within_limits() {
        let algo = PriceTimePriority::new(TradePricing::Midpoint);
        let mut book = OrderBook::new(Symbol::from("AAPL"));
        let ask = Decimal::MAX / Decimal::TWO;
        let aapl = || Symbol::from("AAPL");
        add(&mut book, Order::limit(AccountId::new(), aapl(), Side::Sell, ask, 1));
        add(&mut book, Order::limit(AccountId::new(), aapl(), Side::Buy, Decimal::MAX, 1));

        let proposal = algo.next_match(&book, Decimal::from(100)).unwrap();
        assert!(proposal.price >= ask && proposal.price <= Decimal::MAX);
    }

    #[test]
    fn test_market_order_outranks_better_limit() {
        let algo = PriceTimePriority::default();
        let mut book = OrderBook::new(Symbol::from("AAPL"));
        add(&mut book, limit(Side::Buy, 1_000, 1));
        let market_buy = add(&mut book, market(Side::Buy, 1));
        add(&mut book, limit(Side::Sell, 10, 1));

        let proposal = algo.next_match(&book, Decimal::from(10)).unwrap();
        assert_eq!(proposal.buy.id, market_buy.id);
    }
}
