// ============================================================================
// Matching Algorithm Interface
// Defines the contract for pluggable matching algorithms
// ============================================================================

use crate::domain::execution_policy;
use crate::domain::{Order, OrderBook};
use crate::numeric::{Price, Quantity};
use std::sync::Arc;

/// A buy/sell pair the algorithm wants to trade, not yet settled
#[derive(Debug, Clone)]
pub struct MatchProposal {
    pub buy: Arc<Order>,
    pub sell: Arc<Order>,
    pub quantity: Quantity,
    pub price: Price,
}

/// Strategy pattern interface for matching algorithms
pub trait MatchingAlgorithm: Send + Sync {
    /// Pick the next pair to trade from `book`, or `None` once nothing in the
    /// book can cross.
    ///
    /// # Arguments
    /// * `book` - The instrument's order book
    /// * `reference_price` - Last traded price, used to price market orders
    fn next_match(&self, book: &OrderBook, reference_price: Price) -> Option<MatchProposal>;

    /// Get the algorithm name for logging/metrics
    fn name(&self) -> &str;

    /// Optional: Check if two orders can cross
    /// Default implementation defers to the execution policy
    fn prices_cross(&self, buy: &Order, sell: &Order) -> bool {
        execution_policy::prices_cross(&buy.kind, &sell.kind)
    }
}
