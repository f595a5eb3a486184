// ============================================================================
// Execution Policy
// Pure rules deciding whether an order may trade at a given price
// ============================================================================

use crate::domain::{OrderKind, Side};
use crate::numeric::Price;
use std::cmp::Ordering;

/// Price used to rank an order on its side of the book.
///
/// A market order outranks every limit order on its side: an unbounded bid
/// for a buy, a zero ask for a sell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectivePrice {
    Market,
    Limit(Price),
}

impl EffectivePrice {
    pub fn of(kind: &OrderKind) -> Self {
        match kind {
            OrderKind::Market => EffectivePrice::Market,
            OrderKind::Limit { limit_price } => EffectivePrice::Limit(*limit_price),
        }
    }

    /// Compare aggressiveness on `side`: `Greater` means `self` ranks first.
    pub fn rank(&self, other: &Self, side: Side) -> Ordering {
        match (self, other) {
            (EffectivePrice::Market, EffectivePrice::Market) => Ordering::Equal,
            (EffectivePrice::Market, EffectivePrice::Limit(_)) => Ordering::Greater,
            (EffectivePrice::Limit(_), EffectivePrice::Market) => Ordering::Less,
            (EffectivePrice::Limit(a), EffectivePrice::Limit(b)) => match side {
                Side::Buy => a.cmp(b),
                Side::Sell => b.cmp(a),
            },
        }
    }
}

/// Whether an order of `kind` on `side` may fill at `candidate`.
///
/// Market orders always may; a limit buy only at or below its limit, a limit
/// sell only at or above it.
pub fn can_fill_at(side: Side, kind: &OrderKind, candidate: Price) -> bool {
    match kind {
        OrderKind::Market => true,
        OrderKind::Limit { limit_price } => match side {
            Side::Buy => candidate <= *limit_price,
            Side::Sell => candidate >= *limit_price,
        },
    }
}

/// Whether a buy and a sell can trade with each other at all
/// (`buy.effective_price >= sell.effective_price`).
pub fn prices_cross(buy: &OrderKind, sell: &OrderKind) -> bool {
    match (EffectivePrice::of(buy), EffectivePrice::of(sell)) {
        (EffectivePrice::Market, _) | (_, EffectivePrice::Market) => true,
        (EffectivePrice::Limit(bid), EffectivePrice::Limit(ask)) => bid >= ask,
    }
}
