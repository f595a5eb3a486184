// ============================================================================
// Instrument Domain Model
// ============================================================================

use crate::numeric::Price;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::borrow::Borrow;
use std::fmt;
use uuid::Uuid;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

// ============================================================================
// Value Objects
// ============================================================================

/// Ticker symbol, unique per listed instrument (e.g. "AAPL")
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Symbol(String);

impl Symbol {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self(symbol.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for Symbol {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Symbol {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Symbol {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for Symbol {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct InstrumentId(Uuid);

impl InstrumentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for InstrumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for InstrumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Instrument Entity
// ============================================================================

/// A listed stock with its last-traded reference price.
///
/// The price is only written by trade settlement, which runs under the
/// instrument's book lock; readers see every completed update immediately.
#[derive(Debug)]
pub struct Instrument {
    id: InstrumentId,
    symbol: Symbol,
    price: RwLock<Price>,
    listed_at: DateTime<Utc>,
}

impl Instrument {
    pub fn new(symbol: Symbol, initial_price: Price) -> Self {
        Self {
            id: InstrumentId::new(),
            symbol,
            price: RwLock::new(initial_price),
            listed_at: Utc::now(),
        }
    }

    pub fn id(&self) -> InstrumentId {
        self.id
    }

    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    pub fn listed_at(&self) -> DateTime<Utc> {
        self.listed_at
    }

    /// Current reference price
    pub fn price(&self) -> Price {
        *self.price.read()
    }

    /// Record a trade price. Returns the previous price if it changed.
    pub(crate) fn update_price(&self, price: Price) -> Option<Price> {
        let mut current = self.price.write();
        if *current == price {
            return None;
        }
        let previous = *current;
        *current = price;
        Some(previous)
    }
}
