// ============================================================================
// Account Domain Model
// Cash balance and share positions of one market participant
// ============================================================================

use crate::domain::{OrderId, Symbol};
use crate::errors::{ExchangeError, ExchangeResult};
use crate::numeric::{checked_credit, checked_debit, Cash, NumericError, Quantity};
use chrono::{DateTime, Utc};
use crossbeam_skiplist::SkipMap;
use parking_lot::{Mutex, MutexGuard};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

// ============================================================================
// Value Objects
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AccountId(Uuid);

impl AccountId {
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

impl Default for AccountId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Point-in-time copy of an account's balances
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AccountSnapshot {
    pub account_id: AccountId,
    pub cash_balance: Cash,
    /// Held quantity per symbol; symbols with zero holdings are omitted
    pub positions: BTreeMap<Symbol, Quantity>,
}

impl AccountSnapshot {
    pub fn position(&self, symbol: &str) -> Quantity {
        self.positions.get(symbol).copied().unwrap_or(0)
    }
}

// ============================================================================
// Ledger
// ============================================================================

/// Cash and positions. Every mutation is checked and leaves the ledger
/// untouched when it fails, so balances never go negative.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ledger {
    cash: Cash,
    positions: HashMap<Symbol, Quantity>,
}

impl Ledger {
    pub fn new(cash: Cash) -> Self {
        Self {
            cash,
            positions: HashMap::new(),
        }
    }

    pub fn cash(&self) -> Cash {
        self.cash
    }

    pub fn position(&self, symbol: &str) -> Quantity {
        self.positions.get(symbol).copied().unwrap_or(0)
    }

    pub fn ensure_funds(&self, required: Cash) -> ExchangeResult<()> {
        if self.cash < required {
            return Err(ExchangeError::InsufficientFunds {
                required,
                available: self.cash,
            });
        }
        Ok(())
    }

    pub fn ensure_position(&self, symbol: &Symbol, required: Quantity) -> ExchangeResult<()> {
        let available = self.position(symbol.as_str());
        if available < required {
            return Err(ExchangeError::InsufficientPosition {
                symbol: symbol.clone(),
                required,
                available,
            });
        }
        Ok(())
    }

    pub fn debit(&mut self, amount: Cash) -> ExchangeResult<()> {
        debug_assert!(!amount.is_sign_negative(), "debit amount must be non-negative");
        let available = self.cash;
        self.cash = checked_debit(available, amount).map_err(|err| match err {
            NumericError::Underflow => ExchangeError::InsufficientFunds {
                required: amount,
                available,
            },
            other => other.into(),
        })?;
        Ok(())
    }

    pub fn credit(&mut self, amount: Cash) -> ExchangeResult<()> {
        debug_assert!(!amount.is_sign_negative(), "credit amount must be non-negative");
        self.cash = checked_credit(self.cash, amount)?;
        Ok(())
    }

    pub fn add_position(&mut self, symbol: &Symbol, quantity: Quantity) -> ExchangeResult<()> {
        let updated = self
            .position(symbol.as_str())
            .checked_add(quantity)
            .ok_or(NumericError::Overflow)?;
        self.set_position(symbol, updated);
        Ok(())
    }

    pub fn remove_position(&mut self, symbol: &Symbol, quantity: Quantity) -> ExchangeResult<()> {
        self.ensure_position(symbol, quantity)?;
        let updated = self.position(symbol.as_str()) - quantity;
        self.set_position(symbol, updated);
        Ok(())
    }

    fn set_position(&mut self, symbol: &Symbol, quantity: Quantity) {
        if quantity == 0 {
            self.positions.remove(symbol.as_str());
        } else {
            self.positions.insert(symbol.clone(), quantity);
        }
    }

    fn positions(&self) -> BTreeMap<Symbol, Quantity> {
        self.positions
            .iter()
            .map(|(symbol, qty)| (symbol.clone(), *qty))
            .collect()
    }
}

// ============================================================================
// Account Entity
// ============================================================================

/// A market participant. The ledger sits behind its own lock so settlement
/// can hold exactly the two accounts a trade touches.
#[derive(Debug)]
pub struct Account {
    id: AccountId,
    ledger: Mutex<Ledger>,
    orders: Mutex<Vec<OrderId>>,
    opened_at: DateTime<Utc>,
}

impl Account {
    pub fn new(initial_cash: Cash) -> Self {
        Self {
            id: AccountId::new(),
            ledger: Mutex::new(Ledger::new(initial_cash)),
            orders: Mutex::new(Vec::new()),
            opened_at: Utc::now(),
        }
    }

    pub fn id(&self) -> AccountId {
        self.id
    }

    pub fn opened_at(&self) -> DateTime<Utc> {
        self.opened_at
    }

    /// Lock the ledger. Never hold this while acquiring a book lock.
    pub fn ledger(&self) -> MutexGuard<'_, Ledger> {
        self.ledger.lock()
    }

    pub fn snapshot(&self) -> AccountSnapshot {
        let ledger = self.ledger.lock();
        AccountSnapshot {
            account_id: self.id,
            cash_balance: ledger.cash(),
            positions: ledger.positions(),
        }
    }

    pub(crate) fn record_order(&self, order_id: OrderId) {
        self.orders.lock().push(order_id);
    }

    /// Ids of every order this account has placed, oldest first
    pub fn order_ids(&self) -> Vec<OrderId> {
        self.orders.lock().clone()
    }
}

// ============================================================================
// Account Registry
// ============================================================================

/// Lock-free directory of open accounts, shared by the facade and every book
pub struct AccountRegistry {
    accounts: SkipMap<AccountId, Arc<Account>>,
}

impl AccountRegistry {
    pub fn new() -> Self {
        Self {
            accounts: SkipMap::new(),
        }
    }

    pub fn open(&self, initial_cash: Cash) -> Arc<Account> {
        let account = Arc::new(Account::new(initial_cash));
        self.accounts.insert(account.id(), Arc::clone(&account));
        account
    }

    pub fn get(&self, id: AccountId) -> Option<Arc<Account>> {
        self.accounts.get(&id).map(|entry| Arc::clone(entry.value()))
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

impl Default for AccountRegistry {
    fn default() -> Self {
        Self::new()
    }
}
