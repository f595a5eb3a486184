// ============================================================================
// Trade Executor
// Moves cash and shares between two ledgers as one all-or-nothing step
// ============================================================================

use crate::domain::{Account, AccountId, Instrument, Ledger, Symbol};
use crate::errors::ExchangeError;
use crate::numeric::{notional, Cash, NumericError, Price, Quantity};
use parking_lot::MutexGuard;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SettlementError {
    #[error("buyer {account} cannot pay {required} (available {available})")]
    InsufficientFunds {
        account: AccountId,
        required: Cash,
        available: Cash,
    },

    #[error("seller {account} cannot deliver {required} {symbol} (holds {available})")]
    InsufficientPosition {
        account: AccountId,
        symbol: Symbol,
        required: Quantity,
        available: Quantity,
    },

    #[error("buyer {buyer} cannot pay and seller {seller} cannot deliver")]
    BothSidesShort { buyer: AccountId, seller: AccountId },

    #[error("account {0} is not registered")]
    UnknownAccount(AccountId),

    #[error("numeric error during settlement: {0}")]
    Numeric(#[from] NumericError),

    #[error("ledger rejected settlement: {0}")]
    Ledger(ExchangeError),
}

impl SettlementError {
    /// Whether the buyer's ledger caused the failure
    pub fn buyer_at_fault(&self, buyer: AccountId) -> bool {
        match self {
            SettlementError::InsufficientFunds { .. } | SettlementError::BothSidesShort { .. } => {
                true
            },
            SettlementError::UnknownAccount(account) => *account == buyer,
            SettlementError::InsufficientPosition { .. } => false,
            // Overflow is the buyer's position or the seller's cash; neither
            // side can trade this pair, so blame both.
            SettlementError::Numeric(_) | SettlementError::Ledger(_) => true,
        }
    }

    /// Whether the seller's ledger caused the failure
    pub fn seller_at_fault(&self, seller: AccountId) -> bool {
        match self {
            SettlementError::InsufficientPosition { .. }
            | SettlementError::BothSidesShort { .. } => true,
            SettlementError::UnknownAccount(account) => *account == seller,
            SettlementError::InsufficientFunds { .. } => false,
            SettlementError::Numeric(_) | SettlementError::Ledger(_) => true,
        }
    }

    fn from_ledger(err: ExchangeError, buyer: AccountId, seller: AccountId) -> Self {
        match err {
            ExchangeError::InsufficientFunds {
                required,
                available,
            } => SettlementError::InsufficientFunds {
                account: buyer,
                required,
                available,
            },
            ExchangeError::InsufficientPosition {
                symbol,
                required,
                available,
            } => SettlementError::InsufficientPosition {
                account: seller,
                symbol,
                required,
                available,
            },
            ExchangeError::Numeric(err) => SettlementError::Numeric(err),
            other => SettlementError::Ledger(other),
        }
    }
}

/// Result of a successful settlement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settlement {
    /// Cash moved from buyer to seller
    pub notional: Cash,
    /// Reference price before this trade, if the trade moved it
    pub previous_price: Option<Price>,
}

/// One trade's worth of ledger movements
struct Legs<'a> {
    buyer: AccountId,
    seller: AccountId,
    symbol: &'a Symbol,
    quantity: Quantity,
    cost: Cash,
}

impl Legs<'_> {
    /// Check both sides against the live ledgers so the error names every
    /// party that is short.
    fn check(&self, buyer: &Ledger, seller: &Ledger) -> Result<(), SettlementError> {
        let funds = buyer.ensure_funds(self.cost);
        let shares = seller.ensure_position(self.symbol, self.quantity);
        match (funds, shares) {
            (Ok(()), Ok(())) => Ok(()),
            (Err(_), Err(_)) => Err(SettlementError::BothSidesShort {
                buyer: self.buyer,
                seller: self.seller,
            }),
            (Err(err), Ok(())) | (Ok(()), Err(err)) => Err(self.ledger_error(err)),
        }
    }

    fn pay(&self, buyer: &mut Ledger) -> Result<(), SettlementError> {
        buyer.debit(self.cost).map_err(|err| self.ledger_error(err))
    }

    fn deliver(&self, seller: &mut Ledger) -> Result<(), SettlementError> {
        seller
            .remove_position(self.symbol, self.quantity)
            .map_err(|err| self.ledger_error(err))
    }

    fn receive_cash(&self, seller: &mut Ledger) -> Result<(), SettlementError> {
        seller.credit(self.cost).map_err(|err| self.ledger_error(err))
    }

    fn receive_shares(&self, buyer: &mut Ledger) -> Result<(), SettlementError> {
        buyer
            .add_position(self.symbol, self.quantity)
            .map_err(|err| self.ledger_error(err))
    }

    fn ledger_error(&self, err: ExchangeError) -> SettlementError {
        SettlementError::from_ledger(err, self.buyer, self.seller)
    }
}

/// Performs the economic effect of one match.
///
/// Both ledgers are locked for the whole step, always in `AccountId` order,
/// so concurrent trades touching the same accounts serialize without
/// deadlocking.
#[derive(Debug, Default, Clone, Copy)]
pub struct TradeExecutor;

impl TradeExecutor {
    pub fn new() -> Self {
        Self
    }

    /// Debit buyer cash, credit seller cash, move `quantity` shares from
    /// seller to buyer and set the instrument's price. Either everything
    /// happens or nothing does.
    pub fn settle(
        &self,
        buyer: &Account,
        seller: &Account,
        instrument: &Instrument,
        quantity: Quantity,
        price: Price,
    ) -> Result<Settlement, SettlementError> {
        let cost = notional(price, quantity)?;
        let legs = Legs {
            buyer: buyer.id(),
            seller: seller.id(),
            symbol: instrument.symbol(),
            quantity,
            cost,
        };

        if buyer.id() == seller.id() {
            let mut ledger = buyer.ledger();
            Self::self_trade(&mut ledger, &legs)?;
        } else {
            let (mut buyer_ledger, mut seller_ledger) = Self::lock_pair(buyer, seller);
            Self::transfer(&mut buyer_ledger, &mut seller_ledger, &legs)?;
        }

        let previous_price = instrument.update_price(price);
        Ok(Settlement {
            notional: cost,
            previous_price,
        })
    }

    fn lock_pair<'a>(
        buyer: &'a Account,
        seller: &'a Account,
    ) -> (MutexGuard<'a, Ledger>, MutexGuard<'a, Ledger>) {
        if buyer.id() < seller.id() {
            let buyer_ledger = buyer.ledger();
            let seller_ledger = seller.ledger();
            (buyer_ledger, seller_ledger)
        } else {
            let seller_ledger = seller.ledger();
            let buyer_ledger = buyer.ledger();
            (buyer_ledger, seller_ledger)
        }
    }

    /// Apply every leg to copies and swap them in only once all succeed
    fn transfer(
        buyer: &mut Ledger,
        seller: &mut Ledger,
        legs: &Legs<'_>,
    ) -> Result<(), SettlementError> {
        legs.check(buyer, seller)?;

        let mut staged_buyer = buyer.clone();
        let mut staged_seller = seller.clone();
        legs.pay(&mut staged_buyer)?;
        legs.deliver(&mut staged_seller)?;
        legs.receive_cash(&mut staged_seller)?;
        legs.receive_shares(&mut staged_buyer)?;

        *buyer = staged_buyer;
        *seller = staged_seller;
        Ok(())
    }

    /// Paying yourself for your own shares nets to zero, but the account
    /// must still be able to cover both legs.
    fn self_trade(ledger: &mut Ledger, legs: &Legs<'_>) -> Result<(), SettlementError> {
        legs.check(ledger, ledger)?;

        let mut staged = ledger.clone();
        legs.pay(&mut staged)?;
        legs.deliver(&mut staged)?;
        legs.receive_cash(&mut staged)?;
        legs.receive_shares(&mut staged)?;

        *ledger = staged;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn setup(buyer_cash: i64, seller_shares: Quantity) -> (Account, Account, Instrument) {
        let stock = Instrument::new(Symbol::from("AAPL"), Decimal::from(90));
        let buyer = Account::new(Decimal::from(buyer_cash));
        let seller = Account::new(Decimal::ZERO);
        seller
            .ledger()
            .add_position(stock.symbol(), seller_shares)
            .unwrap();
        (buyer, seller, stock)
    }

    #[test]
    fn test_settlement_moves_cash_and_shares() {
        let (buyer, seller, stock) = setup(1000, 10);

        let settlement = TradeExecutor::new()
            .settle(&buyer, &seller, &stock, 10, Decimal::from(100))
            .unwrap();

        assert_eq!(settlement.notional, Decimal::from(1000));
        assert_eq!(settlement.previous_price, Some(Decimal::from(90)));
        assert_eq!(buyer.snapshot().cash_balance, Decimal::ZERO);
        assert_eq!(buyer.snapshot().position("AAPL"), 10);
        assert_eq!(seller.snapshot().cash_balance, Decimal::from(1000));
        assert_eq!(seller.snapshot().position("AAPL"), 0);
        assert_eq!(stock.price(), Decimal::from(100));
    }

    #[test]
    fn test_insufficient_funds_aborts_everything() {
        let (buyer, seller, stock) = setup(999, 10);

        let err = TradeExecutor::new()
            .settle(&buyer, &seller, &stock, 10, Decimal::from(100))
            .unwrap_err();

        assert!(matches!(err, SettlementError::InsufficientFunds { .. }));
        assert!(err.buyer_at_fault(buyer.id()));
        assert!(!err.seller_at_fault(seller.id()));
        assert_eq!(buyer.snapshot().cash_balance, Decimal::from(999));
        assert_eq!(seller.snapshot().position("AAPL"), 10);
        assert_eq!(stock.price(), Decimal::from(90));
    }

    #[test]
    fn test_insufficient_position_aborts_everything() {
        let (buyer, seller, stock) = setup(1000, 4);

        let err = TradeExecutor::new()
            .settle(&buyer, &seller, &stock, 5, Decimal::from(100))
            .unwrap_err();

        assert!(matches!(
            err,
            SettlementError::InsufficientPosition {
                required: 5,
                available: 4,
                ..
            }
        ));
        assert!(err.seller_at_fault(seller.id()));
        assert!(!err.buyer_at_fault(buyer.id()));
        assert_eq!(buyer.snapshot().cash_balance, Decimal::from(1000));
        assert_eq!(seller.snapshot().cash_balance, Decimal::ZERO);
    }

    #[test]
    fn test_both_sides_short() {
        let (buyer, seller, stock) = setup(1, 1);

        let err = TradeExecutor::new()
            .settle(&buyer, &seller, &stock, 5, Decimal::from(100))
            .unwrap_err();

        assert!(matches!(err, SettlementError::BothSidesShort { .. }));
        assert!(err.buyer_at_fault(buyer.id()));
        assert!(err.seller_at_fault(seller.id()));
    }

    #[test]
    fn test_credit_overflow_leaves_both_ledgers_untouched() {
        let stock = Instrument::new(Symbol::from("AAPL"), Decimal::from(90));
        let buyer = Account::new(Decimal::from(1000));
        let seller = Account::new(Decimal::MAX);
        seller.ledger().add_position(stock.symbol(), 10).unwrap();

        let err = TradeExecutor::new()
            .settle(&buyer, &seller, &stock, 10, Decimal::from(100))
            .unwrap_err();

        assert_eq!(err, SettlementError::Numeric(NumericError::Overflow));
        assert!(err.buyer_at_fault(buyer.id()) && err.seller_at_fault(seller.id()));
        assert_eq!(buyer.snapshot().cash_balance, Decimal::from(1000));
        assert_eq!(buyer.snapshot().position("AAPL"), 0);
        assert_eq!(seller.snapshot().cash_balance, Decimal::MAX);
        assert_eq!(seller.snapshot().position("AAPL"), 10);
        assert_eq!(stock.price(), Decimal::from(90));
    }

    #[test]
    fn test_self_trade_requires_both_legs() {
        let stock = Instrument::new(Symbol::from("AAPL"), Decimal::from(90));
        let account = Account::new(Decimal::from(499));
        account.ledger().add_position(stock.symbol(), 5).unwrap();

        let err = TradeExecutor::new()
            .settle(&account, &account, &stock, 5, Decimal::from(100))
            .unwrap_err();

        assert!(matches!(err, SettlementError::InsufficientFunds { .. }));
        assert_eq!(account.snapshot().cash_balance, Decimal::from(499));
        assert_eq!(account.snapshot().position("AAPL"), 5);
    }

    #[test]
    fn test_self_trade_nets_to_zero() {
        let stock = Instrument::new(Symbol::from("AAPL"), Decimal::from(90));
        let account = Account::new(Decimal::from(500));
        account
            .ledger()
            .add_position(stock.symbol(), 5)
            .unwrap();

        TradeExecutor::new()
            .settle(&account, &account, &stock, 5, Decimal::from(100))
            .unwrap();

        let snapshot = account.snapshot();
        assert_eq!(snapshot.cash_balance, Decimal::from(500));
        assert_eq!(snapshot.position("AAPL"), 5);
        assert_eq!(stock.price(), Decimal::from(100));
    }

    #[test]
    fn test_conservation() {
        let (buyer, seller, stock) = setup(10_000, 50);
        let executor = TradeExecutor::new();

        for (quantity, price) in [(7, 101), (13, 99), (30, 120)] {
            executor
                .settle(&buyer, &seller, &stock, quantity, Decimal::from(price))
                .unwrap();
            let (b, s) = (buyer.snapshot(), seller.snapshot());
            assert_eq!(b.cash_balance + s.cash_balance, Decimal::from(10_000));
            assert_eq!(b.position("AAPL") + s.position("AAPL"), 50);
        }
    }
}
