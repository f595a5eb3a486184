// ============================================================================
// Numeric Module
// Cash, price and quantity types for ledger and matching arithmetic
// ============================================================================
//
// This module provides:
// - Price/Cash: rust_decimal::Decimal aliases (no floating point anywhere)
// - Quantity: whole-unit share counts
// - NumericError: error type for checked arithmetic
//
// All arithmetic that touches a ledger is checked and returns Result.

mod errors;
mod money;

pub use errors::{NumericError, NumericResult};
pub use money::{
    checked_credit, checked_debit, is_on_tick, midpoint, notional, quantity_to_decimal, Cash,
    Price, Quantity,
};
