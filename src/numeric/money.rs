// ============================================================================
// Money and Quantity
// Decimal cash/price values and whole-unit share quantities
// ============================================================================

use super::errors::{NumericError, NumericResult};
use rust_decimal::Decimal;

/// Price per share. Always positive for listed instruments and limit orders.
pub type Price = Decimal;

/// Cash amount held in an account ledger. Never negative.
pub type Cash = Decimal;

/// Share count. Trades are whole units only.
pub type Quantity = u64;

/// Convert a share count into a decimal so it can be multiplied with a price.
#[inline]
pub fn quantity_to_decimal(quantity: Quantity) -> NumericResult<Decimal> {
    i64::try_from(quantity)
        .map(Decimal::from)
        .map_err(|_| NumericError::QuantityOutOfRange)
}

/// Notional value of `quantity` shares at `price` (price * quantity).
///
/// # Errors
/// Returns `Overflow` if the product does not fit in a `Decimal`.
#[inline]
pub fn notional(price: Price, quantity: Quantity) -> NumericResult<Cash> {
    price
        .checked_mul(quantity_to_decimal(quantity)?)
        .ok_or(NumericError::Overflow)
}

/// Subtract `amount` from `balance`, failing instead of going negative.
#[inline]
pub fn checked_debit(balance: Cash, amount: Cash) -> NumericResult<Cash> {
    let remaining = balance.checked_sub(amount).ok_or(NumericError::Overflow)?;
    if remaining < Decimal::ZERO {
        return Err(NumericError::Underflow);
    }
    Ok(remaining)
}

/// Add `amount` to `balance`.
#[inline]
pub fn checked_credit(balance: Cash, amount: Cash) -> NumericResult<Cash> {
    balance.checked_add(amount).ok_or(NumericError::Overflow)
}

/// Midpoint of two prices, computed as `lo + (hi - lo) / 2`.
///
/// Never overflows for positive prices and always lies within `[lo, hi]`.
#[inline]
pub fn midpoint(a: Price, b: Price) -> Price {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    hi.checked_sub(lo)
        .and_then(|spread| spread.checked_div(Decimal::TWO))
        .and_then(|half| lo.checked_add(half))
        .unwrap_or(lo)
}

/// Returns true if `price` is an integral multiple of `tick`.
#[inline]
pub fn is_on_tick(price: Price, tick: Price) -> bool {
    if tick <= Decimal::ZERO {
        return true;
    }
    (price % tick).is_zero()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notional() {
        let price = Decimal::new(1005, 1); // 100.5
        assert_eq!(notional(price, 2).unwrap(), Decimal::from(201));
        assert_eq!(notional(price, 0).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_notional_overflow() {
        let result = notional(Decimal::MAX, 2);
        assert_eq!(result, Err(NumericError::Overflow));
    }

    #[test]
    fn test_quantity_out_of_range() {
        assert_eq!(
            quantity_to_decimal(u64::MAX),
            Err(NumericError::QuantityOutOfRange)
        );
    }

    #[test]
    fn test_checked_debit() {
        let balance = Decimal::from(1000);
        assert_eq!(
            checked_debit(balance, Decimal::from(1000)).unwrap(),
            Decimal::ZERO
        );
        assert_eq!(
            checked_debit(balance, Decimal::from(1001)),
            Err(NumericError::Underflow)
        );
    }

    #[test]
    fn test_midpoint() {
        assert_eq!(
            midpoint(Decimal::from(55), Decimal::from(50)),
            Decimal::new(525, 1)
        );
        assert_eq!(midpoint(Decimal::from(7), Decimal::from(7)), Decimal::from(7));
    }

    #[test]
    fn test_midpoint_near_decimal_max() {
        let half = Decimal::MAX / Decimal::TWO;
        let mid = midpoint(half, Decimal::MAX);
        assert!(mid >= half && mid <= Decimal::MAX);

        let mid = midpoint(Decimal::MAX, Decimal::ONE);
        assert!(mid > Decimal::ONE && mid < Decimal::MAX);
    }

    #[test]
    fn test_tick_size() {
        let tick = Decimal::new(1, 2); // 0.01
        assert!(is_on_tick(Decimal::new(10025, 2), tick));
        assert!(!is_on_tick(Decimal::new(100255, 3), tick));
        assert!(is_on_tick(Decimal::new(100255, 3), Decimal::ZERO));
    }
}
