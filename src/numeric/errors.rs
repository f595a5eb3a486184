// ============================================================================
// Numeric Errors
// Error types for ledger and notional arithmetic
// ============================================================================

use thiserror::Error;

/// Errors that can occur during money/quantity arithmetic.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NumericError {
    /// Result exceeded the representable range
    #[error("arithmetic overflow: result exceeded maximum value")]
    Overflow,
    /// Result would drop below zero where only non-negative values are allowed
    #[error("arithmetic underflow: result below zero")]
    Underflow,
    /// Quantity does not fit the signed range used for decimal conversion
    #[error("quantity out of range for decimal conversion")]
    QuantityOutOfRange,
}

/// Result type alias for numeric operations
pub type NumericResult<T> = Result<T, NumericError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            NumericError::Overflow.to_string(),
            "arithmetic overflow: result exceeded maximum value"
        );
        assert_eq!(
            NumericError::Underflow.to_string(),
            "arithmetic underflow: result below zero"
        );
    }

    #[test]
    fn test_error_equality() {
        assert_eq!(NumericError::Overflow, NumericError::Overflow);
        assert_ne!(NumericError::Overflow, NumericError::Underflow);
    }
}
