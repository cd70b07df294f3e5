//! Bounds shared by every stored quantity and price.
//!
//! Both backends keep quantities and prices at four decimal places with at
//! most fourteen integer digits, so values outside that range are refused up
//! front instead of being rounded or overflowing.

use rust_decimal::Decimal;
use thiserror::Error;

/// Decimal places kept for quantities and prices.
pub const AMOUNT_SCALE: u32 = 4;

/// Exclusive bound on the magnitude of a quantity or price.
const AMOUNT_LIMIT: i64 = 100_000_000_000_000;

/// Why a decimal cannot be stored as a quantity or price.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountError {
    #[error("{0} has more than 4 decimal places")]
    Scale(Decimal),

    #[error("{0} is out of range")]
    Range(Decimal),
}

/// Checks that a value fits the stored precision without rounding.
pub fn check_amount(value: Decimal) -> Result<(), AmountError> {
    if value.normalize().scale() > AMOUNT_SCALE {
        return Err(AmountError::Scale(value));
    }
    if value.abs() >= Decimal::from(AMOUNT_LIMIT) {
        return Err(AmountError::Range(value));
    }
    Ok(())
}
