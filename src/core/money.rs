//! Currency arithmetic shared by every ledger component.
//!
//! All amounts are 2-decimal `Decimal`s and every zero or equality check uses
//! the same absolute tolerance of one cent.

use crate::core::errors::{FieldError, LedgerError};
use rust_decimal::{Decimal, RoundingStrategy};

pub const DECIMAL_PLACES: u32 = 2;

/// One cent.
pub const EPSILON: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

pub const MAX_AMOUNT: Decimal = Decimal::from_parts(1_000_000, 0, 0, false, 0);

#[inline]
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
}

/// True when `value` is within one cent of zero.
#[inline]
pub fn is_zero(value: Decimal) -> bool {
    value.abs() <= EPSILON
}

#[inline]
pub fn approx_eq(a: Decimal, b: Decimal) -> bool {
    is_zero(a - b)
}

/// Boundary check for user supplied amounts.
pub fn validate_amount(field: &str, amount: Decimal) -> Result<(), LedgerError> {
    if amount <= Decimal::ZERO {
        return Err(LedgerError::InvalidInput(
            field.to_string(),
            FieldError::new(field, "Invalid Amount", "Amount must be greater than 0"),
        ));
    }
    if amount > MAX_AMOUNT {
        return Err(LedgerError::InvalidInput(
            field.to_string(),
            FieldError::new(field, "Amount Too Large", "Amount cannot exceed 1,000,000"),
        ));
    }
    if amount.normalize().scale() > DECIMAL_PLACES {
        return Err(LedgerError::InvalidInput(
            field.to_string(),
            FieldError::new(
                field,
                "Invalid Amount",
                "Amount cannot have more than 2 decimal places",
            ),
        ));
    }
    Ok(())
}
