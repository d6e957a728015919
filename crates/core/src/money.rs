//! Money helpers.
//!
//! Amounts are exact decimals. Every derived value goes through checked
//! arithmetic so values outside the decimal range surface as a validation
//! error instead of a panic.

use rust_decimal::Decimal;

use crate::error::{DomainError, DomainResult};

/// Currency used when a caller leaves it empty.
pub const DEFAULT_CURRENCY: &str = "USD";

/// Message carried by the validation error for unrepresentable amounts.
pub const AMOUNT_OUT_OF_RANGE: &str = "amount out of range";

fn out_of_range() -> DomainError {
    DomainError::validation(AMOUNT_OUT_OF_RANGE)
}

/// `a × b`, or a validation error when the product does not fit.
pub fn checked_product(a: Decimal, b: Decimal) -> DomainResult<Decimal> {
    a.checked_mul(b).ok_or_else(out_of_range)
}

/// Sums `values`, failing on the first overflow.
pub fn checked_sum<I>(values: I) -> DomainResult<Decimal>
where
    I: IntoIterator<Item = Decimal>,
{
    values
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, value| acc.checked_add(value))
        .ok_or_else(out_of_range)
}

/// `amount × rate / 100`, unrounded.
pub fn percent_of(amount: Decimal, rate: Decimal) -> DomainResult<Decimal> {
    checked_product(amount, rate)?
        .checked_div(Decimal::ONE_HUNDRED)
        .ok_or_else(out_of_range)
}

pub fn currency_or_default(currency: &str) -> String {
    let trimmed = currency.trim();
    if trimmed.is_empty() {
        DEFAULT_CURRENCY.to_string()
    } else {
        trimmed.to_string()
    }
}
