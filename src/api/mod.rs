// api/mod.rs - Request and response bodies
//
// Everything on the wire is camelCase.

pub mod auth;
pub mod categories;
pub mod expenses;
pub mod incomes;
pub mod openapi;
pub mod users;

use rust_decimal::Decimal;
use validator::ValidationError;

/// Largest amount accepted for a single record
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(1_215_752_191, 23, 0, false, 2);

pub(crate) fn positive_amount(amount: &Decimal) -> Result<(), ValidationError> {
    if amount.is_sign_negative() || amount.is_zero() {
        return Err(ValidationError::new("positive"));
    }
    if *amount > MAX_AMOUNT {
        return Err(ValidationError::new("too_large"));
    }
    if amount.normalize().scale() > 2 {
        return Err(ValidationError::new("scale"));
    }
    Ok(())
}

pub(crate) fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn amounts_must_be_positive_with_cents_precision() {
        assert!(positive_amount(&Decimal::from_str("12.50").unwrap()).is_ok());
        assert!(positive_amount(&Decimal::from_str("12.500").unwrap()).is_ok());
        assert!(positive_amount(&Decimal::ZERO).is_err());
        assert!(positive_amount(&Decimal::from_str("-1").unwrap()).is_err());
        assert!(positive_amount(&Decimal::from_str("0.001").unwrap()).is_err());
        assert!(positive_amount(&Decimal::from_str("1000000000").unwrap()).is_err());
    }

    #[test]
    fn max_amount_value() {
        assert_eq!(MAX_AMOUNT, Decimal::from_str("999999999.99").unwrap());
    }
}
