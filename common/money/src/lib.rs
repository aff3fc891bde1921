use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Integer digits a stored price may carry. Prices live in `NUMERIC(12,2)`.
pub const MAX_PRICE_INTEGER_DIGITS: i64 = 10;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MoneyError {
    #[error("amount must not be negative")]
    Negative,
    #[error("amount must be below 10^{MAX_PRICE_INTEGER_DIGITS}")]
    OutOfRange,
}

/// Normalize a monetary value to 2 decimal places (extra digits are truncated, not rounded).
pub fn normalize_scale(value: &BigDecimal) -> BigDecimal {
    value.with_scale(2)
}

/// Validates a price as non-negative and below the stored ceiling, then normalizes it to cents.
///
/// Range checks read the unscaled digits and exponent only. Rescaling or comparing a value
/// such as `1e999999999` would materialize the full integer first.
pub fn non_negative_price(raw: &BigDecimal) -> Result<NormalizedMoney, MoneyError> {
    let (unscaled, scale) = raw.as_bigint_and_exponent();
    let repr = unscaled.to_string();
    let (negative, digits) = match repr.strip_prefix('-') {
        Some(digits) => (true, digits),
        None => (false, repr.as_str()),
    };
    if digits == "0" {
        return Ok(NormalizedMoney::new(BigDecimal::from(0)));
    }

    let integer_digits = (digits.len() as i64).saturating_sub(scale);
    if integer_digits > MAX_PRICE_INTEGER_DIGITS {
        return Err(MoneyError::OutOfRange);
    }
    if negative {
        return Err(MoneyError::Negative);
    }
    // below one cent: truncates to zero
    if integer_digits < -1 {
        return Ok(NormalizedMoney::new(BigDecimal::from(0)));
    }
    Ok(NormalizedMoney::new(raw.clone()))
}

/// Unit amount multiplied by a quantity, kept at cent scale.
pub fn line_total(unit: &BigDecimal, quantity: i32) -> BigDecimal {
    normalize_scale(&(unit * BigDecimal::from(quantity)))
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NormalizedMoney(BigDecimal);

impl NormalizedMoney {
    pub fn new(raw: BigDecimal) -> Self {
        Self(normalize_scale(&raw))
    }
    pub fn inner(&self) -> &BigDecimal { &self.0 }
    pub fn into_inner(self) -> BigDecimal { self.0 }
}

impl fmt::Display for NormalizedMoney {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_normalize() {
        let v = BigDecimal::parse_bytes(b"12.3456", 10).unwrap();
        assert_eq!(normalize_scale(&v).to_string(), "12.34");
    }

    #[test]
    fn negative_price_rejected() {
        let v = BigDecimal::from_str("-0.01").unwrap();
        assert_eq!(non_negative_price(&v), Err(MoneyError::Negative));
    }

    #[test]
    fn price_at_column_ceiling_rejected() {
        let max = BigDecimal::from_str("9999999999.99").unwrap();
        assert_eq!(non_negative_price(&max).unwrap().to_string(), "9999999999.99");
        for raw in ["10000000000", "1e11", "-1e11"] {
            let v = BigDecimal::from_str(raw).unwrap();
            assert_eq!(non_negative_price(&v), Err(MoneyError::OutOfRange), "{raw}");
        }
    }

    #[test]
    fn extreme_exponents_settle_without_rescaling() {
        let huge = BigDecimal::from_str("1e999999999").unwrap();
        assert_eq!(non_negative_price(&huge), Err(MoneyError::OutOfRange));

        let tiny = BigDecimal::from_str("5e-999999999").unwrap();
        assert_eq!(non_negative_price(&tiny).unwrap().to_string(), "0.00");

        let tiny_negative = BigDecimal::from_str("-5e-999999999").unwrap();
        assert_eq!(non_negative_price(&tiny_negative), Err(MoneyError::Negative));

        let zero = BigDecimal::from_str("0e999999999").unwrap();
        assert_eq!(non_negative_price(&zero).unwrap().to_string(), "0.00");
    }

    #[test]
    fn zero_price_allowed() {
        let v = BigDecimal::from(0);
        assert_eq!(non_negative_price(&v).unwrap().to_string(), "0.00");
    }

    #[test]
    fn line_total_multiplies_unit_amount() {
        let unit = BigDecimal::from_str("19.99").unwrap();
        assert_eq!(line_total(&unit, 3).to_string(), "59.97");
    }
}
