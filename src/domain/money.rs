use std::str::FromStr;

use rust_decimal::Decimal;

use super::ValidationError;

/// Amounts are persisted as integer cents so that SQL aggregation stays exact.
/// 50.00 is stored as 5000.
pub type Cents = i64;

/// Number of decimal places every amount carries.
pub const AMOUNT_SCALE: u32 = 2;

/// Maximum number of digits (integer + fractional) an amount may have.
pub const AMOUNT_MAX_DIGITS: u32 = 12;

/// Smallest absolute value that no longer fits in `AMOUNT_MAX_DIGITS` digits
/// at `AMOUNT_SCALE`: 10^10.
const AMOUNT_LIMIT: i64 = 10_000_000_000;

/// Convert an amount to cents, rejecting values that do not fit the
/// 12-digit, scale-2 format. Trailing zeros are ignored, so "1.230" is accepted.
pub fn amount_to_cents(amount: Decimal) -> Result<Cents, ValidationError> {
    let normalized = amount.normalize();
    if normalized.scale() > AMOUNT_SCALE {
        return Err(ValidationError::AmountScale(amount));
    }
    if normalized.abs() >= Decimal::from(AMOUNT_LIMIT) {
        return Err(ValidationError::AmountPrecision(amount));
    }

    let mut scaled = normalized;
    scaled.rescale(AMOUNT_SCALE);
    Cents::try_from(scaled.mantissa()).map_err(|_| ValidationError::AmountPrecision(amount))
}

/// Convert cents back into a scale-2 amount. 7000 -> 70.00
pub fn cents_to_amount(cents: Cents) -> Decimal {
    Decimal::new(cents, AMOUNT_SCALE)
}

/// Validate an amount and return it with exactly two decimal places.
pub fn normalize_amount(amount: Decimal) -> Result<Decimal, ValidationError> {
    amount_to_cents(amount).map(cents_to_amount)
}

/// Parse a decimal string into a validated amount.
/// Example: "50" -> 50.00, "12.5" -> 12.50
pub fn parse_amount(input: &str) -> Result<Decimal, ValidationError> {
    let input = input.trim();
    let amount = Decimal::from_str(input)
        .map_err(|_| ValidationError::InvalidAmount(input.to_string()))?;
    normalize_amount(amount)
}

/// Format an amount with two decimal places.
pub fn format_amount(amount: Decimal) -> String {
    format!("{:.2}", amount)
}
