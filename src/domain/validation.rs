use chrono::{DateTime, Datelike, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

/// Timestamps must keep a four-digit year to round-trip through RFC 3339.
pub const TIMESTAMP_MIN_YEAR: i32 = 1;
pub const TIMESTAMP_MAX_YEAR: i32 = 9999;

/// A field value that cannot be stored as given.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid transaction type '{0}': expected INCOME or EXPENSE")]
    InvalidTransactionType(String),

    #[error("Invalid amount format: '{0}'")]
    InvalidAmount(String),

    #[error("Amount {0} has more than 2 decimal places")]
    AmountScale(Decimal),

    #[error("Amount {0} has more than 12 digits")]
    AmountPrecision(Decimal),

    #[error("Invalid date '{0}': use YYYY-MM-DD or RFC 3339")]
    InvalidTimestamp(String),

    #[error("occurred_at {0} is outside years 0001-9999")]
    TimestampOutOfRange(DateTime<Utc>),

    #[error("{field} must be at most {max} characters (got {len})")]
    TooLong {
        field: &'static str,
        max: usize,
        len: usize,
    },
}

/// Check a string field against a character limit.
pub fn check_length(field: &'static str, value: &str, max: usize) -> Result<(), ValidationError> {
    let len = value.chars().count();
    if len > max {
        return Err(ValidationError::TooLong { field, max, len });
    }
    Ok(())
}

/// Same as [`check_length`] for optional fields; `None` always passes.
pub fn check_optional_length(
    field: &'static str,
    value: Option<&str>,
    max: usize,
) -> Result<(), ValidationError> {
    match value {
        Some(value) => check_length(field, value, max),
        None => Ok(()),
    }
}

/// Reject timestamps whose year cannot be written with four digits.
pub fn check_timestamp(timestamp: DateTime<Utc>) -> Result<(), ValidationError> {
    if !(TIMESTAMP_MIN_YEAR..=TIMESTAMP_MAX_YEAR).contains(&timestamp.year()) {
        return Err(ValidationError::TimestampOutOfRange(timestamp));
    }
    Ok(())
}
