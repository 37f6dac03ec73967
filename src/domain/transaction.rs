use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{
    AccountId, ValidationError, check_optional_length, check_timestamp, normalize_amount,
};

pub type TransactionId = i64;

pub const TRANSACTION_DESCRIPTION_MAX_LEN: usize = 255;
pub const TRANSACTION_CATEGORY_MAX_LEN: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionType {
    /// Money coming into the account
    Income,
    /// Money leaving the account
    Expense,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Income => "INCOME",
            TransactionType::Expense => "EXPENSE",
        }
    }
}

impl FromStr for TransactionType {
    type Err = ValidationError;

    /// Only the exact upper-case spellings are accepted.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "INCOME" => Ok(TransactionType::Income),
            "EXPENSE" => Ok(TransactionType::Expense),
            other => Err(ValidationError::InvalidTransactionType(other.to_string())),
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single dated income or expense record attached to one account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub account_id: AccountId,
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    /// Always carries two decimal places
    pub amount: Decimal,
    pub description: Option<String>,
    /// When the transaction happened; defaults to the time it was recorded
    pub occurred_at: DateTime<Utc>,
    pub category: Option<String>,
}

impl Transaction {
    /// Replace every mutable field with the values in `fields`.
    /// A missing `occurred_at` keeps the stored timestamp.
    pub fn apply(&mut self, fields: &TransactionFields) {
        self.account_id = fields.account_id;
        self.transaction_type = fields.transaction_type;
        self.amount = fields.amount;
        self.description = fields.description.clone();
        if let Some(occurred_at) = fields.occurred_at {
            self.occurred_at = occurred_at;
        }
        self.category = fields.category.clone();
    }
}

/// The full set of caller-supplied transaction fields, used both to create a
/// transaction and to replace one on update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionFields {
    pub account_id: AccountId,
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    pub amount: Decimal,
    pub description: Option<String>,
    pub occurred_at: Option<DateTime<Utc>>,
    pub category: Option<String>,
}

impl TransactionFields {
    pub fn new(account_id: AccountId, transaction_type: TransactionType, amount: Decimal) -> Self {
        Self {
            account_id,
            transaction_type,
            amount,
            description: None,
            occurred_at: None,
            category: None,
        }
    }

    pub fn income(account_id: AccountId, amount: Decimal) -> Self {
        Self::new(account_id, TransactionType::Income, amount)
    }

    pub fn expense(account_id: AccountId, amount: Decimal) -> Self {
        Self::new(account_id, TransactionType::Expense, amount)
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_occurred_at(mut self, occurred_at: DateTime<Utc>) -> Self {
        self.occurred_at = Some(occurred_at);
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Check string limits, the amount format and the `occurred_at` year,
    /// returning the fields with the amount rescaled to two decimal places.
    pub fn validated(mut self) -> Result<Self, ValidationError> {
        self.amount = normalize_amount(self.amount)?;
        if let Some(occurred_at) = self.occurred_at {
            check_timestamp(occurred_at)?;
        }
        check_optional_length(
            "description",
            self.description.as_deref(),
            TRANSACTION_DESCRIPTION_MAX_LEN,
        )?;
        check_optional_length(
            "category",
            self.category.as_deref(),
            TRANSACTION_CATEGORY_MAX_LEN,
        )?;
        Ok(self)
    }
}

/// Equality filters for listing transactions. Unset filters match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionFilter {
    pub account_id: Option<AccountId>,
    pub category: Option<String>,
}

impl TransactionFilter {
    /// Build a filter from optional query values. An empty category means
    /// "no category filter", not "category equals the empty string".
    pub fn new(account_id: Option<AccountId>, category: Option<String>) -> Self {
        Self {
            account_id,
            category: category.filter(|c| !c.is_empty()),
        }
    }

    pub fn for_account(account_id: AccountId) -> Self {
        Self {
            account_id: Some(account_id),
            category: None,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn matches(&self, transaction: &Transaction) -> bool {
        if let Some(account_id) = self.account_id {
            if transaction.account_id != account_id {
                return false;
            }
        }
        if let Some(category) = &self.category {
            if transaction.category.as_ref() != Some(category) {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn sample_transaction() -> Transaction {
        Transaction {
            id: 1,
            account_id: 1,
            transaction_type: TransactionType::Income,
            amount: dec!(100.00),
            description: Some("Salary".into()),
            occurred_at: Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap(),
            category: Some("work".into()),
        }
    }

    #[test]
    fn test_transaction_type_is_case_sensitive() {
        assert_eq!("INCOME".parse::<TransactionType>(), Ok(TransactionType::Income));
        assert_eq!("EXPENSE".parse::<TransactionType>(), Ok(TransactionType::Expense));
        assert_eq!(
            "income".parse::<TransactionType>(),
            Err(ValidationError::InvalidTransactionType("income".into()))
        );
        assert!("TRANSFER".parse::<TransactionType>().is_err());
    }

    #[test]
    fn test_transaction_type_serializes_upper_case() {
        let json = serde_json::to_string(&TransactionType::Expense).unwrap();
        assert_eq!(json, "\"EXPENSE\"");
    }

    #[test]
    fn test_validated_rescales_amount() {
        let fields = TransactionFields::income(1, dec!(100)).validated().unwrap();
        assert_eq!(fields.amount.to_string(), "100.00");
    }

    #[test]
    fn test_validated_rejects_long_category() {
        let fields = TransactionFields::expense(1, dec!(5)).with_category("c".repeat(51));
        assert!(matches!(
            fields.validated(),
            Err(ValidationError::TooLong {
                field: "category",
                ..
            })
        ));
    }

    #[test]
    fn test_validated_rejects_bad_amount() {
        let fields = TransactionFields::expense(1, dec!(0.001));
        assert!(matches!(
            fields.validated(),
            Err(ValidationError::AmountScale(_))
        ));
    }

    #[test]
    fn test_validated_rejects_year_past_9999() {
        let far_future = Utc.with_ymd_and_hms(10000, 1, 1, 0, 0, 0).unwrap();
        let fields = TransactionFields::income(1, dec!(5.00)).with_occurred_at(far_future);
        assert_eq!(
            fields.validated(),
            Err(ValidationError::TimestampOutOfRange(far_future))
        );
    }

    #[test]
    fn test_apply_replaces_fields_and_keeps_timestamp_when_unset() {
        let mut tx = sample_transaction();
        let recorded_at = tx.occurred_at;

        tx.apply(&TransactionFields::expense(2, dec!(30.00)));

        assert_eq!(tx.account_id, 2);
        assert_eq!(tx.transaction_type, TransactionType::Expense);
        assert_eq!(tx.amount, dec!(30.00));
        assert_eq!(tx.description, None);
        assert_eq!(tx.category, None);
        assert_eq!(tx.occurred_at, recorded_at);
    }

    #[test]
    fn test_filter_new_ignores_empty_category() {
        let tx = sample_transaction();

        let filter = TransactionFilter::new(None, Some(String::new()));
        assert_eq!(filter, TransactionFilter::default());
        assert!(filter.matches(&tx));

        let filter = TransactionFilter::new(Some(1), Some("work".into()));
        assert_eq!(filter.category.as_deref(), Some("work"));
        assert!(filter.matches(&tx));
    }

    #[test]
    fn test_filter_matching() {
        let tx = sample_transaction();

        assert!(TransactionFilter::default().matches(&tx));
        assert!(TransactionFilter::for_account(1).matches(&tx));
        assert!(!TransactionFilter::for_account(2).matches(&tx));
        assert!(
            TransactionFilter::for_account(1)
                .with_category("work")
                .matches(&tx)
        );
        assert!(
            !TransactionFilter::default()
                .with_category("Work")
                .matches(&tx)
        );
    }
}
