use std::str::FromStr;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::Row;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use tracing::debug;

use crate::domain::{
    Account, AccountId, NewAccount, Transaction, TransactionFields, TransactionFilter,
    TransactionId, TransactionType, TypeTotals, amount_to_cents, cents_to_amount,
};

use super::{LedgerStore, MIGRATION_001_INITIAL, StorageError};

const TRANSACTION_COLUMNS: &str =
    "id, account_id, type, amount_cents, description, occurred_at, category";

/// SQLite-backed store for accounts and transactions.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Create a new store with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a SQLite database at the given URL.
    /// Creates the database file if it doesn't exist and enforces foreign keys.
    pub async fn connect(database_url: &str) -> Result<Self, StorageError> {
        let options = SqliteConnectOptions::from_str(database_url)
            .context("Invalid database URL")?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<(), StorageError> {
        sqlx::raw_sql(MIGRATION_001_INITIAL)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;
        Ok(())
    }

    /// Initialize the database (connect + migrate).
    pub async fn init(database_url: &str) -> Result<Self, StorageError> {
        let store = Self::connect(database_url).await?;
        store.migrate().await?;
        debug!(database_url, "SQLite store ready");
        Ok(store)
    }

    fn row_to_account(row: &SqliteRow) -> Result<Account> {
        Ok(Account {
            id: row.get("id"),
            name: row.get("name"),
            description: row.get("description"),
        })
    }

    fn row_to_transaction(row: &SqliteRow) -> Result<Transaction> {
        let type_str: String = row.get("type");
        let occurred_at_str: String = row.get("occurred_at");

        Ok(Transaction {
            id: row.get("id"),
            account_id: row.get("account_id"),
            transaction_type: TransactionType::from_str(&type_str)
                .with_context(|| format!("Invalid transaction type: {}", type_str))?,
            amount: cents_to_amount(row.get("amount_cents")),
            description: row.get("description"),
            occurred_at: parse_timestamp(&occurred_at_str)?,
            category: row.get("category"),
        })
    }
}

/// Timestamps are stored with a fixed number of fractional digits so that
/// string comparison in SQL matches chronological order.
fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(value)
        .context("Invalid occurred_at timestamp")?
        .with_timezone(&Utc))
}

/// Turn constraint failures into their typed variants; everything else is a
/// backend error carrying `context`.
fn classify(err: sqlx::Error, context: &'static str) -> StorageError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return StorageError::UniqueViolation(db_err.message().to_string());
        }
        if db_err.is_foreign_key_violation() {
            return StorageError::ForeignKeyViolation(db_err.message().to_string());
        }
    }
    StorageError::Backend(anyhow::Error::new(err).context(context))
}

#[async_trait]
impl LedgerStore for SqliteStore {
    async fn ping(&self) -> Result<(), StorageError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .context("Database is not reachable")?;
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
    }

    // ========================
    // Account operations
    // ========================

    async fn insert_account(&self, account: &NewAccount) -> Result<Account, StorageError> {
        let row = sqlx::query(
            r#"
            INSERT INTO accounts (name, description)
            VALUES (?, ?)
            RETURNING id, name, description
            "#,
        )
        .bind(&account.name)
        .bind(&account.description)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| classify(e, "Failed to save account"))?;

        Ok(Self::row_to_account(&row)?)
    }

    async fn get_account(&self, id: AccountId) -> Result<Option<Account>, StorageError> {
        let row = sqlx::query("SELECT id, name, description FROM accounts WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch account")?;

        match row {
            Some(row) => Ok(Some(Self::row_to_account(&row)?)),
            None => Ok(None),
        }
    }

    async fn list_accounts(&self) -> Result<Vec<Account>, StorageError> {
        let rows = sqlx::query("SELECT id, name, description FROM accounts ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .context("Failed to list accounts")?;

        Ok(rows
            .iter()
            .map(Self::row_to_account)
            .collect::<Result<Vec<_>>>()?)
    }

    // ========================
    // Transaction operations
    // ========================

    async fn insert_transaction(
        &self,
        fields: &TransactionFields,
    ) -> Result<Transaction, StorageError> {
        let amount_cents =
            amount_to_cents(fields.amount).context("Amount does not fit the storage format")?;
        let occurred_at = fields.occurred_at.unwrap_or_else(Utc::now);

        let query = format!(
            "INSERT INTO transactions (account_id, type, amount_cents, description, occurred_at, category) \
             VALUES (?, ?, ?, ?, ?, ?) RETURNING {}",
            TRANSACTION_COLUMNS
        );

        let row = sqlx::query(&query)
            .bind(fields.account_id)
            .bind(fields.transaction_type.as_str())
            .bind(amount_cents)
            .bind(&fields.description)
            .bind(format_timestamp(occurred_at))
            .bind(&fields.category)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| classify(e, "Failed to save transaction"))?;

        Ok(Self::row_to_transaction(&row)?)
    }

    async fn get_transaction(
        &self,
        id: TransactionId,
    ) -> Result<Option<Transaction>, StorageError> {
        let query = format!("SELECT {} FROM transactions WHERE id = ?", TRANSACTION_COLUMNS);
        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch transaction")?;

        match row {
            Some(row) => Ok(Some(Self::row_to_transaction(&row)?)),
            None => Ok(None),
        }
    }

    async fn list_transactions(
        &self,
        filter: &TransactionFilter,
    ) -> Result<Vec<Transaction>, StorageError> {
        // Build query dynamically based on filters
        let mut query = format!("SELECT {} FROM transactions WHERE 1=1", TRANSACTION_COLUMNS);

        if filter.account_id.is_some() {
            query.push_str(" AND account_id = ?");
        }
        if filter.category.is_some() {
            query.push_str(" AND category = ?");
        }
        query.push_str(" ORDER BY occurred_at DESC, id DESC");

        let mut sql_query = sqlx::query(&query);
        if let Some(account_id) = filter.account_id {
            sql_query = sql_query.bind(account_id);
        }
        if let Some(category) = &filter.category {
            sql_query = sql_query.bind(category);
        }

        let rows = sql_query
            .fetch_all(&self.pool)
            .await
            .context("Failed to list transactions")?;

        Ok(rows
            .iter()
            .map(Self::row_to_transaction)
            .collect::<Result<Vec<_>>>()?)
    }

    async fn update_transaction(
        &self,
        id: TransactionId,
        fields: &TransactionFields,
    ) -> Result<Option<Transaction>, StorageError> {
        let amount_cents =
            amount_to_cents(fields.amount).context("Amount does not fit the storage format")?;

        let query = format!(
            "UPDATE transactions \
             SET account_id = ?, type = ?, amount_cents = ?, description = ?, \
                 occurred_at = COALESCE(?, occurred_at), category = ? \
             WHERE id = ? RETURNING {}",
            TRANSACTION_COLUMNS
        );

        let row = sqlx::query(&query)
            .bind(fields.account_id)
            .bind(fields.transaction_type.as_str())
            .bind(amount_cents)
            .bind(&fields.description)
            .bind(fields.occurred_at.map(format_timestamp))
            .bind(&fields.category)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| classify(e, "Failed to update transaction"))?;

        match row {
            Some(row) => Ok(Some(Self::row_to_transaction(&row)?)),
            None => Ok(None),
        }
    }

    async fn delete_transaction(&self, id: TransactionId) -> Result<bool, StorageError> {
        let result = sqlx::query("DELETE FROM transactions WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete transaction")?;

        Ok(result.rows_affected() > 0)
    }

    // ========================
    // Aggregates
    // ========================

    async fn sum_by_type(&self, account_id: AccountId) -> Result<TypeTotals, StorageError> {
        let row = sqlx::query(
            r#"
            SELECT
                COALESCE(SUM(CASE WHEN type = 'INCOME' THEN amount_cents ELSE 0 END), 0) as income,
                COALESCE(SUM(CASE WHEN type = 'EXPENSE' THEN amount_cents ELSE 0 END), 0) as expense
            FROM transactions
            WHERE account_id = ?
            "#,
        )
        .bind(account_id)
        .fetch_one(&self.pool)
        .await
        .context("Failed to sum transactions")?;

        Ok(TypeTotals {
            income: cents_to_amount(row.get("income")),
            expense: cents_to_amount(row.get("expense")),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_timestamps_sort_lexically() {
        let earlier = Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap();
        let later = earlier + chrono::Duration::milliseconds(1);

        let a = format_timestamp(earlier);
        let b = format_timestamp(later);
        assert_eq!(a.len(), b.len());
        assert!(a < b);
    }

    #[test]
    fn test_timestamp_roundtrip_keeps_precision() {
        let now = Utc::now();
        assert_eq!(parse_timestamp(&format_timestamp(now)).unwrap(), now);
    }
}
