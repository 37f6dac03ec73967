mod memory;
mod sqlite;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{
    Account, AccountId, NewAccount, Transaction, TransactionFields, TransactionFilter,
    TransactionId, TypeTotals,
};

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// SQL migration for initial schema
pub const MIGRATION_001_INITIAL: &str = include_str!("migrations/001_initial.sql");

#[derive(Error, Debug)]
pub enum StorageError {
    /// A uniqueness constraint rejected the write.
    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),

    /// A write referenced a row that does not exist.
    #[error("Foreign key constraint violated: {0}")]
    ForeignKeyViolation(String),

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// Persistence operations the ledger needs from its backing store.
///
/// Implementations own id assignment, the account name uniqueness constraint,
/// the transaction -> account reference, and the default `occurred_at`
/// (the time of insertion) when none is supplied.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Check that the store is reachable.
    async fn ping(&self) -> Result<(), StorageError>;

    /// Release connections. The store must not be used afterwards.
    async fn close(&self);

    /// Insert an account. Fails with `UniqueViolation` if the name is taken.
    async fn insert_account(&self, account: &NewAccount) -> Result<Account, StorageError>;

    async fn get_account(&self, id: AccountId) -> Result<Option<Account>, StorageError>;

    /// All accounts in id order.
    async fn list_accounts(&self) -> Result<Vec<Account>, StorageError>;

    /// Insert a transaction. Fails with `ForeignKeyViolation` if the account is missing.
    async fn insert_transaction(
        &self,
        fields: &TransactionFields,
    ) -> Result<Transaction, StorageError>;

    async fn get_transaction(&self, id: TransactionId)
    -> Result<Option<Transaction>, StorageError>;

    /// Matching transactions, newest `occurred_at` first, ties by highest id.
    async fn list_transactions(
        &self,
        filter: &TransactionFilter,
    ) -> Result<Vec<Transaction>, StorageError>;

    /// Replace every field of a transaction. Returns `None` if it does not exist;
    /// a `None` `occurred_at` keeps the stored value.
    async fn update_transaction(
        &self,
        id: TransactionId,
        fields: &TransactionFields,
    ) -> Result<Option<Transaction>, StorageError>;

    /// Returns `false` if there was nothing to delete.
    async fn delete_transaction(&self, id: TransactionId) -> Result<bool, StorageError>;

    /// Sum amounts per transaction type for one account, in a single read.
    async fn sum_by_type(&self, account_id: AccountId) -> Result<TypeTotals, StorageError>;
}
