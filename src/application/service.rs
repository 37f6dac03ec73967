use std::sync::Arc;

use tracing::info;

use crate::storage::{LedgerStore, MemoryStore, SqliteStore};

use super::{AppError, RetryPolicy, with_retry};

/// Application service providing the ledger operations.
/// This is the primary interface for any client (CLI, API, etc.).
///
/// Account operations live in `accounts.rs`, transaction operations in
/// `transactions.rs` and balance computation in `balance.rs`.
pub struct LedgerService {
    pub(super) store: Arc<dyn LedgerStore>,
}

impl LedgerService {
    /// Create a new ledger service over an already opened store.
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// A service backed by a fresh in-memory store.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    /// Open (creating if needed) the SQLite database at the given path and
    /// bring its schema up to date, retrying according to `policy`.
    pub async fn init(database_path: &str, policy: &RetryPolicy) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}", database_path);
        let db_url = db_url.as_str();

        let store = with_retry(policy, move || SqliteStore::init(db_url)).await?;
        info!(database = database_path, "Ledger storage initialized");
        Ok(Self::new(Arc::new(store)))
    }

    /// Check that the backing store answers.
    pub async fn health(&self) -> Result<(), AppError> {
        Ok(self.store.ping().await?)
    }

    /// Release the backing store. Call once at shutdown.
    pub async fn close(&self) {
        self.store.close().await;
    }
}
