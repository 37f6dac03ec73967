use tracing::{debug, info};

use crate::domain::{Account, AccountId, NewAccount};
use crate::storage::StorageError;

use super::{AppError, LedgerService};

impl LedgerService {
    /// Create a new account.
    ///
    /// Name uniqueness is decided by the store in the same write that inserts
    /// the row, so two concurrent creates with one name cannot both succeed.
    pub async fn create_account(&self, new_account: NewAccount) -> Result<Account, AppError> {
        new_account.validate()?;

        match self.store.insert_account(&new_account).await {
            Ok(account) => {
                info!(account_id = account.id, name = %account.name, "Created account");
                Ok(account)
            }
            Err(StorageError::UniqueViolation(_)) => {
                Err(AppError::AccountAlreadyExists(new_account.name))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// List all accounts in creation order.
    pub async fn list_accounts(&self) -> Result<Vec<Account>, AppError> {
        Ok(self.store.list_accounts().await?)
    }

    /// Get an account by id.
    pub async fn get_account(&self, id: AccountId) -> Result<Account, AppError> {
        debug!(account_id = id, "Fetching account");
        self.store
            .get_account(id)
            .await?
            .ok_or(AppError::AccountNotFound(id))
    }
}
