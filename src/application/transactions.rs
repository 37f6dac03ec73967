use tracing::{debug, info};

use crate::domain::{AccountId, Transaction, TransactionFields, TransactionFilter, TransactionId};
use crate::storage::StorageError;

use super::{AppError, LedgerService};

/// A foreign key failure on write means the account vanished between the
/// existence check and the write; report it the same way as the check would.
fn account_write_error(err: StorageError, account_id: AccountId) -> AppError {
    match err {
        StorageError::ForeignKeyViolation(_) => AppError::AccountNotFound(account_id),
        other => other.into(),
    }
}

impl LedgerService {
    /// Record a new transaction against an existing account.
    pub async fn create_transaction(
        &self,
        fields: TransactionFields,
    ) -> Result<Transaction, AppError> {
        let fields = fields.validated()?;
        self.get_account(fields.account_id).await?;

        let transaction = self
            .store
            .insert_transaction(&fields)
            .await
            .map_err(|e| account_write_error(e, fields.account_id))?;

        info!(
            transaction_id = transaction.id,
            account_id = transaction.account_id,
            kind = %transaction.transaction_type,
            amount = %transaction.amount,
            "Recorded transaction"
        );
        Ok(transaction)
    }

    /// List transactions matching the filter, most recent first.
    pub async fn list_transactions(
        &self,
        filter: TransactionFilter,
    ) -> Result<Vec<Transaction>, AppError> {
        debug!(?filter, "Listing transactions");
        Ok(self.store.list_transactions(&filter).await?)
    }

    /// Get a transaction by id.
    pub async fn get_transaction(&self, id: TransactionId) -> Result<Transaction, AppError> {
        self.store
            .get_transaction(id)
            .await?
            .ok_or(AppError::TransactionNotFound(id))
    }

    /// Replace every field of an existing transaction.
    ///
    /// Moving the transaction to another account requires that account to
    /// exist. Nothing is written if any check fails.
    pub async fn update_transaction(
        &self,
        id: TransactionId,
        fields: TransactionFields,
    ) -> Result<Transaction, AppError> {
        let fields = fields.validated()?;
        let current = self.get_transaction(id).await?;

        if fields.account_id != current.account_id {
            self.get_account(fields.account_id).await?;
        }

        let updated = self
            .store
            .update_transaction(id, &fields)
            .await
            .map_err(|e| account_write_error(e, fields.account_id))?
            .ok_or(AppError::TransactionNotFound(id))?;

        info!(
            transaction_id = id,
            account_id = updated.account_id,
            "Updated transaction"
        );
        Ok(updated)
    }

    /// Permanently remove a transaction.
    pub async fn delete_transaction(&self, id: TransactionId) -> Result<(), AppError> {
        if !self.store.delete_transaction(id).await? {
            return Err(AppError::TransactionNotFound(id));
        }
        info!(transaction_id = id, "Deleted transaction");
        Ok(())
    }
}
