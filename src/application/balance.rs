use tracing::debug;

use crate::domain::{AccountId, Balance};

use super::{AppError, LedgerService};

impl LedgerService {
    /// Compute income, expense and net balance for an account.
    /// Recomputed from the stored transactions on every call.
    pub async fn balance(&self, account_id: AccountId) -> Result<Balance, AppError> {
        self.get_account(account_id).await?;

        let totals = self.store.sum_by_type(account_id).await?;
        let balance = Balance::from_totals(account_id, totals);

        debug!(
            account_id,
            income = %balance.income,
            expense = %balance.expense,
            balance = %balance.balance,
            "Computed balance"
        );
        Ok(balance)
    }
}
