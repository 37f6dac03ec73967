use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::Utc;

use crate::domain::{
    Account, AccountId, NewAccount, Transaction, TransactionFields, TransactionFilter,
    TransactionId, TransactionType, TypeTotals,
};

use super::{LedgerStore, StorageError};

#[derive(Default)]
struct Tables {
    accounts: BTreeMap<AccountId, Account>,
    transactions: BTreeMap<TransactionId, Transaction>,
    last_account_id: AccountId,
    last_transaction_id: TransactionId,
}

/// In-process store with the same constraints as the SQLite schema.
/// Every write holds the table lock for its whole check-and-modify step.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, StorageError> {
        self.tables
            .read()
            .map_err(|_| StorageError::Backend(anyhow!("memory store lock poisoned")))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, StorageError> {
        self.tables
            .write()
            .map_err(|_| StorageError::Backend(anyhow!("memory store lock poisoned")))
    }
}

fn missing_account(account_id: AccountId) -> StorageError {
    StorageError::ForeignKeyViolation(format!("account {} does not exist", account_id))
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn ping(&self) -> Result<(), StorageError> {
        self.read().map(|_| ())
    }

    async fn close(&self) {}

    async fn insert_account(&self, account: &NewAccount) -> Result<Account, StorageError> {
        let mut tables = self.write()?;
        if tables.accounts.values().any(|a| a.name == account.name) {
            return Err(StorageError::UniqueViolation(format!(
                "accounts.name = {}",
                account.name
            )));
        }

        tables.last_account_id += 1;
        let created = Account {
            id: tables.last_account_id,
            name: account.name.clone(),
            description: account.description.clone(),
        };
        tables.accounts.insert(created.id, created.clone());
        Ok(created)
    }

    async fn get_account(&self, id: AccountId) -> Result<Option<Account>, StorageError> {
        Ok(self.read()?.accounts.get(&id).cloned())
    }

    async fn list_accounts(&self) -> Result<Vec<Account>, StorageError> {
        Ok(self.read()?.accounts.values().cloned().collect())
    }

    async fn insert_transaction(
        &self,
        fields: &TransactionFields,
    ) -> Result<Transaction, StorageError> {
        let mut tables = self.write()?;
        if !tables.accounts.contains_key(&fields.account_id) {
            return Err(missing_account(fields.account_id));
        }

        tables.last_transaction_id += 1;
        let created = Transaction {
            id: tables.last_transaction_id,
            account_id: fields.account_id,
            transaction_type: fields.transaction_type,
            amount: fields.amount,
            description: fields.description.clone(),
            occurred_at: fields.occurred_at.unwrap_or_else(Utc::now),
            category: fields.category.clone(),
        };
        tables.transactions.insert(created.id, created.clone());
        Ok(created)
    }

    async fn get_transaction(
        &self,
        id: TransactionId,
    ) -> Result<Option<Transaction>, StorageError> {
        Ok(self.read()?.transactions.get(&id).cloned())
    }

    async fn list_transactions(
        &self,
        filter: &TransactionFilter,
    ) -> Result<Vec<Transaction>, StorageError> {
        let mut transactions: Vec<Transaction> = self
            .read()?
            .transactions
            .values()
            .filter(|tx| filter.matches(tx))
            .cloned()
            .collect();

        transactions.sort_by(|a, b| {
            b.occurred_at
                .cmp(&a.occurred_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(transactions)
    }

    async fn update_transaction(
        &self,
        id: TransactionId,
        fields: &TransactionFields,
    ) -> Result<Option<Transaction>, StorageError> {
        let mut tables = self.write()?;
        if !tables.transactions.contains_key(&id) {
            return Ok(None);
        }
        if !tables.accounts.contains_key(&fields.account_id) {
            return Err(missing_account(fields.account_id));
        }

        Ok(tables.transactions.get_mut(&id).map(|tx| {
            tx.apply(fields);
            tx.clone()
        }))
    }

    async fn delete_transaction(&self, id: TransactionId) -> Result<bool, StorageError> {
        Ok(self.write()?.transactions.remove(&id).is_some())
    }

    async fn sum_by_type(&self, account_id: AccountId) -> Result<TypeTotals, StorageError> {
        let tables = self.read()?;
        let mut totals = TypeTotals::default();
        for tx in tables
            .transactions
            .values()
            .filter(|tx| tx.account_id == account_id)
        {
            match tx.transaction_type {
                TransactionType::Income => totals.income += tx.amount,
                TransactionType::Expense => totals.expense += tx.amount,
            }
        }
        Ok(totals)
    }
}
