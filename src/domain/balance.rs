use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{AMOUNT_SCALE, AccountId};

/// Income and expense sums for one account, as returned by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TypeTotals {
    pub income: Decimal,
    pub expense: Decimal,
}

/// Derived income/expense summary for an account. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    pub account_id: AccountId,
    pub income: Decimal,
    pub expense: Decimal,
    /// income - expense
    pub balance: Decimal,
}

impl Balance {
    pub fn from_totals(account_id: AccountId, totals: TypeTotals) -> Self {
        let mut income = totals.income;
        let mut expense = totals.expense;
        income.rescale(AMOUNT_SCALE);
        expense.rescale(AMOUNT_SCALE);

        let mut balance = income - expense;
        balance.rescale(AMOUNT_SCALE);

        Self {
            account_id,
            income,
            expense,
            balance,
        }
    }
}
