mod common;

use anyhow::Result;
use common::{create_account, parse_date, test_service};
use finledger::application::{AppError, LedgerService};
use finledger::domain::{TransactionFields, TransactionType};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

async fn check_wallet_example(service: &LedgerService) -> Result<()> {
    let wallet = create_account(service, "Wallet").await?;
    assert_eq!(wallet.id, 1);

    service
        .create_transaction(TransactionFields::income(wallet.id, dec!(100.00)))
        .await?;
    service
        .create_transaction(TransactionFields::expense(wallet.id, dec!(30.00)))
        .await?;

    let balance = service.balance(wallet.id).await?;
    assert_eq!(balance.account_id, 1);
    assert_eq!(balance.income.to_string(), "100.00");
    assert_eq!(balance.expense.to_string(), "30.00");
    assert_eq!(balance.balance.to_string(), "70.00");
    Ok(())
}

async fn check_empty_account(service: &LedgerService) -> Result<()> {
    let account = create_account(service, "Empty").await?;

    let balance = service.balance(account.id).await?;
    assert_eq!(balance.income, Decimal::ZERO);
    assert_eq!(balance.expense, Decimal::ZERO);
    assert_eq!(balance.balance.to_string(), "0.00");
    Ok(())
}

/// Sums of many cent values that are not exactly representable in binary
/// floating point must not drift.
async fn check_exact_sums(service: &LedgerService) -> Result<()> {
    let account = create_account(service, "Exact").await?;
    let other = create_account(service, "Other").await?;

    let mut expected_income = Decimal::ZERO;
    let mut expected_expense = Decimal::ZERO;
    for i in 0..50u32 {
        let amount = Decimal::new(10 + i64::from(i % 7), 2); // 0.10 .. 0.16
        let kind = if i % 3 == 0 {
            expected_expense += amount;
            TransactionType::Expense
        } else {
            expected_income += amount;
            TransactionType::Income
        };
        service
            .create_transaction(
                TransactionFields::new(account.id, kind, amount)
                    .with_occurred_at(parse_date("2024-03-01")),
            )
            .await?;
    }

    // Noise on another account must not leak in
    service
        .create_transaction(TransactionFields::income(other.id, dec!(1000.00)))
        .await?;

    let balance = service.balance(account.id).await?;
    assert_eq!(balance.income, expected_income);
    assert_eq!(balance.expense, expected_expense);
    assert_eq!(balance.balance, expected_income - expected_expense);
    Ok(())
}

async fn check_balance_follows_mutations(service: &LedgerService) -> Result<()> {
    let a = create_account(service, "A").await?;
    let b = create_account(service, "B").await?;

    let tx = service
        .create_transaction(TransactionFields::income(a.id, dec!(50.00)))
        .await?;
    service
        .create_transaction(TransactionFields::expense(a.id, dec!(20.00)))
        .await?;
    assert_eq!(service.balance(a.id).await?.balance, dec!(30.00));

    // Moving the income to B shifts it across accounts
    service
        .update_transaction(tx.id, TransactionFields::income(b.id, dec!(50.00)))
        .await?;
    assert_eq!(service.balance(a.id).await?.balance, dec!(-20.00));
    assert_eq!(service.balance(b.id).await?.balance, dec!(50.00));

    service.delete_transaction(tx.id).await?;
    assert_eq!(service.balance(b.id).await?.balance, dec!(0.00));
    Ok(())
}

async fn check_missing_account(service: &LedgerService) -> Result<()> {
    let err = service.balance(404).await.unwrap_err();
    assert!(matches!(err, AppError::AccountNotFound(404)));
    Ok(())
}

#[tokio::test]
async fn test_wallet_example() -> Result<()> {
    let (service, _temp) = test_service().await?;
    check_wallet_example(&service).await?;
    check_wallet_example(&LedgerService::in_memory()).await
}

#[tokio::test]
async fn test_empty_account_balance_is_zero() -> Result<()> {
    let (service, _temp) = test_service().await?;
    check_empty_account(&service).await?;
    check_empty_account(&LedgerService::in_memory()).await
}

#[tokio::test]
async fn test_balance_sums_are_exact() -> Result<()> {
    let (service, _temp) = test_service().await?;
    check_exact_sums(&service).await?;
    check_exact_sums(&LedgerService::in_memory()).await
}

#[tokio::test]
async fn test_balance_follows_updates_and_deletes() -> Result<()> {
    let (service, _temp) = test_service().await?;
    check_balance_follows_mutations(&service).await?;
    check_balance_follows_mutations(&LedgerService::in_memory()).await
}

#[tokio::test]
async fn test_balance_of_missing_account() -> Result<()> {
    let (service, _temp) = test_service().await?;
    check_missing_account(&service).await?;
    check_missing_account(&LedgerService::in_memory()).await
}
