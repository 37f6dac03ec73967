// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use finledger::application::{LedgerService, RetryPolicy};
use finledger::domain::{Account, NewAccount};
use tempfile::TempDir;

/// Helper to create a test service with a temporary SQLite database
pub async fn test_service() -> Result<(LedgerService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let service = LedgerService::init(db_path.to_str().unwrap(), &RetryPolicy::once()).await?;
    Ok((service, temp_dir))
}

/// Helper to parse a date string into DateTime<Utc>
pub fn parse_date(date_str: &str) -> DateTime<Utc> {
    NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
        .and_utc()
}

/// Create an account with no description
pub async fn create_account(service: &LedgerService, name: &str) -> Result<Account> {
    Ok(service.create_account(NewAccount::new(name)).await?)
}
