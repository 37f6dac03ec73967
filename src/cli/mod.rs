use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use crate::application::{AppError, ErrorKind, LedgerService, RetryPolicy};
use crate::domain::{
    Account, AccountId, Balance, NewAccount, Transaction, TransactionFields, TransactionFilter,
    TransactionId, TransactionType, ValidationError, format_amount, parse_amount,
};

/// finledger - income/expense ledger with per-account balances
#[derive(Parser, Debug)]
#[command(name = "finledger")]
#[command(about = "Track income and expenses per account and compute balances")]
#[command(version)]
pub struct Cli {
    /// Database file path
    #[arg(short, long, env = "FINLEDGER_DATABASE", default_value = "finledger.db")]
    pub database: String,

    /// Enable verbose (debug) logging on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// How many times to try opening the database before giving up
    #[arg(
        long,
        global = true,
        env = "FINLEDGER_CONNECT_RETRIES",
        default_value_t = RetryPolicy::DEFAULT_MAX_ATTEMPTS,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub connect_retries: u32,

    /// Milliseconds to wait between attempts to open the database
    #[arg(
        long,
        global = true,
        env = "FINLEDGER_RETRY_DELAY_MS",
        default_value_t = 2000
    )]
    pub retry_delay_ms: u64,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the database and its tables
    Init,

    /// Check that the database is reachable
    Health,

    /// Account management commands
    #[command(subcommand)]
    Account(AccountCommands),

    /// Transaction management commands
    #[command(subcommand)]
    #[command(name = "tx")]
    Transaction(TransactionCommands),

    /// Show income, expense and balance for an account
    Balance {
        /// Account id
        account: AccountId,
    },
}

#[derive(Subcommand, Debug)]
pub enum AccountCommands {
    /// Create a new account
    Create {
        /// Account name (must be unique)
        name: String,

        /// Optional description
        #[arg(short, long)]
        description: Option<String>,
    },

    /// List all accounts
    List,

    /// Show a single account
    Show {
        /// Account id
        id: AccountId,
    },
}

#[derive(Subcommand, Debug)]
pub enum TransactionCommands {
    /// Record a new transaction
    Add(TransactionArgs),

    /// List transactions, most recent first
    List {
        /// Filter by account id
        #[arg(long)]
        account: Option<AccountId>,

        /// Filter by category
        #[arg(long)]
        category: Option<String>,
    },

    /// Show a single transaction
    Show {
        /// Transaction id
        id: TransactionId,
    },

    /// Replace all fields of a transaction
    Update {
        /// Transaction id
        id: TransactionId,

        #[command(flatten)]
        fields: TransactionArgs,
    },

    /// Delete a transaction
    Delete {
        /// Transaction id
        id: TransactionId,
    },
}

/// Fields shared by `tx add` and `tx update`.
#[derive(Args, Debug)]
pub struct TransactionArgs {
    /// Amount (e.g., "50.00" or "50")
    #[arg(allow_negative_numbers = true)]
    pub amount: String,

    /// Account id
    #[arg(long)]
    pub account: AccountId,

    /// INCOME or EXPENSE
    #[arg(long = "type", value_name = "TYPE")]
    pub kind: String,

    /// Description of the transaction
    #[arg(short, long)]
    pub description: Option<String>,

    /// Category (e.g., "groceries", "salary")
    #[arg(short, long)]
    pub category: Option<String>,

    /// When it happened (YYYY-MM-DD or RFC 3339, defaults to now)
    #[arg(long)]
    pub date: Option<String>,
}

impl TransactionArgs {
    fn into_fields(self) -> Result<TransactionFields> {
        let transaction_type: TransactionType = self.kind.parse().map_err(AppError::from)?;
        let amount = parse_amount(&self.amount).map_err(AppError::from)?;
        let occurred_at = self
            .date
            .as_deref()
            .map(parse_timestamp)
            .transpose()
            .map_err(AppError::from)?;

        Ok(TransactionFields {
            account_id: self.account,
            transaction_type,
            amount,
            description: self.description,
            occurred_at,
            category: self.category,
        })
    }
}

impl Cli {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.connect_retries,
            Duration::from_millis(self.retry_delay_ms),
        )
    }

    pub async fn run(self) -> Result<()> {
        let service = LedgerService::init(&self.database, &self.retry_policy()).await?;
        let output = Output { json: self.json };

        let result = match self.command {
            Commands::Init => {
                println!("Database initialized: {}", self.database);
                Ok(())
            }
            command => dispatch(&service, command, output).await,
        };

        service.close().await;
        result
    }
}

/// Run one command against an open service.
pub async fn dispatch(service: &LedgerService, command: Commands, output: Output) -> Result<()> {
    match command {
        Commands::Init => Ok(()),

        Commands::Health => {
            service.health().await?;
            if output.json {
                output.print_json(&serde_json::json!({ "status": "ok" }))
            } else {
                println!("ok");
                Ok(())
            }
        }

        Commands::Account(cmd) => run_account_command(service, cmd, output).await,

        Commands::Transaction(cmd) => run_transaction_command(service, cmd, output).await,

        Commands::Balance { account } => {
            let balance = service.balance(account).await?;
            output.balance(&balance)
        }
    }
}

async fn run_account_command(
    service: &LedgerService,
    cmd: AccountCommands,
    output: Output,
) -> Result<()> {
    match cmd {
        AccountCommands::Create { name, description } => {
            let new_account = NewAccount { name, description };
            let account = service.create_account(new_account).await?;
            if output.json {
                return output.print_json(&account);
            }
            println!("Created account: {} (id {})", account.name, account.id);
        }

        AccountCommands::List => {
            let accounts = service.list_accounts().await?;
            output.accounts(&accounts)?;
        }

        AccountCommands::Show { id } => {
            let account = service.get_account(id).await?;
            output.account(&account)?;
        }
    }
    Ok(())
}

async fn run_transaction_command(
    service: &LedgerService,
    cmd: TransactionCommands,
    output: Output,
) -> Result<()> {
    match cmd {
        TransactionCommands::Add(args) => {
            let transaction = service.create_transaction(args.into_fields()?).await?;
            if output.json {
                return output.print_json(&transaction);
            }
            println!(
                "Recorded transaction {}: {} {} on account {}",
                transaction.id,
                transaction.transaction_type,
                format_amount(transaction.amount),
                transaction.account_id
            );
        }

        TransactionCommands::List { account, category } => {
            let filter = TransactionFilter::new(account, category);
            let transactions = service.list_transactions(filter).await?;
            output.transactions(&transactions)?;
        }

        TransactionCommands::Show { id } => {
            let transaction = service.get_transaction(id).await?;
            output.transaction(&transaction)?;
        }

        TransactionCommands::Update { id, fields } => {
            let transaction = service.update_transaction(id, fields.into_fields()?).await?;
            if output.json {
                return output.print_json(&transaction);
            }
            println!("Updated transaction {}", transaction.id);
        }

        TransactionCommands::Delete { id } => {
            service.delete_transaction(id).await?;
            if !output.json {
                println!("Deleted transaction {}", id);
            }
        }
    }
    Ok(())
}

/// Rendering of command results on stdout.
#[derive(Debug, Clone, Copy, Default)]
pub struct Output {
    pub json: bool,
}

impl Output {
    fn print_json<T: Serialize + ?Sized>(&self, value: &T) -> Result<()> {
        let rendered = serde_json::to_string_pretty(value).context("Failed to render JSON")?;
        println!("{}", rendered);
        Ok(())
    }

    fn account(&self, account: &Account) -> Result<()> {
        if self.json {
            return self.print_json(account);
        }
        println!("Account: {}", account.name);
        println!("  ID:          {}", account.id);
        if let Some(desc) = &account.description {
            println!("  Description: {}", desc);
        }
        Ok(())
    }

    fn accounts(&self, accounts: &[Account]) -> Result<()> {
        if self.json {
            return self.print_json(accounts);
        }
        if accounts.is_empty() {
            println!("No accounts found.");
            return Ok(());
        }
        println!("{:<6} {:<24} DESCRIPTION", "ID", "NAME");
        println!("{}", "-".repeat(50));
        for account in accounts {
            println!(
                "{:<6} {:<24} {}",
                account.id,
                account.name,
                account.description.as_deref().unwrap_or("")
            );
        }
        Ok(())
    }

    fn transaction(&self, tx: &Transaction) -> Result<()> {
        if self.json {
            return self.print_json(tx);
        }
        println!("Transaction: {}", tx.id);
        println!("  Account:     {}", tx.account_id);
        println!("  Type:        {}", tx.transaction_type);
        println!("  Amount:      {}", format_amount(tx.amount));
        println!(
            "  Occurred at: {}",
            tx.occurred_at.format("%Y-%m-%d %H:%M:%S")
        );
        if let Some(category) = &tx.category {
            println!("  Category:    {}", category);
        }
        if let Some(desc) = &tx.description {
            println!("  Description: {}", desc);
        }
        Ok(())
    }

    fn transactions(&self, transactions: &[Transaction]) -> Result<()> {
        if self.json {
            return self.print_json(transactions);
        }
        if transactions.is_empty() {
            println!("No transactions found.");
            return Ok(());
        }
        println!(
            "{:<6} {:<8} {:<8} {:>14} {:<11} {:<15} DESCRIPTION",
            "ID", "ACCOUNT", "TYPE", "AMOUNT", "DATE", "CATEGORY"
        );
        println!("{}", "-".repeat(80));
        for tx in transactions {
            println!(
                "{:<6} {:<8} {:<8} {:>14} {:<11} {:<15} {}",
                tx.id,
                tx.account_id,
                tx.transaction_type,
                format_amount(tx.amount),
                tx.occurred_at.format("%Y-%m-%d"),
                tx.category.as_deref().unwrap_or("-"),
                tx.description.as_deref().unwrap_or("")
            );
        }
        Ok(())
    }

    fn balance(&self, balance: &Balance) -> Result<()> {
        if self.json {
            return self.print_json(balance);
        }
        println!("Account {}", balance.account_id);
        println!("  {:<10} {:>14}", "Income", format_amount(balance.income));
        println!("  {:<10} {:>14}", "Expense", format_amount(balance.expense));
        println!("  {:<10} {:>14}", "Balance", format_amount(balance.balance));
        Ok(())
    }
}

/// Parse a YYYY-MM-DD date (midnight UTC) or a full RFC 3339 timestamp.
pub fn parse_timestamp(input: &str) -> Result<DateTime<Utc>, ValidationError> {
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(input) {
        return Ok(timestamp.with_timezone(&Utc));
    }

    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|datetime| datetime.and_utc())
        .ok_or_else(|| ValidationError::InvalidTimestamp(input.to_string()))
}

/// Install the global tracing subscriber. Logs go to stderr so that stdout
/// only carries command output.
pub fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("finledger=debug,sqlx=warn")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Process exit code for a failed command, distinguishing caller mistakes
/// from internal failures.
pub fn exit_code(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<AppError>().map(AppError::kind) {
        Some(ErrorKind::Validation) => 2,
        Some(ErrorKind::NotFound) => 3,
        Some(ErrorKind::Conflict) => 4,
        Some(ErrorKind::Internal) | None => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_tx_add() {
        let cli = Cli::try_parse_from([
            "finledger",
            "tx",
            "add",
            "100.00",
            "--account",
            "1",
            "--type",
            "INCOME",
            "--category",
            "salary",
            "--date",
            "2024-01-15",
        ])
        .unwrap();

        let Commands::Transaction(TransactionCommands::Add(args)) = cli.command else {
            panic!("expected tx add");
        };
        let fields = args.into_fields().unwrap();
        assert_eq!(fields.account_id, 1);
        assert_eq!(fields.transaction_type, TransactionType::Income);
        assert_eq!(fields.amount, dec!(100.00));
        assert_eq!(fields.category.as_deref(), Some("salary"));
        assert_eq!(
            fields.occurred_at.map(|t| t.date_naive().to_string()),
            Some("2024-01-15".to_string())
        );
    }

    #[test]
    fn test_lowercase_type_is_a_validation_error() {
        let args = TransactionArgs {
            amount: "5".into(),
            account: 1,
            kind: "expense".into(),
            description: None,
            category: None,
            date: None,
        };
        let err = args.into_fields().unwrap_err();
        assert_eq!(exit_code(&err), 2);
        assert!(matches!(
            err.downcast_ref::<AppError>(),
            Some(AppError::Validation(ValidationError::InvalidTransactionType(_)))
        ));
    }

    #[test]
    fn test_malformed_date_is_a_validation_error() {
        let args = TransactionArgs {
            amount: "5".into(),
            account: 1,
            kind: "EXPENSE".into(),
            description: None,
            category: None,
            date: Some("01/03/2024".into()),
        };
        let err = args.into_fields().unwrap_err();
        assert_eq!(exit_code(&err), 2);
        assert!(matches!(
            err.downcast_ref::<AppError>(),
            Some(AppError::Validation(ValidationError::InvalidTimestamp(_)))
        ));
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::try_parse_from([
            "finledger",
            "--database",
            "/tmp/x.db",
            "balance",
            "3",
            "--json",
            "--connect-retries",
            "5",
            "--retry-delay-ms",
            "10",
        ])
        .unwrap();
        assert!(cli.json);
        assert_eq!(cli.database, "/tmp/x.db");
        assert_eq!(
            cli.retry_policy(),
            RetryPolicy::new(5, Duration::from_millis(10))
        );
        assert!(matches!(cli.command, Commands::Balance { account: 3 }));
    }

    #[test]
    fn test_zero_retries_rejected() {
        assert!(
            Cli::try_parse_from(["finledger", "--connect-retries", "0", "health"]).is_err()
        );
    }

    #[test]
    fn test_parse_timestamp() {
        assert_eq!(
            parse_timestamp("2024-03-01").unwrap().to_rfc3339(),
            "2024-03-01T00:00:00+00:00"
        );
        assert_eq!(
            parse_timestamp("2024-03-01T10:30:00+02:00")
                .unwrap()
                .to_rfc3339(),
            "2024-03-01T08:30:00+00:00"
        );
        assert!(parse_timestamp("01/03/2024").is_err());
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(exit_code(&anyhow::Error::from(AppError::AccountNotFound(1))), 3);
        assert_eq!(
            exit_code(&anyhow::Error::from(AppError::AccountAlreadyExists(
                "x".into()
            ))),
            4
        );
        assert_eq!(exit_code(&anyhow::anyhow!("boom")), 1);
        let wrapped = anyhow::Error::from(AppError::TransactionNotFound(2)).context("while showing");
        assert_eq!(exit_code(&wrapped), 3);
    }

    #[tokio::test]
    async fn test_dispatch_against_memory_store() {
        let service = LedgerService::in_memory();
        let output = Output::default();

        dispatch(
            &service,
            Commands::Account(AccountCommands::Create {
                name: "Wallet".into(),
                description: None,
            }),
            output,
        )
        .await
        .unwrap();

        let err = dispatch(&service, Commands::Balance { account: 2 }, output)
            .await
            .unwrap_err();
        assert_eq!(exit_code(&err), 3);

        dispatch(&service, Commands::Balance { account: 1 }, output)
            .await
            .unwrap();
    }
}
