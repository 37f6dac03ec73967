use thiserror::Error;

use crate::domain::{AccountId, TransactionId, ValidationError};
use crate::storage::StorageError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Account not found: {0}")]
    AccountNotFound(AccountId),

    #[error("Account already exists: {0}")]
    AccountAlreadyExists(String),

    #[error("Transaction not found: {0}")]
    TransactionNotFound(TransactionId),

    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Storage unavailable after {attempts} attempts")]
    StorageUnavailable {
        attempts: u32,
        #[source]
        source: StorageError,
    },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Coarse classification an outer layer can map to its own status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A referenced account or transaction does not exist
    NotFound,
    /// Account name already taken
    Conflict,
    /// Malformed field value
    Validation,
    Internal,
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::AccountNotFound(_) | AppError::TransactionNotFound(_) => ErrorKind::NotFound,
            AppError::AccountAlreadyExists(_) => ErrorKind::Conflict,
            AppError::Validation(_) => ErrorKind::Validation,
            AppError::StorageUnavailable { .. } | AppError::Storage(_) => ErrorKind::Internal,
        }
    }
}
