use serde::{Deserialize, Serialize};

use super::{ValidationError, check_length, check_optional_length};

pub type AccountId = i64;

pub const ACCOUNT_NAME_MAX_LEN: usize = 100;
pub const ACCOUNT_DESCRIPTION_MAX_LEN: usize = 255;

/// A named container against which transactions are recorded.
/// Accounts are read-only once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    /// Unique across all accounts, compared byte-for-byte
    pub name: String,
    pub description: Option<String>,
}

/// Input for creating an account. The id is assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAccount {
    pub name: String,
    pub description: Option<String>,
}

impl NewAccount {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        check_length("name", &self.name, ACCOUNT_NAME_MAX_LEN)?;
        check_optional_length(
            "description",
            self.description.as_deref(),
            ACCOUNT_DESCRIPTION_MAX_LEN,
        )
    }
}
