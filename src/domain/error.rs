use chrono::NaiveDate;

use crate::domain::{AccountId, AssetCategory, Pool};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    IO(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Config(#[from] config::ConfigError),

    #[error("Ingestion failed with: {0}")]
    Ingestion(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Account {0} not found")]
    AccountNotFound(AccountId),

    #[error("Account {0} is disabled")]
    AccountDisabled(AccountId),

    #[error(
        "Insufficient {category} {pool} balance on account {account}: requested {requested}, have {current}"
    )]
    InsufficientBalance {
        account: AccountId,
        category: AssetCategory,
        pool: Pool,
        requested: u64,
        current: u64,
    },

    #[error("Account {0} already checked in on {1}")]
    AlreadyCheckedIn(AccountId, NaiveDate),

    #[error("Persistence failed with: {0}")]
    Persistence(String),
}

impl Error {
    /// Failures raised while the atomic unit was open; the caller may retry.
    pub fn is_persistence(&self) -> bool {
        matches!(self, Error::Persistence(_))
    }
}
