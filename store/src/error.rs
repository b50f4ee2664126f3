use thiserror::Error;

use crate::conversion::ConversionError;
use crate::ledger::LedgerError;
use crate::models::Currency;
use crate::retry::Retryable;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Username already registered")]
    UsernameTaken,
    #[error("User not found")]
    UserNotFound,
    #[error("{0} wallet not found")]
    NoWallet(Currency),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error(transparent)]
    Conversion(#[from] ConversionError),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// SQLSTATE codes after which the whole storage transaction may be replayed.
const SERIALIZATION_FAILURE: &str = "40001";
const DEADLOCK_DETECTED: &str = "40P01";

impl Retryable for StoreError {
    fn is_retryable(&self) -> bool {
        match self {
            StoreError::Database(sqlx::Error::Database(db)) => matches!(
                db.code().as_deref(),
                Some(SERIALIZATION_FAILURE) | Some(DEADLOCK_DETECTED)
            ),
            _ => false,
        }
    }
}
