pub mod bank;
pub mod conversion;
pub mod error;
pub mod ledger;
pub mod memory;
pub mod models;
pub mod retry;
pub mod transaction;
pub mod user;
pub mod wallet;

pub use bank::Bank;
pub use conversion::{Conversion, ConversionError, ExchangeRate};
pub use error::StoreError;
pub use ledger::{LedgerError, Operation};
pub use memory::MemoryStore;
pub use retry::RetryPolicy;

use sqlx::PgPool;

/// Postgres-backed storage.
pub struct Store {
    pub pool: PgPool,
    retry: RetryPolicy,
}

impl Store {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Applies the embedded schema migrations.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}
