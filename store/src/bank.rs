use async_trait::async_trait;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::Store;
use crate::error::StoreError;
use crate::ledger::Operation;
use crate::models::{Currency, NewUser, Transaction, User, Wallet};

/// Storage port used by the HTTP layer.
///
/// Implementations must run [`Bank::execute`] atomically: no interleaving of
/// two operations on the same wallet may be observable.
#[async_trait]
pub trait Bank: Send + Sync {
    /// Creates the user together with one wallet per supported currency.
    async fn create_user(&self, new_user: NewUser) -> Result<User, StoreError>;

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;

    async fn get_user_by_id(&self, user_id: Uuid) -> Result<Option<User>, StoreError>;

    async fn list_wallets(&self, owner_id: Uuid) -> Result<Vec<Wallet>, StoreError>;

    async fn find_wallet(
        &self,
        owner_id: Uuid,
        currency: Currency,
    ) -> Result<Option<Wallet>, StoreError>;

    /// Validates and applies `op` on behalf of `owner_id`, appending one
    /// transaction record.
    async fn execute(&self, owner_id: Uuid, op: Operation) -> Result<Transaction, StoreError>;

    /// Transactions touching any wallet of `owner_id`, oldest first.
    async fn list_transactions(&self, owner_id: Uuid) -> Result<Vec<Transaction>, StoreError>;

    async fn deposit(
        &self,
        owner_id: Uuid,
        wallet_id: Uuid,
        amount: Decimal,
    ) -> Result<Transaction, StoreError> {
        self.execute(owner_id, Operation::Deposit { wallet_id, amount })
            .await
    }

    async fn withdraw(
        &self,
        owner_id: Uuid,
        wallet_id: Uuid,
        amount: Decimal,
    ) -> Result<Transaction, StoreError> {
        self.execute(owner_id, Operation::Withdrawal { wallet_id, amount })
            .await
    }

    async fn transfer(
        &self,
        owner_id: Uuid,
        source: Uuid,
        destination: Uuid,
        amount: Decimal,
    ) -> Result<Transaction, StoreError> {
        self.execute(
            owner_id,
            Operation::Transfer {
                source,
                destination,
                amount,
            },
        )
        .await
    }
}

#[async_trait]
impl Bank for Store {
    async fn create_user(&self, new_user: NewUser) -> Result<User, StoreError> {
        Store::create_user(self, new_user).await
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        Store::get_user_by_username(self, username).await
    }

    async fn get_user_by_id(&self, user_id: Uuid) -> Result<Option<User>, StoreError> {
        Store::get_user_by_id(self, user_id).await
    }

    async fn list_wallets(&self, owner_id: Uuid) -> Result<Vec<Wallet>, StoreError> {
        Store::list_wallets(self, owner_id).await
    }

    async fn find_wallet(
        &self,
        owner_id: Uuid,
        currency: Currency,
    ) -> Result<Option<Wallet>, StoreError> {
        Store::find_wallet(self, owner_id, currency).await
    }

    async fn execute(&self, owner_id: Uuid, op: Operation) -> Result<Transaction, StoreError> {
        Store::execute(self, owner_id, op).await
    }

    async fn list_transactions(&self, owner_id: Uuid) -> Result<Vec<Transaction>, StoreError> {
        Store::list_transactions(self, owner_id).await
    }
}
