use sqlx::PgConnection;
use uuid::Uuid;

use crate::Store;
use crate::error::StoreError;
use crate::ledger::BalanceChange;
use crate::models::{Currency, Wallet};

const WALLET_COLUMNS: &str = "id, owner_id, currency, balance, created_at, updated_at";

impl Store {
    pub async fn list_wallets(&self, owner_id: Uuid) -> Result<Vec<Wallet>, StoreError> {
        let wallets = sqlx::query_as::<_, Wallet>(&format!(
            "SELECT {WALLET_COLUMNS} FROM wallets WHERE owner_id = $1 ORDER BY created_at, id"
        ))
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(wallets)
    }

    pub async fn find_wallet(
        &self,
        owner_id: Uuid,
        currency: Currency,
    ) -> Result<Option<Wallet>, StoreError> {
        let wallet = sqlx::query_as::<_, Wallet>(&format!(
            "SELECT {WALLET_COLUMNS} FROM wallets WHERE owner_id = $1 AND currency = $2"
        ))
        .bind(owner_id)
        .bind(currency)
        .fetch_optional(&self.pool)
        .await?;

        Ok(wallet)
    }
}

/// Row-locks the given wallets for the rest of the transaction. Locks are
/// taken in id order so concurrent transfers cannot deadlock on each other.
pub(crate) async fn lock_wallets(
    conn: &mut PgConnection,
    ids: &[Uuid],
) -> Result<Vec<Wallet>, sqlx::Error> {
    sqlx::query_as::<_, Wallet>(&format!(
        "SELECT {WALLET_COLUMNS} FROM wallets WHERE id = ANY($1) ORDER BY id FOR UPDATE"
    ))
    .bind(ids)
    .fetch_all(&mut *conn)
    .await
}

pub(crate) async fn set_balance(
    conn: &mut PgConnection,
    change: &BalanceChange,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE wallets SET balance = $2, updated_at = NOW() WHERE id = $1")
        .bind(change.wallet_id)
        .bind(change.balance)
        .execute(&mut *conn)
        .await?;
    Ok(())
}
