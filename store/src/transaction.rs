use uuid::Uuid;

use crate::Store;
use crate::error::StoreError;
use crate::ledger::{self, Operation};
use crate::models::Transaction;
use crate::wallet::{lock_wallets, set_balance};

const TRANSACTION_COLUMNS: &str =
    "id, wallet_id, kind, amount, currency, counterparty_wallet_id, created_at";

impl Store {
    /// Runs `op` in its own database transaction, replaying it from scratch
    /// on serialization failures.
    pub async fn execute(&self, owner_id: Uuid, op: Operation) -> Result<Transaction, StoreError> {
        op.validate()?;
        self.retry
            .run(move || self.try_execute(owner_id, op))
            .await
    }

    async fn try_execute(&self, owner_id: Uuid, op: Operation) -> Result<Transaction, StoreError> {
        let mut tx = self.pool.begin().await?;

        let wallets = lock_wallets(&mut tx, &op.wallet_ids()).await?;
        let posting = ledger::apply(owner_id, &op, &wallets)?;
        for change in &posting.changes {
            set_balance(&mut tx, change).await?;
        }

        let transaction = sqlx::query_as::<_, Transaction>(&format!(
            "INSERT INTO transactions (id, wallet_id, kind, amount, currency, counterparty_wallet_id) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {TRANSACTION_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(op.wallet_id())
        .bind(op.kind())
        .bind(posting.amount)
        .bind(posting.currency)
        .bind(op.counterparty_wallet_id())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        log::debug!(
            "Applied {} of {} on wallet {}",
            transaction.kind,
            transaction.amount,
            transaction.wallet_id
        );

        Ok(transaction)
    }

    pub async fn list_transactions(&self, owner_id: Uuid) -> Result<Vec<Transaction>, StoreError> {
        let transactions = sqlx::query_as::<_, Transaction>(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions \
             WHERE wallet_id IN (SELECT id FROM wallets WHERE owner_id = $1) \
                OR counterparty_wallet_id IN (SELECT id FROM wallets WHERE owner_id = $1) \
             ORDER BY created_at, id"
        ))
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(transactions)
    }
}
