//! In-process storage used for local development and tests.
//!
//! Every operation takes the same async mutex, so ledger operations are
//! trivially serializable.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::bank::Bank;
use crate::error::StoreError;
use crate::ledger::{self, Operation};
use crate::models::{Currency, NewUser, Transaction, User, Wallet};

#[derive(Default)]
struct State {
    users: HashMap<Uuid, User>,
    wallets: HashMap<Uuid, Wallet>,
    transactions: Vec<Transaction>,
}

impl State {
    fn wallets_of(&self, owner_id: Uuid) -> impl Iterator<Item = &Wallet> {
        self.wallets.values().filter(move |w| w.owner_id == owner_id)
    }
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

#[async_trait]
impl Bank for MemoryStore {
    async fn create_user(&self, new_user: NewUser) -> Result<User, StoreError> {
        let mut state = self.state.lock().await;
        if state
            .users
            .values()
            .any(|u| u.username == new_user.username)
        {
            return Err(StoreError::UsernameTaken);
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            username: new_user.username,
            password_hash: new_user.password_hash,
            created_at: now,
        };
        for currency in Currency::ALL {
            let wallet = Wallet {
                id: Uuid::new_v4(),
                owner_id: user.id,
                currency,
                balance: ledger::at_scale(Decimal::ZERO),
                created_at: now,
                updated_at: now,
            };
            state.wallets.insert(wallet.id, wallet);
        }
        state.users.insert(user.id, user.clone());

        Ok(user)
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn get_user_by_id(&self, user_id: Uuid) -> Result<Option<User>, StoreError> {
        let state = self.state.lock().await;
        Ok(state.users.get(&user_id).cloned())
    }

    async fn list_wallets(&self, owner_id: Uuid) -> Result<Vec<Wallet>, StoreError> {
        let state = self.state.lock().await;
        let mut wallets: Vec<Wallet> = state.wallets_of(owner_id).cloned().collect();
        wallets.sort_by_key(|w| (w.created_at, w.id));
        Ok(wallets)
    }

    async fn find_wallet(
        &self,
        owner_id: Uuid,
        currency: Currency,
    ) -> Result<Option<Wallet>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .wallets_of(owner_id)
            .find(|w| w.currency == currency)
            .cloned())
    }

    async fn execute(&self, owner_id: Uuid, op: Operation) -> Result<Transaction, StoreError> {
        let mut state = self.state.lock().await;

        let wallets: Vec<Wallet> = op
            .wallet_ids()
            .iter()
            .filter_map(|id| state.wallets.get(id).cloned())
            .collect();
        let posting = ledger::apply(owner_id, &op, &wallets)?;

        let now = Utc::now();
        for change in &posting.changes {
            if let Some(wallet) = state.wallets.get_mut(&change.wallet_id) {
                wallet.balance = change.balance;
                wallet.updated_at = now;
            }
        }

        let transaction = Transaction {
            id: Uuid::new_v4(),
            wallet_id: op.wallet_id(),
            kind: op.kind(),
            amount: posting.amount,
            currency: posting.currency,
            counterparty_wallet_id: op.counterparty_wallet_id(),
            created_at: now,
        };
        state.transactions.push(transaction.clone());

        Ok(transaction)
    }

    async fn list_transactions(&self, owner_id: Uuid) -> Result<Vec<Transaction>, StoreError> {
        let state = self.state.lock().await;
        let owned: HashSet<Uuid> = state.wallets_of(owner_id).map(|w| w.id).collect();
        Ok(state
            .transactions
            .iter()
            .filter(|t| {
                owned.contains(&t.wallet_id)
                    || t.counterparty_wallet_id.is_some_and(|id| owned.contains(&id))
            })
            .cloned()
            .collect())
    }
}
