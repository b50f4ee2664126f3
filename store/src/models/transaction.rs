use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::wallet::Currency;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "transaction_kind", rename_all = "lowercase")]
pub enum TransactionKind {
    Deposit,
    Withdrawal,
    Transfer,
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TransactionKind::Deposit => "deposit",
            TransactionKind::Withdrawal => "withdrawal",
            TransactionKind::Transfer => "transfer",
        })
    }
}

/// An entry in the append-only transaction log.
///
/// Transfers are recorded once, against the source wallet, with the
/// destination in `counterparty_wallet_id`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Transaction {
    pub id: Uuid,
    pub wallet_id: Uuid,
    pub kind: TransactionKind,
    pub amount: Decimal,
    pub currency: Currency,
    pub counterparty_wallet_id: Option<Uuid>,
    #[serde(rename = "timestamp")]
    pub created_at: DateTime<Utc>,
}
