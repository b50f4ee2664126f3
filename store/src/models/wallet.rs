use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "currency")]
pub enum Currency {
    #[default]
    #[serde(rename = "USDT")]
    #[sqlx(rename = "USDT")]
    Usdt,
}

impl Currency {
    pub const ALL: [Currency; 1] = [Currency::Usdt];

    pub fn code(&self) -> &'static str {
        match self {
            Currency::Usdt => "USDT",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Wallet {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub currency: Currency,
    pub balance: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
