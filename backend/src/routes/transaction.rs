use actix_web::{HttpResponse, web};
use rust_decimal::Decimal;
use serde::Deserialize;
use store::models::{Currency, TransactionKind};
use store::{Bank, Operation, StoreError};
use uuid::Uuid;

use crate::error::ApiError;
use crate::middleware::AuthenticatedUser;

/// Body of `POST /transactions/`. The original field names
/// `transaction_type` and `recipient_wallet_id` are still accepted.
#[derive(Debug, Deserialize)]
pub struct TransactionRequest {
    #[serde(alias = "transaction_type")]
    pub kind: TransactionKind,
    pub amount: Decimal,
    /// Defaults to the caller's wallet in `currency`.
    pub wallet_id: Option<Uuid>,
    pub currency: Option<Currency>,
    #[serde(alias = "recipient_wallet_id")]
    pub counterparty_wallet_id: Option<Uuid>,
}

impl TransactionRequest {
    pub fn into_operation(self, wallet_id: Uuid) -> Result<Operation, ApiError> {
        let amount = self.amount;
        match (self.kind, self.counterparty_wallet_id) {
            (TransactionKind::Deposit, None) => Ok(Operation::Deposit { wallet_id, amount }),
            (TransactionKind::Withdrawal, None) => Ok(Operation::Withdrawal { wallet_id, amount }),
            (TransactionKind::Transfer, Some(destination)) => Ok(Operation::Transfer {
                source: wallet_id,
                destination,
                amount,
            }),
            (TransactionKind::Transfer, None) => Err(ApiError::Validation(
                "counterparty_wallet_id is required for transfers".to_string(),
            )),
            (kind, Some(_)) => Err(ApiError::Validation(format!(
                "counterparty_wallet_id is not allowed for {kind}"
            ))),
        }
    }
}

#[actix_web::post("/transactions/")]
pub async fn create_transaction(
    bank: web::Data<dyn Bank>,
    user: AuthenticatedUser,
    req: web::Json<TransactionRequest>,
) -> Result<HttpResponse, ApiError> {
    let req = req.into_inner();
    let wallet_id = match req.wallet_id {
        Some(id) => id,
        None => {
            let currency = req.currency.unwrap_or_default();
            bank.find_wallet(user.id, currency)
                .await?
                .ok_or(StoreError::NoWallet(currency))?
                .id
        }
    };

    let transaction = bank.execute(user.id, req.into_operation(wallet_id)?).await?;
    Ok(HttpResponse::Ok().json(transaction))
}

#[actix_web::get("/transactions/")]
pub async fn list_transactions(
    bank: web::Data<dyn Bank>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, ApiError> {
    let transactions = bank.list_transactions(user.id).await?;
    Ok(HttpResponse::Ok().json(transactions))
}
