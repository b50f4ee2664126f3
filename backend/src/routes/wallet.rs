use actix_web::{HttpResponse, web};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use store::Bank;
use store::models::Currency;
use uuid::Uuid;

use crate::error::ApiError;
use crate::middleware::AuthenticatedUser;

#[derive(Debug, Serialize, Deserialize)]
pub struct WalletResponse {
    pub id: Uuid,
    pub currency: Currency,
    pub balance: Decimal,
}

#[actix_web::get("/wallets/")]
pub async fn list_wallets(
    bank: web::Data<dyn Bank>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, ApiError> {
    let wallets: Vec<WalletResponse> = bank
        .list_wallets(user.id)
        .await?
        .into_iter()
        .map(|w| WalletResponse {
            id: w.id,
            currency: w.currency,
            balance: w.balance,
        })
        .collect();

    Ok(HttpResponse::Ok().json(wallets))
}
