use actix_web::{HttpResponse, web};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use store::{Bank, ExchangeRate, conversion};

use crate::error::ApiError;
use crate::middleware::AuthenticatedUser;

#[derive(Deserialize)]
pub struct ConversionRequest {
    pub amount_uzs: Decimal,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ConversionResponse {
    pub uzs_amount: Decimal,
    pub usdt_amount: Decimal,
}

#[actix_web::post("/convert/uzs_to_usdt/")]
pub async fn convert_currency(
    bank: web::Data<dyn Bank>,
    rate: web::Data<ExchangeRate>,
    user: AuthenticatedUser,
    req: web::Json<ConversionRequest>,
) -> Result<HttpResponse, ApiError> {
    let conversion =
        conversion::convert_uzs_to_usdt(bank.get_ref(), &rate, user.id, req.amount_uzs).await?;

    Ok(HttpResponse::Ok().json(ConversionResponse {
        uzs_amount: conversion.uzs_amount,
        usdt_amount: conversion.usdt_amount,
    }))
}
