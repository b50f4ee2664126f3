pub mod auth;
pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;

use std::sync::Arc;

use actix_web::error::{JsonPayloadError, UrlencodedError};
use actix_web::{HttpRequest, web};
use store::{Bank, ExchangeRate};

use crate::auth::{PasswordHasher, TokenService};
use crate::error::ApiError;
use crate::routes::*;

/// Everything the handlers need, shared across workers.
#[derive(Clone)]
pub struct AppState {
    pub bank: Arc<dyn Bank>,
    pub tokens: TokenService,
    pub hasher: PasswordHasher,
    pub rate: ExchangeRate,
}

fn json_error(err: JsonPayloadError, _: &HttpRequest) -> actix_web::Error {
    ApiError::Validation(err.to_string()).into()
}

fn form_error(err: UrlencodedError, _: &HttpRequest) -> actix_web::Error {
    ApiError::Validation(err.to_string()).into()
}

/// Registers app data, extractor error handlers and every route.
pub fn configure(state: AppState) -> impl FnOnce(&mut web::ServiceConfig) {
    move |cfg: &mut web::ServiceConfig| {
        cfg.app_data(web::Data::from(state.bank))
            .app_data(web::Data::new(state.tokens))
            .app_data(web::Data::new(state.hasher))
            .app_data(web::Data::new(state.rate))
            .app_data(web::JsonConfig::default().error_handler(json_error))
            .app_data(web::FormConfig::default().error_handler(form_error))
            .service(create_user)
            .service(login)
            .service(get_user)
            .service(list_wallets)
            .service(create_transaction)
            .service(list_transactions)
            .service(convert_currency);
    }
}
