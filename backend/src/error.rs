use actix_web::error::BlockingError;
use actix_web::http::{StatusCode, header};
use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;
use store::{LedgerError, StoreError};
use thiserror::Error;

/// Errors surfaced to HTTP clients as `{"detail": "..."}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("Could not validate credentials")]
    Unauthorized,
    #[error("Incorrect username or password")]
    InvalidCredentials,
    #[error("Insufficient balance")]
    InsufficientFunds,
    #[error("{0}")]
    InvalidTransfer(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    // details are logged, not returned
    #[error("Internal server error")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody {
    detail: String,
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Unauthorized | ApiError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ApiError::InsufficientFunds | ApiError::InvalidTransfer(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let mut response = HttpResponse::build(self.status_code());
        if self.status_code() == StatusCode::UNAUTHORIZED {
            response.insert_header((header::WWW_AUTHENTICATE, "Bearer"));
        }
        response.json(ErrorBody {
            detail: self.to_string(),
        })
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match &err {
            StoreError::UsernameTaken => ApiError::Conflict(err.to_string()),
            StoreError::UserNotFound | StoreError::NoWallet(_) => {
                ApiError::NotFound(err.to_string())
            }
            StoreError::Ledger(ledger) => match ledger {
                LedgerError::NonPositiveAmount
                | LedgerError::TooPrecise
                | LedgerError::AmountTooLarge
                | LedgerError::BalanceLimitExceeded => ApiError::Validation(ledger.to_string()),
                LedgerError::InsufficientFunds => ApiError::InsufficientFunds,
                LedgerError::SameWallet | LedgerError::CurrencyMismatch { .. } => {
                    ApiError::InvalidTransfer(ledger.to_string())
                }
                LedgerError::WalletNotFound(_) => ApiError::NotFound(ledger.to_string()),
            },
            StoreError::Conversion(conversion) => ApiError::Validation(conversion.to_string()),
            StoreError::Database(_) | StoreError::Migration(_) => {
                log::error!("Storage failure: {err}");
                ApiError::Internal(err.to_string())
            }
        }
    }
}

impl From<BlockingError> for ApiError {
    fn from(err: BlockingError) -> Self {
        log::error!("Blocking task failed: {err}");
        ApiError::Internal(err.to_string())
    }
}
