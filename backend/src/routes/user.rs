use actix_web::{HttpResponse, web};
use serde::{Deserialize, Serialize};
use store::{Bank, StoreError};
use store::models::NewUser;
use uuid::Uuid;

use crate::auth::{PasswordHasher, TokenService, authenticate};
use crate::error::ApiError;
use crate::middleware::AuthenticatedUser;

const MAX_USERNAME_LEN: usize = 64;
const MIN_PASSWORD_LEN: usize = 6;

#[derive(Deserialize)]
pub struct SignUpRequest {
    pub username: String,
    pub password: String,
}

/// OAuth2 password form; `grant_type`, `scope` and client fields are ignored.
#[derive(Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
}

fn validate_username(username: &str) -> Result<String, ApiError> {
    let username = username.trim();
    if username.is_empty() || username.chars().count() > MAX_USERNAME_LEN {
        return Err(ApiError::Validation(format!(
            "Username must be between 1 and {MAX_USERNAME_LEN} characters"
        )));
    }
    if username.chars().any(char::is_whitespace) {
        return Err(ApiError::Validation(
            "Username must not contain whitespace".to_string(),
        ));
    }
    Ok(username.to_string())
}

fn validate_password(password: &str) -> Result<(), ApiError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

#[actix_web::post("/users/")]
pub async fn create_user(
    bank: web::Data<dyn Bank>,
    hasher: web::Data<PasswordHasher>,
    req: web::Json<SignUpRequest>,
) -> Result<HttpResponse, ApiError> {
    let SignUpRequest { username, password } = req.into_inner();
    let username = validate_username(&username)?;
    validate_password(&password)?;

    let password_hash = hasher.hash(password).await?;
    let user = bank
        .create_user(NewUser {
            username,
            password_hash,
        })
        .await?;

    Ok(HttpResponse::Ok().json(UserResponse {
        id: user.id,
        username: user.username,
    }))
}

#[actix_web::post("/token")]
pub async fn login(
    bank: web::Data<dyn Bank>,
    hasher: web::Data<PasswordHasher>,
    tokens: web::Data<TokenService>,
    form: web::Form<LoginForm>,
) -> Result<HttpResponse, ApiError> {
    let user = authenticate(bank.get_ref(), &hasher, form.username.trim(), &form.password).await?;
    let access_token = tokens.create_jwt(user.id)?;

    Ok(HttpResponse::Ok().json(TokenResponse {
        access_token,
        token_type: "bearer".to_string(),
    }))
}

#[actix_web::get("/users/me")]
pub async fn get_user(
    bank: web::Data<dyn Bank>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, ApiError> {
    let user = bank
        .get_user_by_id(user.id)
        .await?
        .ok_or(StoreError::UserNotFound)?;

    Ok(HttpResponse::Ok().json(UserResponse {
        id: user.id,
        username: user.username,
    }))
}
