use actix_web::web;
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use store::Bank;
use store::models::User;
use uuid::Uuid;

use crate::error::ApiError;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub iat: i64,
    pub exp: i64,
}

/// Issues and validates HS256 bearer tokens.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenService {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl,
        }
    }

    pub fn create_jwt(&self, user_id: Uuid) -> Result<String, ApiError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id,
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding).map_err(|e| {
            log::error!("Failed to sign token: {e}");
            ApiError::Internal(e.to_string())
        })
    }

    pub fn decode_jwt(&self, token: &str) -> Result<Claims, ApiError> {
        decode::<Claims>(token, &self.decoding, &Validation::new(Algorithm::HS256))
            .map(|data| data.claims)
            .map_err(|e| {
                log::debug!("Rejected bearer token: {e}");
                ApiError::Unauthorized
            })
    }
}

/// bcrypt hashing, run on the blocking thread pool.
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new(bcrypt::DEFAULT_COST)
    }
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    pub async fn hash(&self, password: String) -> Result<String, ApiError> {
        let cost = self.cost;
        web::block(move || bcrypt::hash(password, cost))
            .await?
            .map_err(|e| {
                log::error!("Password hashing failed: {e}");
                ApiError::Internal(e.to_string())
            })
    }

    /// A malformed stored hash counts as a mismatch.
    pub async fn verify(&self, password: String, hash: String) -> Result<bool, ApiError> {
        Ok(web::block(move || bcrypt::verify(password, &hash))
            .await?
            .unwrap_or(false))
    }
}

/// Resolves username/password credentials to a user.
pub async fn authenticate(
    bank: &dyn Bank,
    hasher: &PasswordHasher,
    username: &str,
    password: &str,
) -> Result<User, ApiError> {
    let user = bank
        .get_user_by_username(username)
        .await?
        .ok_or(ApiError::InvalidCredentials)?;

    if hasher
        .verify(password.to_owned(), user.password_hash.clone())
        .await?
    {
        Ok(user)
    } else {
        Err(ApiError::InvalidCredentials)
    }
}

#[cfg(test)]
mod tests {
    use store::MemoryStore;
    use store::models::NewUser;

    use super::*;

    fn tokens() -> TokenService {
        TokenService::new(b"unit-test-secret", Duration::minutes(30))
    }

    #[test]
    fn token_round_trip() {
        let tokens = tokens();
        let user_id = Uuid::new_v4();
        let token = tokens.create_jwt(user_id).unwrap();
        let claims = tokens.decode_jwt(&token).unwrap();
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.exp - claims.iat, 30 * 60);
    }

    #[test]
    fn rejects_foreign_and_expired_tokens() {
        let token = TokenService::new(b"someone-else", Duration::minutes(30))
            .create_jwt(Uuid::new_v4())
            .unwrap();
        assert!(matches!(
            tokens().decode_jwt(&token),
            Err(ApiError::Unauthorized)
        ));

        let expired = TokenService::new(b"unit-test-secret", Duration::hours(-2))
            .create_jwt(Uuid::new_v4())
            .unwrap();
        assert!(matches!(
            tokens().decode_jwt(&expired),
            Err(ApiError::Unauthorized)
        ));

        assert!(tokens().decode_jwt("not-a-token").is_err());
    }

    #[actix_web::test]
    async fn authenticate_checks_password() {
        let hasher = PasswordHasher::new(4);
        let bank = MemoryStore::default();
        let password_hash = hasher.hash("hunter22".to_string()).await.unwrap();
        bank.create_user(NewUser {
            username: "alice".to_string(),
            password_hash,
        })
        .await
        .unwrap();

        let user = authenticate(&bank, &hasher, "alice", "hunter22").await.unwrap();
        assert_eq!(user.username, "alice");

        assert!(matches!(
            authenticate(&bank, &hasher, "alice", "wrong").await,
            Err(ApiError::InvalidCredentials)
        ));
        assert!(matches!(
            authenticate(&bank, &hasher, "nobody", "hunter22").await,
            Err(ApiError::InvalidCredentials)
        ));
    }
}
