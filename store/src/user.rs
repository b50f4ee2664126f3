use crate::Store;
use crate::error::StoreError;
use crate::models::{Currency, NewUser, User};
use uuid::Uuid;

const USER_COLUMNS: &str = "id, username, password_hash, created_at";

fn username_conflict(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            return StoreError::UsernameTaken;
        }
    }
    StoreError::Database(err)
}

impl Store {
    pub async fn create_user(&self, new_user: NewUser) -> Result<User, StoreError> {
        if self.get_user_by_username(&new_user.username).await?.is_some() {
            return Err(StoreError::UsernameTaken);
        }

        let mut tx = self.pool.begin().await?;

        let user = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (id, username, password_hash) VALUES ($1, $2, $3) RETURNING {USER_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(&new_user.username)
        .bind(&new_user.password_hash)
        .fetch_one(&mut *tx)
        .await
        .map_err(username_conflict)?;

        for currency in Currency::ALL {
            sqlx::query("INSERT INTO wallets (id, owner_id, currency) VALUES ($1, $2, $3)")
                .bind(Uuid::new_v4())
                .bind(user.id)
                .bind(currency)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        log::info!("Registered user {} ({})", user.username, user.id);

        Ok(user)
    }

    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    pub async fn get_user_by_id(&self, user_id: Uuid) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }
}
