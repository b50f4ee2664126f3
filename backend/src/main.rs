use std::io;
use std::sync::Arc;

use actix_web::middleware::Logger;
use actix_web::{App, HttpServer};
use backend::AppState;
use backend::auth::{PasswordHasher, TokenService};
use backend::config::Config;
use dotenv::dotenv;
use env_logger::Env;
use sqlx::postgres::PgPoolOptions;
use store::{Bank, MemoryStore, RetryPolicy, Store};

fn to_io(err: impl std::fmt::Display) -> io::Error {
    io::Error::other(err.to_string())
}

async fn connect(config: &Config) -> io::Result<Arc<dyn Bank>> {
    let Some(database_url) = &config.database_url else {
        log::warn!("DATABASE_URL is not set, using the in-memory store");
        return Ok(Arc::new(MemoryStore::default()));
    };

    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(database_url)
        .await
        .map_err(to_io)?;
    let store = Store::new(pool).with_retry_policy(RetryPolicy::new(config.db_max_retries));
    store.migrate().await.map_err(to_io)?;
    log::info!("Connected to Postgres, migrations applied");

    Ok(Arc::new(store))
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv().ok();
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = Config::from_env().map_err(to_io)?;
    let state = AppState {
        bank: connect(&config).await?,
        tokens: TokenService::new(config.jwt_secret.as_bytes(), config.token_ttl),
        hasher: PasswordHasher::new(config.bcrypt_cost),
        rate: config.exchange_rate,
    };

    log::info!(
        "Listening on {} (1 USDT = {} UZS)",
        config.bind_address,
        config.exchange_rate.uzs_per_usdt()
    );
    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .configure(backend::configure(state.clone()))
    })
    .bind(&config.bind_address)?
    .run()
    .await
}
