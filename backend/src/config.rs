use std::env;
use std::str::FromStr;

use chrono::Duration;
use rust_decimal::Decimal;
use store::ExchangeRate;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} has an invalid value: {value:?}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Clone)]
pub struct Config {
    /// `None` selects the in-memory store.
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub db_max_retries: u32,
    pub jwt_secret: String,
    pub token_ttl: Duration,
    pub bcrypt_cost: u32,
    pub exchange_rate: ExchangeRate,
    pub bind_address: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let jwt_secret = lookup("JWT_SECRET")
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::Missing("JWT_SECRET"))?;

        let token_ttl_minutes: i64 = parse(&lookup, "TOKEN_TTL_MINUTES", 30)?;
        if token_ttl_minutes <= 0 {
            return Err(invalid("TOKEN_TTL_MINUTES", token_ttl_minutes));
        }

        let bcrypt_cost: u32 = parse(&lookup, "BCRYPT_COST", bcrypt::DEFAULT_COST)?;
        if !(4..=31).contains(&bcrypt_cost) {
            return Err(invalid("BCRYPT_COST", bcrypt_cost));
        }

        let uzs_per_usdt: Decimal = parse(&lookup, "UZS_PER_USDT", Decimal::from(12_700))?;
        let exchange_rate =
            ExchangeRate::new(uzs_per_usdt).map_err(|_| invalid("UZS_PER_USDT", uzs_per_usdt))?;

        Ok(Self {
            database_url: lookup("DATABASE_URL").filter(|s| !s.is_empty()),
            db_max_connections: parse(&lookup, "DB_MAX_CONNECTIONS", 10)?,
            db_max_retries: parse(&lookup, "DB_MAX_RETRIES", 5)?,
            jwt_secret,
            token_ttl: Duration::minutes(token_ttl_minutes),
            bcrypt_cost,
            exchange_rate,
            bind_address: lookup("BIND_ADDRESS").unwrap_or_else(|| "127.0.0.1:8080".to_string()),
        })
    }
}

fn invalid(name: &'static str, value: impl ToString) -> ConfigError {
    ConfigError::Invalid {
        name,
        value: value.to_string(),
    }
}

fn parse<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(name) {
        Some(value) => value.trim().parse().map_err(|_| invalid(name, &value)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let config = config(&[("JWT_SECRET", "secret")]).unwrap();
        assert!(config.database_url.is_none());
        assert_eq!(config.token_ttl, Duration::minutes(30));
        assert_eq!(config.bcrypt_cost, bcrypt::DEFAULT_COST);
        assert_eq!(config.exchange_rate, ExchangeRate::default());
        assert_eq!(config.db_max_retries, 5);
        assert_eq!(config.bind_address, "127.0.0.1:8080");
    }

    #[test]
    fn overrides() {
        let config = config(&[
            ("JWT_SECRET", "secret"),
            ("DATABASE_URL", "postgres://localhost/bank"),
            ("TOKEN_TTL_MINUTES", "5"),
            ("UZS_PER_USDT", "12500.5"),
            ("BCRYPT_COST", "6"),
        ])
        .unwrap();
        assert_eq!(
            config.database_url.as_deref(),
            Some("postgres://localhost/bank")
        );
        assert_eq!(config.token_ttl, Duration::minutes(5));
        assert_eq!(config.bcrypt_cost, 6);
        assert_eq!(
            config.exchange_rate.uzs_per_usdt(),
            Decimal::from_str("12500.5").unwrap()
        );
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            config(&[]),
            Err(ConfigError::Missing("JWT_SECRET"))
        ));
        assert!(matches!(
            config(&[("JWT_SECRET", "s"), ("UZS_PER_USDT", "0")]),
            Err(ConfigError::Invalid {
                name: "UZS_PER_USDT",
                ..
            })
        ));
        assert!(matches!(
            config(&[("JWT_SECRET", "s"), ("TOKEN_TTL_MINUTES", "soon")]),
            Err(ConfigError::Invalid {
                name: "TOKEN_TTL_MINUTES",
                ..
            })
        ));
        assert!(matches!(
            config(&[("JWT_SECRET", "s"), ("BCRYPT_COST", "2")]),
            Err(ConfigError::Invalid {
                name: "BCRYPT_COST",
                ..
            })
        ));
    }
}
