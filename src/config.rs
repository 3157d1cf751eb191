use std::{env, fmt::Display, net::IpAddr, path::PathBuf, str::FromStr};

use log::{info, warn};
use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum ConfigError {
    #[error("Environment variable {0} must be set")]
    Missing(&'static str),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub host: IpAddr,
    pub port: u16,
    pub database_max_connections: u32,
    pub jwt_secret: String,
    pub session_lifetime_hours: i64,
    pub ingredients_file: Option<PathBuf>,
}

impl Config {
    /// Reads the process environment, after merging `.env` when present.
    pub fn load() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        Ok(Self {
            database_url: require("DATABASE_URL")?,
            host: try_load("HOST", IpAddr::from([0, 0, 0, 0])),
            port: try_load("PORT", 8080),
            database_max_connections: try_load("DATABASE_MAX_CONNECTIONS", 5),
            jwt_secret: require("JWT_SECRET")?,
            session_lifetime_hours: try_load("SESSION_LIFETIME_HOURS", 24),
            ingredients_file: var("INGREDIENTS_FILE").map(PathBuf::from),
        })
    }
}

fn var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn require(key: &'static str) -> Result<String, ConfigError> {
    var(key).ok_or(ConfigError::Missing(key))
}

/// Parses `key`, falling back to `default` when it is unset or malformed.
fn try_load<T: FromStr + Display>(key: &str, default: T) -> T
where
    T::Err: Display,
{
    parse_or_default(key, var(key), default)
}

fn parse_or_default<T: FromStr + Display>(key: &str, value: Option<String>, default: T) -> T
where
    T::Err: Display,
{
    let Some(value) = value else {
        info!("{key} not set, using default: {default}");
        return default;
    };

    value.trim().parse().unwrap_or_else(|e| {
        warn!("Invalid {key} value {value:?}: {e}; using default: {default}");
        default
    })
}
