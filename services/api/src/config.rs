//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;
use tracing::Level;

/// Shortest signing secret accepted for HS256 session tokens.
pub const MIN_TOKEN_SECRET_LEN: usize = 32;
/// Thirty days.
pub const MAX_TOKEN_TTL_MINUTES: u64 = 30 * 24 * 60;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone)]
pub struct Config {
    pub bind_address: SocketAddr,
    /// A Postgres URL, or `memory://` for the in-process store.
    pub database_url: String,
    pub db_max_connections: u32,
    /// Upper bound on every persistence call.
    pub db_timeout: Duration,
    pub log_level: Level,
    pub token_secret: String,
    pub token_ttl: Duration,
    pub cors_origin: String,
}

// The signing secret must never end up in logs.
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("bind_address", &self.bind_address)
            .field("db_max_connections", &self.db_max_connections)
            .field("db_timeout", &self.db_timeout)
            .field("log_level", &self.log_level)
            .field("token_secret", &"<redacted>")
            .field("token_ttl", &self.token_ttl)
            .field("cors_origin", &self.cors_origin)
            .finish_non_exhaustive()
    }
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_vars(&std::env::vars().collect())
    }

    /// Builds the configuration from an explicit variable map.
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let var = |name: &str| vars.get(name).cloned();

        // --- Load Server and Database Settings ---
        let bind_address_str = var("BIND_ADDRESS").unwrap_or_else(|| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let database_url =
            var("DATABASE_URL").ok_or_else(|| ConfigError::MissingVar("DATABASE_URL".to_string()))?;

        let db_max_connections = parse_or("DB_MAX_CONNECTIONS", var("DB_MAX_CONNECTIONS"), 5u32)?;
        let db_timeout = Duration::from_secs(parse_or("DB_TIMEOUT_SECS", var("DB_TIMEOUT_SECS"), 5u64)?);

        let log_level_str = var("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Load Session Token Settings ---
        let token_secret =
            var("TOKEN_SECRET").ok_or_else(|| ConfigError::MissingVar("TOKEN_SECRET".to_string()))?;
        if token_secret.len() < MIN_TOKEN_SECRET_LEN {
            return Err(ConfigError::InvalidValue(
                "TOKEN_SECRET".to_string(),
                format!("must be at least {} bytes", MIN_TOKEN_SECRET_LEN),
            ));
        }
        let ttl_minutes = parse_or("TOKEN_TTL_MINUTES", var("TOKEN_TTL_MINUTES"), 20u64)?;
        if ttl_minutes == 0 || ttl_minutes > MAX_TOKEN_TTL_MINUTES {
            return Err(ConfigError::InvalidValue(
                "TOKEN_TTL_MINUTES".to_string(),
                format!("must be between 1 and {}", MAX_TOKEN_TTL_MINUTES),
            ));
        }
        let token_ttl = ttl_minutes
            .checked_mul(60)
            .map(Duration::from_secs)
            .ok_or_else(|| {
                ConfigError::InvalidValue("TOKEN_TTL_MINUTES".to_string(), "out of range".to_string())
            })?;

        let cors_origin =
            var("CORS_ORIGIN").unwrap_or_else(|| "http://localhost:3000".to_string());

        Ok(Self {
            bind_address,
            database_url,
            db_max_connections,
            db_timeout,
            log_level,
            token_secret,
            token_ttl,
            cors_origin,
        })
    }

    pub fn uses_memory_store(&self) -> bool {
        self.database_url.starts_with("memory://")
    }
}

fn parse_or<T>(name: &str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(s) => s
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidValue(name.to_string(), e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_vars() -> HashMap<String, String> {
        HashMap::from([
            ("DATABASE_URL".to_string(), "memory://".to_string()),
            (
                "TOKEN_SECRET".to_string(),
                "0123456789abcdef0123456789abcdef".to_string(),
            ),
        ])
    }

    #[test]
    fn defaults_apply_when_optional_vars_are_absent() {
        let config = Config::from_vars(&base_vars()).unwrap();
        assert_eq!(config.bind_address.port(), 3000);
        assert_eq!(config.token_ttl, Duration::from_secs(20 * 60));
        assert_eq!(config.db_timeout, Duration::from_secs(5));
        assert_eq!(config.log_level, Level::INFO);
        assert!(config.uses_memory_store());
    }

    #[test]
    fn token_secret_is_required_and_must_be_long_enough() {
        let mut vars = base_vars();
        vars.remove("TOKEN_SECRET");
        assert!(matches!(
            Config::from_vars(&vars),
            Err(ConfigError::MissingVar(name)) if name == "TOKEN_SECRET"
        ));

        vars.insert("TOKEN_SECRET".to_string(), "short".to_string());
        assert!(matches!(
            Config::from_vars(&vars),
            Err(ConfigError::InvalidValue(name, _)) if name == "TOKEN_SECRET"
        ));
    }

    #[test]
    fn malformed_numbers_are_rejected() {
        let mut vars = base_vars();
        vars.insert("DB_TIMEOUT_SECS".to_string(), "soon".to_string());
        assert!(matches!(
            Config::from_vars(&vars),
            Err(ConfigError::InvalidValue(name, _)) if name == "DB_TIMEOUT_SECS"
        ));
    }

    #[test]
    fn token_ttl_must_be_positive_and_bounded() {
        let mut vars = base_vars();
        for bad in ["0", "43201", "1000000000000", "18446744073709551615"] {
            vars.insert("TOKEN_TTL_MINUTES".to_string(), bad.to_string());
            assert!(
                matches!(
                    Config::from_vars(&vars),
                    Err(ConfigError::InvalidValue(name, _)) if name == "TOKEN_TTL_MINUTES"
                ),
                "accepted TOKEN_TTL_MINUTES={}",
                bad
            );
        }

        vars.insert("TOKEN_TTL_MINUTES".to_string(), MAX_TOKEN_TTL_MINUTES.to_string());
        let config = Config::from_vars(&vars).unwrap();
        assert_eq!(config.token_ttl, Duration::from_secs(MAX_TOKEN_TTL_MINUTES * 60));
    }

    #[test]
    fn debug_output_hides_the_secret() {
        let config = Config::from_vars(&base_vars()).unwrap();
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("0123456789abcdef"));
    }
}
