//! Database configuration
//!
//! Settings for [`PostgresExecutor::connect`](crate::backends::PostgresExecutor::connect),
//! loadable from serde sources or the process environment.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{ModelError, ModelResult};

/// Connection pool configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub min_connections: u32,
    /// Seconds to wait for a connection
    pub acquire_timeout: u64,
    pub idle_timeout: Option<u64>,
    pub max_lifetime: Option<u64>,
    pub test_before_acquire: bool,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: 10,
            min_connections: 1,
            acquire_timeout: 30,
            idle_timeout: Some(600),
            max_lifetime: Some(1800),
            test_before_acquire: true,
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub database_url: String,
    #[serde(default)]
    pub pool: PoolConfig,
    /// Log every statement at debug level
    #[serde(default)]
    pub log_statements: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            database_url: "postgresql://localhost/elif".to_string(),
            pool: PoolConfig::default(),
            log_statements: false,
        }
    }
}

impl DatabaseConfig {
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            ..Self::default()
        }
    }

    /// Load from `DATABASE_URL` and the optional `DB_*` overrides
    pub fn from_env() -> ModelResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> ModelResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL")
            .ok_or_else(|| ModelError::Configuration("DATABASE_URL is not set".to_string()))?;

        let mut config = Self::new(database_url);

        if let Some(value) = lookup("DB_MAX_CONNECTIONS") {
            config.pool.max_connections = parse_setting("DB_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = lookup("DB_MIN_CONNECTIONS") {
            config.pool.min_connections = parse_setting("DB_MIN_CONNECTIONS", &value)?;
        }
        if let Some(value) = lookup("DB_ACQUIRE_TIMEOUT") {
            config.pool.acquire_timeout = parse_setting("DB_ACQUIRE_TIMEOUT", &value)?;
        }
        if let Some(value) = lookup("DB_LOG_STATEMENTS") {
            config.log_statements = matches!(value.to_lowercase().as_str(), "1" | "true" | "yes" | "on");
        }

        config.validate()?;
        Ok(config)
    }

    /// Check the URL scheme and pool bounds
    pub fn validate(&self) -> ModelResult<()> {
        let url = Url::parse(&self.database_url)
            .map_err(|e| ModelError::Configuration(format!("Invalid database URL: {}", e)))?;

        if !matches!(url.scheme(), "postgres" | "postgresql") {
            return Err(ModelError::Configuration(format!(
                "Unsupported database scheme '{}'",
                url.scheme()
            )));
        }

        if self.pool.max_connections == 0 {
            return Err(ModelError::Configuration(
                "max_connections must be greater than zero".to_string(),
            ));
        }

        if self.pool.min_connections > self.pool.max_connections {
            return Err(ModelError::Configuration(format!(
                "min_connections ({}) exceeds max_connections ({})",
                self.pool.min_connections, self.pool.max_connections
            )));
        }

        Ok(())
    }
}

fn parse_setting<T: std::str::FromStr>(key: &str, value: &str) -> ModelResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| ModelError::Configuration(format!("{} has invalid value '{}'", key, value)))
}
