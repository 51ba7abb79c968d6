//! Gateway settings loaded from the environment or a YAML file.
//!
//! The only required setting is `DATABASE_URL`. Pool tuning is optional and falls
//! back to the defaults of [`PoolConfig`].

use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DATABASE_URL: &str = "DATABASE_URL";
pub const DATABASE_MAX_CONNECTIONS: &str = "DATABASE_MAX_CONNECTIONS";
pub const DATABASE_MIN_IDLE: &str = "DATABASE_MIN_IDLE";
pub const DATABASE_CONNECTION_TIMEOUT_SECS: &str = "DATABASE_CONNECTION_TIMEOUT_SECS";
pub const DATABASE_IDLE_TIMEOUT_SECS: &str = "DATABASE_IDLE_TIMEOUT_SECS";
pub const DATABASE_MAX_LIFETIME_SECS: &str = "DATABASE_MAX_LIFETIME_SECS";
pub const DATABASE_TEST_ON_CHECK_OUT: &str = "DATABASE_TEST_ON_CHECK_OUT";

/// Connection pool options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub min_idle: u32,
    pub connection_timeout_secs: u64,
    pub idle_timeout_secs: u64,
    pub max_lifetime_secs: u64,
    pub test_on_check_out: bool,
}

impl Default for PoolConfig {
    fn default() -> Self {
        PoolConfig {
            max_connections: 15,          // Max connections in pool
            min_idle: 5,                  // Keep minimum idle connections
            connection_timeout_secs: 30,  // Wait up to 30s for connection
            idle_timeout_secs: 600,       // Close idle connections after 10 min
            max_lifetime_secs: 1800,      // Recycle connections after 30 min
            test_on_check_out: true,
        }
    }
}

impl PoolConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_connections == 0 {
            return Err(ConfigError::Invalid("max_connections must be greater than 0".to_string()));
        }
        if self.min_idle > self.max_connections {
            return Err(ConfigError::Invalid(format!(
                "min_idle ({}) exceeds max_connections ({})",
                self.min_idle, self.max_connections
            )));
        }
        Ok(())
    }
}

/// Everything needed to construct an engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub database_url: String,
    #[serde(default)]
    pub pool: PoolConfig,
}

impl Settings {
    pub fn new(database_url: impl Into<String>) -> Self {
        Settings {
            database_url: database_url.into(),
            pool: PoolConfig::default(),
        }
    }

    pub fn with_pool(mut self, pool: PoolConfig) -> Self {
        self.pool = pool;
        self
    }

    /// Load settings from the process environment.
    ///
    /// A `.env` file in the working directory (or a parent) is loaded first when present;
    /// variables already set in the environment take precedence over it.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup.
    ///
    /// # Errors
    /// Returns `ConfigError::Missing` when `DATABASE_URL` is absent and
    /// `ConfigError::Invalid` when an override fails to parse or the pool is inconsistent.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup(DATABASE_URL)
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty())
            .ok_or_else(|| ConfigError::Missing(DATABASE_URL.to_string()))?;

        let defaults = PoolConfig::default();
        let pool = PoolConfig {
            max_connections: parse_or(&lookup, DATABASE_MAX_CONNECTIONS, defaults.max_connections)?,
            min_idle: parse_or(&lookup, DATABASE_MIN_IDLE, defaults.min_idle)?,
            connection_timeout_secs: parse_or(
                &lookup,
                DATABASE_CONNECTION_TIMEOUT_SECS,
                defaults.connection_timeout_secs,
            )?,
            idle_timeout_secs: parse_or(&lookup, DATABASE_IDLE_TIMEOUT_SECS, defaults.idle_timeout_secs)?,
            max_lifetime_secs: parse_or(&lookup, DATABASE_MAX_LIFETIME_SECS, defaults.max_lifetime_secs)?,
            test_on_check_out: parse_or(&lookup, DATABASE_TEST_ON_CHECK_OUT, defaults.test_on_check_out)?,
        };

        let settings = Settings { database_url, pool };
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from a YAML file.
    ///
    /// # Example
    /// ```yaml
    /// database_url: ${DATABASE_URL}
    /// pool:
    ///   max_connections: 4
    ///   min_idle: 1
    /// ```
    ///
    /// A `database_url` written as `${VAR}` is resolved from the environment.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;

        Self::from_yaml_str(&contents, |key| std::env::var(key).ok())
    }

    /// Parse YAML settings, resolving `${VAR}` placeholders through `lookup`.
    pub fn from_yaml_str<F>(contents: &str, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings: Settings =
            serde_yaml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))?;

        let url = settings.database_url.trim();
        if let Some(var) = url.strip_prefix("${").and_then(|rest| rest.strip_suffix('}')) {
            settings.database_url = lookup(var).ok_or_else(|| ConfigError::Missing(var.to_string()))?;
        }

        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database_url.trim().is_empty() {
            return Err(ConfigError::Invalid("database_url is empty".to_string()));
        }
        self.pool.validate()
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| ConfigError::Invalid(format!("{}={:?}: {}", key, raw, e))),
        None => Ok(default),
    }
}
