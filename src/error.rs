//! Error types for the session gateway.

use std::fmt;

/// Error type for engine, session and transaction operations
#[derive(Debug)]
pub enum GatewayError {
    /// Pool could not be built or a connection could not be checked out
    Pool(String),
    Database(diesel::result::Error),
    Connection(diesel::ConnectionError),
    SessionClosed,
    TransactionAlreadyActive,
    NoActiveTransaction,
    Config(ConfigError),
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GatewayError::Pool(msg) => write!(f, "Connection pool error: {}", msg),
            GatewayError::Database(e) => write!(f, "Database error: {}", e),
            GatewayError::Connection(e) => write!(f, "Connection error: {}", e),
            GatewayError::SessionClosed => write!(f, "Session is closed"),
            GatewayError::TransactionAlreadyActive => {
                write!(f, "A transaction is already active on this session")
            }
            GatewayError::NoActiveTransaction => {
                write!(f, "No active transaction on this session")
            }
            GatewayError::Config(e) => write!(f, "Configuration error: {}", e),
        }
    }
}

impl std::error::Error for GatewayError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GatewayError::Database(e) => Some(e),
            GatewayError::Connection(e) => Some(e),
            GatewayError::Config(e) => Some(e),
            _ => None,
        }
    }
}

impl From<r2d2::Error> for GatewayError {
    fn from(e: r2d2::Error) -> Self {
        GatewayError::Pool(e.to_string())
    }
}

impl From<diesel::result::Error> for GatewayError {
    fn from(e: diesel::result::Error) -> Self {
        GatewayError::Database(e)
    }
}

impl From<diesel::ConnectionError> for GatewayError {
    fn from(e: diesel::ConnectionError) -> Self {
        GatewayError::Connection(e)
    }
}

impl From<ConfigError> for GatewayError {
    fn from(e: ConfigError) -> Self {
        GatewayError::Config(e)
    }
}

/// Error type for loading settings
#[derive(Debug)]
pub enum ConfigError {
    /// A required variable or key is not set
    Missing(String),
    Invalid(String),
    Io {
        path: String,
        source: std::io::Error,
    },
    Parse(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "{} must be set", key),
            ConfigError::Invalid(msg) => write!(f, "Invalid setting: {}", msg),
            ConfigError::Io { path, source } => {
                write!(f, "Failed to read config file {}: {}", path, source)
            }
            ConfigError::Parse(msg) => write!(f, "Failed to parse YAML: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}
