//! Error types for the FloatChat query engine.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for FloatChat operations.
#[derive(Error, Debug)]
pub enum FloatChatError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Configuration-related errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Missing required field: {0}")]
    MissingField(String),
}

/// Errors raised at the storage boundary.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("Timeout after {0}ms")]
    Timeout(u64),

    #[error("Query error: {0}")]
    Query(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StorageError {
    /// Classify this failure into the kind surfaced to callers.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::SchemaMismatch(_) => ErrorKind::SchemaMismatch,
            Self::Unavailable(_) | Self::Timeout(_) | Self::Query(_) | Self::Io(_) => {
                ErrorKind::StorageUnavailable
            }
        }
    }
}

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::WorkerCrashed => {
                Self::Unavailable(err.to_string())
            }
            sqlx::Error::Io(e) => Self::Io(e),
            sqlx::Error::ColumnNotFound(column) => {
                Self::SchemaMismatch(format!("column not found: {column}"))
            }
            sqlx::Error::Database(db) => {
                let message = db.message().to_string();
                if message.contains("no such column") || message.contains("no such table") {
                    Self::SchemaMismatch(message)
                } else if message.contains("unable to open") || message.contains("locked") {
                    Self::Unavailable(message)
                } else {
                    Self::Query(message)
                }
            }
            other => Self::Query(other.to_string()),
        }
    }
}

/// User-visible classification of a degraded response.
///
/// `EmptyResult` is informational: the question was answered, there was just
/// nothing to report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NoIntentMatched,
    EmptyResult,
    StorageUnavailable,
    SchemaMismatch,
    /// Reported in logs and metrics for a skipped literal; never set on a
    /// response, since the rest of the question is still answered.
    InvalidNumericLiteral,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoIntentMatched => "no_intent_matched",
            Self::EmptyResult => "empty_result",
            Self::StorageUnavailable => "storage_unavailable",
            Self::SchemaMismatch => "schema_mismatch",
            Self::InvalidNumericLiteral => "invalid_numeric_literal",
        }
    }
}

/// Result type alias for FloatChat operations.
pub type Result<T> = std::result::Result<T, FloatChatError>;
