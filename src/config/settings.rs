//! Configuration settings for the FloatChat query engine.

use crate::error::{ConfigError, Result};
use crate::query::{MatchMode, TieBreak};
use crate::storage::is_identifier;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub storage: StorageConfig,
    pub query: QueryConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ConfigError::ReadFile)?;
        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from default locations or use defaults.
    pub fn load() -> Result<Self> {
        let config_paths = [
            PathBuf::from("config.toml"),
            PathBuf::from("floatchat.toml"),
            dirs::config_dir()
                .map(|p| p.join("floatchat/config.toml"))
                .unwrap_or_default(),
            dirs::home_dir()
                .map(|p| p.join(".floatchat/config.toml"))
                .unwrap_or_default(),
        ];

        for path in &config_paths {
            if path.is_file() {
                tracing::info!("Loading config from: {}", path.display());
                return Self::from_file(path);
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Config::default())
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if !is_identifier(&self.storage.table) {
            return Err(ConfigError::Invalid(format!(
                "storage.table must be a plain identifier, got {:?}",
                self.storage.table
            ))
            .into());
        }

        if self.storage.backend == StorageBackendType::Sqlite
            && self.storage.database_path.trim().is_empty()
        {
            return Err(ConfigError::MissingField("storage.database_path".to_string()).into());
        }

        if self.query.max_rows == 0 {
            return Err(ConfigError::Invalid("max_rows must be > 0".to_string()).into());
        }

        if self.query.window == 0 {
            return Err(ConfigError::Invalid("window must be > 0".to_string()).into());
        }

        if !(self.query.tolerance.is_finite() && self.query.tolerance >= 0.0) {
            return Err(ConfigError::Invalid("tolerance must be >= 0".to_string()).into());
        }

        Ok(())
    }

    /// Expand the database path.
    pub fn database_path(&self) -> PathBuf {
        expand_path(&self.storage.database_path)
    }

    /// Expand the fixture path, if any.
    pub fn fixture_path(&self) -> Option<PathBuf> {
        self.storage.fixture_path.as_deref().map(expand_path)
    }
}

fn expand_path(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).as_ref())
}

/// Storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Backend type: "sqlite" or "memory"
    pub backend: StorageBackendType,
    /// SQLite database file
    pub database_path: String,
    /// JSON array of profile records (memory backend); sample profiles if unset
    pub fixture_path: Option<String>,
    /// Profile table name
    pub table: String,
    /// Maximum pooled connections
    pub max_connections: u32,
    /// Per-query timeout in milliseconds
    pub timeout_ms: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackendType::Sqlite,
            database_path: "argo_profiles.db".to_string(),
            fixture_path: None,
            table: "profiles".to_string(),
            max_connections: 4,
            timeout_ms: 5000,
        }
    }
}

impl StorageConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Storage backend type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackendType {
    Sqlite,
    Memory,
}

/// Query pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Hard cap on returned rows
    pub max_rows: usize,
    /// Records previewed in the narrative
    pub preview_rows: usize,
    /// Token distance within which a keyword binds to a number
    pub window: usize,
    /// Half-width of the band used for "near" and bare coordinates
    pub tolerance: f64,
    pub match_mode: MatchMode,
    pub tie_break: TieBreak,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            max_rows: 1000,
            preview_rows: 5,
            window: 4,
            tolerance: 1.0,
            match_mode: MatchMode::default(),
            tie_break: TieBreak::default(),
        }
    }
}
