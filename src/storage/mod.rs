//! Storage module for profile data.
//!
//! This module provides two read-only backends behind [`ProfileStore`]:
//! - `SqliteStore`: SQLite file through an sqlx pool
//! - `MemoryStore`: in-memory records, loadable from a JSON fixture

mod memory;
mod sample;
mod sql;
mod sqlite;
mod traits;

pub use memory::MemoryStore;
pub use sample::{sample_records, seed_database};
pub use sql::{is_identifier, SqlParam, SqlStatement};
pub use sqlite::SqliteStore;
pub use traits::*;

use crate::config::{Config, StorageBackendType};
use crate::error::Result;
use std::sync::Arc;
use tracing::info;

/// Create a profile store from configuration.
pub fn create_store(config: &Config) -> Result<Arc<dyn ProfileStore>> {
    match config.storage.backend {
        StorageBackendType::Sqlite => {
            let path = config.database_path();
            info!(path = %path.display(), table = %config.storage.table, "Opening SQLite store");
            let store = SqliteStore::open(
                &path,
                &config.storage.table,
                config.storage.max_connections,
                config.storage.timeout(),
            )?;
            Ok(Arc::new(store))
        }
        StorageBackendType::Memory => {
            let store = match config.fixture_path() {
                Some(path) => {
                    info!(path = %path.display(), "Loading memory store");
                    MemoryStore::from_json_file(&path)?
                }
                None => MemoryStore::new(sample_records()),
            };
            Ok(Arc::new(store))
        }
    }
}
