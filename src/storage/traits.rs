//! Storage trait definitions.

use async_trait::async_trait;

use crate::error::StorageError;
use crate::query::{QueryResult, QuerySpec};

/// Read-only access to the profile table.
///
/// Implementations are shared across concurrent requests and must never
/// mutate the data they serve.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Run a query.
    async fn execute(&self, spec: &QuerySpec) -> Result<QueryResult, StorageError>;

    /// Short backend name for logs.
    fn backend_name(&self) -> &'static str;
}
