//! In-memory profile store.
//!
//! Evaluates a [`QuerySpec`] over a vector of records with the same
//! semantics as the SQL backend: NULL never satisfies a constraint, NULLs
//! sort first ascending and last descending, ties fall back to `id`.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::path::Path;

use async_trait::async_trait;
use tracing::debug;

use super::traits::ProfileStore;
use crate::error::StorageError;
use crate::query::{
    Aggregates, ColumnStats, ProfileRecord, QueryResult, QueryShape, QuerySpec,
    SortDirection,
};

/// Profile store backed by a `Vec<ProfileRecord>`.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    records: Vec<ProfileRecord>,
}

impl MemoryStore {
    pub fn new(records: Vec<ProfileRecord>) -> Self {
        Self { records }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Load records from a JSON array file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            StorageError::Unavailable(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, StorageError> {
        let records: Vec<ProfileRecord> = serde_json::from_str(content)
            .map_err(|e| StorageError::SchemaMismatch(format!("invalid fixture: {e}")))?;
        Ok(Self::new(records))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn matching<'a>(&'a self, spec: &'a QuerySpec) -> impl Iterator<Item = &'a ProfileRecord> + 'a {
        self.records.iter().filter(move |record| {
            spec.required.iter().all(|&c| !record.is_null(c))
                && spec
                    .constraints
                    .iter()
                    .all(|c| c.matches(record.value(c.column)))
        })
    }
}

#[async_trait]
impl ProfileStore for MemoryStore {
    async fn execute(&self, spec: &QuerySpec) -> Result<QueryResult, StorageError> {
        let result = match &spec.shape {
            QueryShape::Rows { projection } => {
                let mut rows: Vec<&ProfileRecord> = self.matching(spec).collect();
                rows.sort_by(|a, b| {
                    let primary = match spec.order {
                        Some(order) => {
                            let ord = compare_nullable(a.value(order.column), b.value(order.column));
                            match order.direction {
                                SortDirection::Asc => ord,
                                SortDirection::Desc => ord.reverse(),
                            }
                        }
                        None => Ordering::Equal,
                    };
                    primary.then(a.id.cmp(&b.id))
                });
                rows.truncate(spec.limit);
                QueryResult::Rows(rows.into_iter().map(|r| r.project(projection)).collect())
            }
            QueryShape::Count => QueryResult::Count(self.matching(spec).count() as u64),
            QueryShape::Aggregate { columns } => {
                let rows: Vec<&ProfileRecord> = self.matching(spec).collect();
                let locations: HashSet<(u64, u64)> = rows
                    .iter()
                    .filter_map(|r| Some((r.latitude?.to_bits(), r.longitude?.to_bits())))
                    .collect();
                QueryResult::Aggregates(Aggregates {
                    total: rows.len() as u64,
                    unique_locations: locations.len() as u64,
                    columns: columns
                        .iter()
                        .map(|&c| ColumnStats::from_values(c, rows.iter().map(|r| r.value(c))))
                        .collect(),
                })
            }
        };

        debug!(records = self.records.len(), "Evaluated query in memory");
        Ok(result)
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

/// SQLite ordering of nullable reals: NULL is smaller than any value.
fn compare_nullable(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
    }
}

// ============================================================================
// Tests
// ============================================================================
