//! SQLite-backed profile store.
//!
//! Opens the database read-only through an sqlx pool. The pool connects
//! lazily, so an unreachable file surfaces per request as
//! [`StorageError::Unavailable`] instead of failing startup.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use tokio::sync::OnceCell;
use tracing::{debug, instrument};

use super::sql::{alias, is_identifier, SqlParam, SqlStatement};
use super::traits::ProfileStore;
use crate::error::StorageError;
use crate::query::{
    Aggregates, Column, ColumnStats, QueryResult, QueryShape, QuerySpec, RecordProjection,
};

/// Profile store over a SQLite file.
pub struct SqliteStore {
    pool: SqlitePool,
    table: String,
    path: PathBuf,
    columns: OnceCell<Vec<Column>>,
}

impl SqliteStore {
    /// Create a store for the database at `path`. No connection is made yet.
    pub fn open(
        path: impl AsRef<Path>,
        table: &str,
        max_connections: u32,
        acquire_timeout: Duration,
    ) -> Result<Self, StorageError> {
        if !is_identifier(table) {
            return Err(StorageError::Query(format!("invalid table name: {table:?}")));
        }

        let path = path.as_ref().to_path_buf();
        let options = SqliteConnectOptions::new()
            .filename(&path)
            .read_only(true)
            .create_if_missing(false);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .acquire_timeout(acquire_timeout)
            .connect_lazy_with(options);

        Ok(Self {
            pool,
            table: table.to_string(),
            path,
            columns: OnceCell::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check that the table exists and carries the core columns, and return
    /// the known columns it has.
    ///
    /// Only a successful check is cached, so a database that appears later
    /// is picked up on the next request.
    pub async fn verify_schema(&self) -> Result<&[Column], StorageError> {
        self.columns
            .get_or_try_init(|| async {
                let rows = sqlx::query(&format!("PRAGMA table_info({})", self.table))
                    .fetch_all(&self.pool)
                    .await?;
                if rows.is_empty() {
                    return Err(StorageError::SchemaMismatch(format!(
                        "table {} not found",
                        self.table
                    )));
                }

                let names: Vec<String> = rows
                    .iter()
                    .map(|row| row.try_get::<String, _>("name").map(|n| n.to_uppercase()))
                    .collect::<Result<_, _>>()?;
                let present: Vec<Column> = Column::ALL
                    .into_iter()
                    .filter(|c| names.iter().any(|n| n == &c.sql_name().to_uppercase()))
                    .collect();

                ensure_columns(&self.table, &present, &Column::CORE)?;
                debug!(table = %self.table, columns = present.len(), "Schema verified");
                Ok(present)
            })
            .await
            .map(Vec::as_slice)
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl ProfileStore for SqliteStore {
    #[instrument(skip(self, spec), fields(table = %self.table))]
    async fn execute(&self, spec: &QuerySpec) -> Result<QueryResult, StorageError> {
        let present = self.verify_schema().await?;
        ensure_columns(&self.table, present, &spec.referenced_columns())?;

        // Optional columns the table lacks are left out and read as null.
        let spec = match &spec.shape {
            QueryShape::Rows { projection } => {
                let mut trimmed = spec.clone();
                trimmed.shape = QueryShape::Rows {
                    projection: projection
                        .iter()
                        .copied()
                        .filter(|c| present.contains(c))
                        .collect(),
                };
                trimmed
            }
            _ => spec.clone(),
        };

        let stmt = SqlStatement::render(&spec, &self.table)?;
        debug!(sql = %stmt.sql, params = stmt.params.len(), "Executing query");

        let mut query = sqlx::query(&stmt.sql);
        for param in &stmt.params {
            query = match *param {
                SqlParam::Real(v) => query.bind(v),
                SqlParam::Integer(v) => query.bind(v),
            };
        }

        match &spec.shape {
            QueryShape::Rows { projection } => {
                let rows = query.fetch_all(&self.pool).await?;
                let records = rows
                    .iter()
                    .map(|row| decode_record(row, projection))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(QueryResult::Rows(records))
            }
            QueryShape::Count => {
                let row = query.fetch_one(&self.pool).await?;
                Ok(QueryResult::Count(count(&row, "total")?))
            }
            QueryShape::Aggregate { columns } => {
                let row = query.fetch_one(&self.pool).await?;
                let stats = columns
                    .iter()
                    .map(|&column| {
                        Ok(ColumnStats {
                            column,
                            min: row.try_get(alias("min", column).as_str())?,
                            max: row.try_get(alias("max", column).as_str())?,
                            avg: row.try_get(alias("avg", column).as_str())?,
                        })
                    })
                    .collect::<Result<Vec<_>, sqlx::Error>>()?;
                Ok(QueryResult::Aggregates(Aggregates {
                    total: count(&row, "total")?,
                    unique_locations: count(&row, "unique_locations")?,
                    columns: stats,
                }))
            }
        }
    }

    fn backend_name(&self) -> &'static str {
        "sqlite"
    }
}

fn ensure_columns(table: &str, present: &[Column], needed: &[Column]) -> Result<(), StorageError> {
    let missing: Vec<&str> = needed
        .iter()
        .filter(|c| !present.contains(c))
        .map(|c| c.sql_name())
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(StorageError::SchemaMismatch(format!(
            "table {table} is missing columns: {}",
            missing.join(", ")
        )))
    }
}

fn count(row: &SqliteRow, name: &str) -> Result<u64, sqlx::Error> {
    let n: i64 = row.try_get(name)?;
    Ok(n.max(0) as u64)
}

fn decode_record(row: &SqliteRow, projection: &[Column]) -> Result<RecordProjection, sqlx::Error> {
    let mut out = RecordProjection::default();
    for &column in projection {
        let name = column.sql_name();
        match column {
            Column::Id => out.id = row.try_get(name)?,
            Column::ProfileNumber => out.profile_number = row.try_get(name)?,
            Column::LevelCount => out.level_count = row.try_get(name)?,
            Column::Juld => out.juld = row.try_get(name)?,
            Column::Latitude => out.latitude = row.try_get(name)?,
            Column::Longitude => out.longitude = row.try_get(name)?,
            Column::Pres => out.pressure = row.try_get(name)?,
            Column::Temp => out.temperature = row.try_get(name)?,
            Column::Psal => out.salinity = row.try_get(name)?,
            Column::PresAdjusted => out.pressure_adjusted = row.try_get(name)?,
            Column::TempAdjusted => out.temperature_adjusted = row.try_get(name)?,
            Column::PsalAdjusted => out.salinity_adjusted = row.try_get(name)?,
            Column::SourceFile => out.source_file = row.try_get(name)?,
        }
    }
    Ok(out)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{Constraint, OrderBy, SortDirection};
    use crate::storage::sample::{sample_records, seed_database};
    use tempfile::TempDir;

    async fn seeded_store() -> (TempDir, SqliteStore) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("argo.db");
        seed_database(&path, "profiles", &sample_records()).await.unwrap();
        let store = SqliteStore::open(&path, "profiles", 2, Duration::from_secs(2)).unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn test_rows_ordered_and_limited() {
        let (_dir, store) = seeded_store().await;
        let spec = QuerySpec::rows(Column::ALL.to_vec(), 2)
            .with_required(vec![Column::Temp])
            .with_order(Some(OrderBy {
                column: Column::Temp,
                direction: SortDirection::Desc,
            }));

        let QueryResult::Rows(rows) = store.execute(&spec).await.unwrap() else {
            panic!("expected rows");
        };
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].temperature, Some(16.1));
        assert_eq!(rows[1].temperature, Some(15.8));
        assert_eq!(rows[0].source_file.as_deref(), Some("R20250921_prof_0.nc"));
    }

    #[tokio::test]
    async fn test_count_and_aggregate() {
        let (_dir, store) = seeded_store().await;

        let spec = QuerySpec::count()
            .with_constraints(vec![Constraint::greater_than(Column::Temp, 15.0)]);
        assert_eq!(store.execute(&spec).await.unwrap(), QueryResult::Count(4));

        let spec = QuerySpec::aggregate(vec![Column::Temp]);
        let QueryResult::Aggregates(agg) = store.execute(&spec).await.unwrap() else {
            panic!("expected aggregates");
        };
        assert_eq!(agg.total, 5);
        assert_eq!(agg.unique_locations, 5);
        let temp = agg.stats(Column::Temp).unwrap();
        assert_eq!(temp.min, Some(14.8));
        assert_eq!(temp.max, Some(16.1));
    }

    #[tokio::test]
    async fn test_store_is_read_only() {
        let (_dir, store) = seeded_store().await;
        let result = sqlx::query("DELETE FROM profiles").execute(&store.pool).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_missing_database_is_unavailable() {
        let dir = TempDir::new().unwrap();
        let store = SqliteStore::open(
            dir.path().join("absent.db"),
            "profiles",
            1,
            Duration::from_millis(500),
        )
        .unwrap();
        let err = store.execute(&QuerySpec::count()).await.unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::StorageUnavailable);
        assert!(!dir.path().join("absent.db").exists());
    }

    #[tokio::test]
    async fn test_missing_column_is_schema_mismatch() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("old.db");
        let options = SqliteConnectOptions::new()
            .filename(&path)
            .create_if_missing(true);
        let pool = SqlitePool::connect_with(options).await.unwrap();
        sqlx::query("CREATE TABLE profiles (id INTEGER PRIMARY KEY, LATITUDE REAL, LONGITUDE REAL)")
            .execute(&pool)
            .await
            .unwrap();
        pool.close().await;

        let store = SqliteStore::open(&path, "profiles", 1, Duration::from_secs(2)).unwrap();
        let err = store.execute(&QuerySpec::count()).await.unwrap_err();
        assert!(matches!(err, StorageError::SchemaMismatch(ref m) if m.contains("TEMP")));
    }

    #[tokio::test]
    async fn test_optional_columns_read_as_null() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("core.db");
        let options = SqliteConnectOptions::new()
            .filename(&path)
            .create_if_missing(true);
        let pool = SqlitePool::connect_with(options).await.unwrap();
        sqlx::query(
            "CREATE TABLE profiles (id INTEGER PRIMARY KEY, LATITUDE REAL, LONGITUDE REAL, \
             PRES REAL, TEMP REAL, PSAL REAL)",
        )
        .execute(&pool)
        .await
        .unwrap();
        sqlx::query("INSERT INTO profiles VALUES (1, 40.5, -70.2, 10.0, 16.0, 35.1)")
            .execute(&pool)
            .await
            .unwrap();
        pool.close().await;

        let store = SqliteStore::open(&path, "profiles", 1, Duration::from_secs(2)).unwrap();
        assert_eq!(store.verify_schema().await.unwrap(), &Column::CORE);

        let QueryResult::Rows(rows) = store
            .execute(&QuerySpec::rows(Column::ALL.to_vec(), 10))
            .await
            .unwrap()
        else {
            panic!("expected rows");
        };
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].temperature, Some(16.0));
        assert_eq!(rows[0].source_file, None);
        assert_eq!(rows[0].juld, None);

        // Filtering on a column the table lacks is still a mismatch.
        let spec = QuerySpec::count()
            .with_constraints(vec![Constraint::greater_than(Column::TempAdjusted, 1.0)]);
        let err = store.execute(&spec).await.unwrap_err();
        assert!(matches!(err, StorageError::SchemaMismatch(ref m) if m.contains("TEMP_ADJUSTED")));
    }
}
