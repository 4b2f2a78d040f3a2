//! Sample profile data and database seeding.
//!
//! Stands in for the ingestion job during development: creates the profile
//! table and fills it with a few ARGO-like records. This is the only code
//! path that writes to a database.

use std::path::Path;

use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{Connection, SqliteConnection};
use tracing::info;

use super::sql::is_identifier;
use crate::error::StorageError;
use crate::query::ProfileRecord;

fn create_table_sql(table: &str) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {table} (
            id INTEGER PRIMARY KEY,
            N_PROF INTEGER,
            N_LEVELS INTEGER,
            JULD REAL,
            LATITUDE REAL,
            LONGITUDE REAL,
            PRES REAL,
            TEMP REAL,
            PSAL REAL,
            PRES_ADJUSTED REAL,
            TEMP_ADJUSTED REAL,
            PSAL_ADJUSTED REAL,
            SOURCE_FILE TEXT
        )"
    )
}

/// Five profiles off the US north-east coast.
pub fn sample_records() -> Vec<ProfileRecord> {
    #[rustfmt::skip]
    let rows = [
        (1, 150, 2456789.5, 40.5, -70.2, 10.5, 15.2, 35.1, 10.3, 15.0, 35.0, "D20250922_prof_0.nc"),
        (2, 200, 2456790.5, 41.0, -69.8, 15.2, 14.8, 34.9, 15.0, 14.5, 34.8, "D20250923_prof_0.nc"),
        (3, 180, 2456791.5, 39.8, -70.5, 8.7, 16.1, 35.3, 8.5, 15.9, 35.2, "R20250921_prof_0.nc"),
        (4, 220, 2456792.5, 40.2, -69.5, 12.3, 15.5, 35.0, 12.0, 15.3, 34.9, "R20250922_prof_0.nc"),
        (5, 190, 2456793.5, 40.8, -70.0, 9.8, 15.8, 35.2, 9.5, 15.6, 35.1, "D20250924_prof_0.nc"),
    ];

    rows.into_iter()
        .map(
            |(id, levels, juld, lat, lon, pres, temp, psal, pres_adj, temp_adj, psal_adj, file)| {
                ProfileRecord {
                    id,
                    profile_number: Some(id - 1),
                    level_count: Some(levels),
                    juld: Some(juld),
                    latitude: Some(lat),
                    longitude: Some(lon),
                    pressure: Some(pres),
                    temperature: Some(temp),
                    salinity: Some(psal),
                    pressure_adjusted: Some(pres_adj),
                    temperature_adjusted: Some(temp_adj),
                    salinity_adjusted: Some(psal_adj),
                    source_file: Some(file.to_string()),
                }
            },
        )
        .collect()
}

/// Create the table if needed and insert `records`, skipping ids already present.
///
/// Returns the number of rows inserted.
pub async fn seed_database(
    path: impl AsRef<Path>,
    table: &str,
    records: &[ProfileRecord],
) -> Result<u64, StorageError> {
    if !is_identifier(table) {
        return Err(StorageError::Query(format!("invalid table name: {table:?}")));
    }

    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true);
    let mut conn = SqliteConnection::connect_with(&options).await?;

    sqlx::query(&create_table_sql(table)).execute(&mut conn).await?;

    let insert = format!(
        "INSERT OR IGNORE INTO {table} (id, N_PROF, N_LEVELS, JULD, LATITUDE, LONGITUDE, PRES, \
         TEMP, PSAL, PRES_ADJUSTED, TEMP_ADJUSTED, PSAL_ADJUSTED, SOURCE_FILE) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
    );

    let mut tx = conn.begin().await?;
    let mut inserted = 0;
    for record in records {
        let result = sqlx::query(&insert)
            .bind(record.id)
            .bind(record.profile_number)
            .bind(record.level_count)
            .bind(record.juld)
            .bind(record.latitude)
            .bind(record.longitude)
            .bind(record.pressure)
            .bind(record.temperature)
            .bind(record.salinity)
            .bind(record.pressure_adjusted)
            .bind(record.temperature_adjusted)
            .bind(record.salinity_adjusted)
            .bind(record.source_file.as_deref())
            .execute(&mut *tx)
            .await?;
        inserted += result.rows_affected();
    }
    tx.commit().await?;
    conn.close().await?;

    info!(path = %path.display(), table, inserted, "Seeded profile table");
    Ok(inserted)
}
