//! Engine tests against seeded SQLite databases.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use floatchat::{
    create_store, sample_records, seed_database, Config, ErrorKind, ProfileRecord, ProfileStore,
    QueryEngine, QueryResult, QuerySpec, SqliteStore,
};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool};
use tempfile::TempDir;

async fn seeded(dir: &TempDir, records: &[ProfileRecord]) -> std::path::PathBuf {
    let path = dir.path().join("argo.db");
    seed_database(&path, "profiles", records).await.unwrap();
    path
}

fn open(path: &Path) -> Arc<dyn ProfileStore> {
    Arc::new(SqliteStore::open(path, "profiles", 4, Duration::from_secs(2)).unwrap())
}

fn temps_only(temps: &[Option<f64>]) -> Vec<ProfileRecord> {
    temps
        .iter()
        .enumerate()
        .map(|(i, &t)| ProfileRecord {
            id: i as i64 + 1,
            latitude: Some(40.0),
            longitude: Some(-70.0 + i as f64),
            temperature: t,
            ..Default::default()
        })
        .collect()
}

#[tokio::test]
async fn test_sample_questions() {
    let dir = TempDir::new().unwrap();
    let engine = QueryEngine::new(open(&seeded(&dir, &sample_records()).await));

    let response = engine.handle("Find profiles with temperature above 15 degrees").await;
    let mut ids: Vec<_> = response.records.iter().map(|r| r.id.unwrap()).collect();
    ids.sort();
    assert_eq!(ids, vec![1, 3, 4, 5]);

    let response = engine.handle("How many profiles are there?").await;
    assert!(response.narrative.contains("Total Profiles: 5"));

    let response = engine.handle("Find profiles near latitude 40 degrees").await;
    assert!(!response.records.is_empty());
    for record in &response.records {
        let lat = record.latitude.unwrap();
        assert!((39.0..=41.0).contains(&lat), "latitude {lat}");
    }

    let response = engine.handle("What's the salinity range?").await;
    assert!(response
        .narrative
        .contains("Salinity Range: 34.90 PSU to 35.30 PSU"));
}

#[tokio::test]
async fn test_filter_and_summary_match_memory_semantics() {
    let dir = TempDir::new().unwrap();
    let path = seeded(&dir, &temps_only(&[Some(10.0), Some(16.0), Some(20.0), None])).await;
    let engine = QueryEngine::new(open(&path));

    let response = engine.handle("temperature above 15").await;
    let temps: Vec<_> = response.records.iter().map(|r| r.temperature).collect();
    assert_eq!(temps, vec![Some(20.0), Some(16.0)]);

    let stats = engine.summary_stats().await.unwrap();
    assert_eq!(stats.total_count, 4);
    assert_eq!(stats.unique_location_count, 4);
    assert_eq!(stats.avg_temperature, Some(46.0 / 3.0));
    assert_eq!(stats.avg_salinity, None);
}

#[tokio::test]
async fn test_hostile_input_leaves_table_intact() {
    let dir = TempDir::new().unwrap();
    let path = seeded(&dir, &sample_records()).await;
    let store = open(&path);
    let engine = QueryEngine::new(store.clone());

    for question in [
        "temperature above 15; DROP TABLE profiles; --",
        "salinity = 35' OR '1'='1",
        "how many profiles; DELETE FROM profiles",
    ] {
        let response = engine.handle(question).await;
        assert_ne!(response.error, Some(ErrorKind::SchemaMismatch), "{question}");
    }

    assert_eq!(
        store.execute(&QuerySpec::count()).await.unwrap(),
        QueryResult::Count(5)
    );
}

#[tokio::test]
async fn test_empty_table() {
    let dir = TempDir::new().unwrap();
    let engine = QueryEngine::new(open(&seeded(&dir, &[]).await));

    for question in ["summary", "how many", "temperature above 1", "where are they"] {
        let response = engine.handle(question).await;
        assert_eq!(response.error, Some(ErrorKind::EmptyResult), "{question}");
    }
}

#[tokio::test]
async fn test_missing_database_is_unavailable() {
    let dir = TempDir::new().unwrap();
    let mut config = Config::default();
    config.storage.database_path = dir.path().join("nope.db").to_string_lossy().to_string();
    config.storage.timeout_ms = 1000;

    let engine = QueryEngine::from_config(create_store(&config).unwrap(), &config);
    let response = engine.handle("how many profiles").await;
    assert_eq!(response.error, Some(ErrorKind::StorageUnavailable));
    assert!(response.narrative.starts_with("Sorry"));
}

#[tokio::test]
async fn test_ingested_layout_without_source_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("ingested.db");
    let options = SqliteConnectOptions::new()
        .filename(&path)
        .create_if_missing(true);
    let pool = SqlitePool::connect_with(options).await.unwrap();
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS profiles (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
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
            PSAL_ADJUSTED REAL
        )",
    )
    .execute(&pool)
    .await
    .unwrap();
    sqlx::query(
        "INSERT INTO profiles (N_PROF, N_LEVELS, JULD, LATITUDE, LONGITUDE, PRES, TEMP, PSAL)
         VALUES (0, 1, 27650.5, 40.2, -70.1, 10.5, 16.0, 35.1),
                (1, 1, 27650.5, 41.0, -69.8, 12.0, 14.0, 35.0)",
    )
    .execute(&pool)
    .await
    .unwrap();
    pool.close().await;

    let engine = QueryEngine::new(open(&path));

    let response = engine.handle("temperature above 15").await;
    assert_eq!(response.error, None);
    assert_eq!(response.records.len(), 1);
    assert_eq!(response.records[0].temperature, Some(16.0));
    assert_eq!(response.records[0].source_file, None);

    let json = serde_json::to_value(&response).unwrap();
    assert!(json["records"][0]["source_file"].is_null());

    let response = engine.handle("how many profiles are there?").await;
    assert!(response.narrative.contains("Total Profiles: 2"));
}

#[tokio::test]
async fn test_wrong_schema_is_mismatch() {
    let dir = TempDir::new().unwrap();
    let path = seeded(&dir, &sample_records()).await;
    let engine = QueryEngine::new(Arc::new(
        SqliteStore::open(&path, "measurements", 1, Duration::from_secs(2)).unwrap(),
    ));

    let response = engine.handle("temperature above 15").await;
    assert_eq!(response.error, Some(ErrorKind::SchemaMismatch));
}
