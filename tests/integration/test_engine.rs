//! End-to-end engine tests over the in-memory store.

use std::sync::Arc;

use async_trait::async_trait;
use floatchat::{
    ErrorKind, Intent, MemoryStore, ProfileRecord, ProfileStore, QueryEngine, QueryResult,
    QuerySpec, StorageError,
};

/// One record per temperature, at distinct locations, salinity 35.
fn records_with_temps(temps: &[f64]) -> Vec<ProfileRecord> {
    temps
        .iter()
        .enumerate()
        .map(|(i, &t)| ProfileRecord {
            id: i as i64 + 1,
            latitude: Some(40.0 + i as f64 * 0.5),
            longitude: Some(-70.0),
            pressure: Some(10.0 + i as f64),
            temperature: Some(t),
            salinity: Some(35.0),
            source_file: Some(format!("D2025092{i}_prof_0.nc")),
            ..Default::default()
        })
        .collect()
}

fn engine_with(records: Vec<ProfileRecord>) -> QueryEngine {
    QueryEngine::new(Arc::new(MemoryStore::new(records)))
}

struct FailingStore(fn() -> StorageError);

#[async_trait]
impl ProfileStore for FailingStore {
    async fn execute(&self, _spec: &QuerySpec) -> Result<QueryResult, StorageError> {
        Err((self.0)())
    }

    fn backend_name(&self) -> &'static str {
        "failing"
    }
}

#[tokio::test]
async fn test_unrecognized_input_gets_guidance() {
    let engine = engine_with(records_with_temps(&[10.0]));
    for input in ["", "   ", "hello there", "¿qué tal?", "42", "!!! ???", "attempt"] {
        let response = engine.handle(input).await;
        assert_eq!(response.error, Some(ErrorKind::NoIntentMatched), "{input:?}");
        assert_eq!(response.intents, vec![Intent::Unknown]);
        assert!(response.narrative.contains("Show me a summary of the data"));
        assert!(response.records.is_empty());
    }
}

#[tokio::test]
async fn test_temperature_above_filters_rows() {
    let engine = engine_with(records_with_temps(&[10.0, 16.0, 20.0]));
    let response = engine.handle("temperature above 15").await;

    let mut temps: Vec<f64> = response
        .records
        .iter()
        .map(|r| r.temperature.unwrap())
        .collect();
    temps.sort_by(|a, b| a.partial_cmp(b).unwrap());
    assert_eq!(temps, vec![16.0, 20.0]);
    assert!(response.narrative.starts_with("Found 2 data points"));
}

#[tokio::test]
async fn test_inclusive_comparisons_keep_the_bound() {
    let engine = engine_with(records_with_temps(&[14.0, 15.0, 16.0]));

    let response = engine.handle("temperature >= 15").await;
    let temps: Vec<_> = response.records.iter().map(|r| r.temperature).collect();
    assert_eq!(temps, vec![Some(16.0), Some(15.0)]);
    assert!(response.narrative.contains("Temperature >= 15"));

    let response = engine.handle("temperature <= 15").await;
    let temps: Vec<_> = response.records.iter().map(|r| r.temperature).collect();
    assert_eq!(temps, vec![Some(15.0), Some(14.0)]);
}

#[tokio::test]
async fn test_malformed_literal_still_answers() {
    let engine = engine_with(records_with_temps(&[14.0, 16.0]));
    let response = engine.handle("temperature above 1.2.3 or salinity below 40").await;
    assert_eq!(response.error, None);
    assert_eq!(response.records.len(), 2);
}

#[tokio::test]
async fn test_summary_aggregates() {
    let engine = engine_with(records_with_temps(&[10.0, 20.0, 30.0]));
    let response = engine.handle("Show me a summary of the data").await;

    assert!(response.error.is_none());
    assert!(response.records.is_empty());
    assert!(response.narrative.contains("Total Profiles: 3"));
    assert!(response
        .narrative
        .contains("Temperature Range: 10.00°C to 30.00°C (average 20.00°C)"));

    let stats = engine.summary_stats().await.unwrap();
    assert_eq!(stats.total_count, 3);
    assert_eq!(stats.avg_temperature, Some(20.0));
}

#[tokio::test]
async fn test_handle_is_idempotent() {
    let engine = engine_with(records_with_temps(&[12.0, 14.5, 18.0, 11.0]));
    for question in [
        "temperature above 12",
        "how many profiles with salinity near 35",
        "what's the pressure range?",
        "where are the floats",
    ] {
        let first = engine.handle(question).await;
        let second = engine.handle(question).await;
        assert_eq!(first.narrative, second.narrative, "{question}");
        assert_eq!(first.records, second.records, "{question}");
        assert_eq!(first.error, second.error, "{question}");
    }
}

#[tokio::test]
async fn test_empty_store_is_empty_result_for_every_intent() {
    let engine = engine_with(Vec::new());
    for question in [
        "summary",
        "how many profiles",
        "temperature",
        "salinity above 30",
        "pressure below 100",
        "where are the floats",
        "temperature range",
        "plot the profiles on a map",
    ] {
        let response = engine.handle(question).await;
        assert_eq!(response.error, Some(ErrorKind::EmptyResult), "{question}");
        assert!(response.narrative.starts_with("No data found"), "{question}");
        assert!(response.records.is_empty());
    }
}

#[tokio::test]
async fn test_missing_values_are_not_zeroed() {
    let mut records = records_with_temps(&[14.0, 15.0]);
    records[1].temperature = None;
    records[1].pressure = None;
    let engine = engine_with(records);

    let response = engine.handle("salinity above 30").await;
    assert_eq!(response.records.len(), 2);
    let missing = response
        .records
        .iter()
        .find(|r| r.id == Some(2))
        .unwrap();
    assert_eq!(missing.temperature, None);
    assert_eq!(missing.pressure, None);

    let json = serde_json::to_value(&response).unwrap();
    let row = json["records"]
        .as_array()
        .unwrap()
        .iter()
        .find(|r| r["id"] == 2)
        .unwrap();
    assert!(row["temperature"].is_null());
    assert!(row["pressure"].is_null());
    assert_eq!(row["salinity"], 35.0);
}

#[tokio::test]
async fn test_storage_failures_are_reported() {
    let unavailable = QueryEngine::new(Arc::new(FailingStore(|| {
        StorageError::Unavailable("connection refused".into())
    })));
    let response = unavailable.handle("how many profiles").await;
    assert_eq!(response.error, Some(ErrorKind::StorageUnavailable));
    assert!(response.narrative.starts_with("Sorry"));
    assert!(!response.narrative.contains("connection refused"));

    let mismatch = QueryEngine::new(Arc::new(FailingStore(|| {
        StorageError::SchemaMismatch("missing TEMP".into())
    })));
    let response = mismatch.handle("temperature above 15").await;
    assert_eq!(response.error, Some(ErrorKind::SchemaMismatch));
    assert_eq!(response.intents, vec![Intent::Temperature]);

    assert!(mismatch.summary_stats().await.is_err());
}

#[tokio::test]
async fn test_limit_and_direction() {
    let engine = engine_with(records_with_temps(&[10.0, 16.0, 20.0, 13.0]));

    let response = engine.handle("top 2 warmest temperatures").await;
    let temps: Vec<_> = response.records.iter().map(|r| r.temperature).collect();
    assert_eq!(temps, vec![Some(20.0), Some(16.0)]);

    let response = engine.handle("lowest temperature readings").await;
    assert_eq!(response.records.first().and_then(|r| r.temperature), Some(10.0));
}

#[tokio::test]
async fn test_location_only_projection() {
    let engine = engine_with(records_with_temps(&[10.0, 16.0]));
    let response = engine.handle("where are the floats").await;

    assert_eq!(response.records.len(), 2);
    for record in &response.records {
        assert!(record.latitude.is_some() && record.longitude.is_some());
        assert_eq!(record.temperature, None);
        assert_eq!(record.source_file, None);
    }
    assert!(response.narrative.contains("Unique Locations: 2"));
}

#[tokio::test]
async fn test_concurrent_requests() {
    let engine = engine_with(records_with_temps(&[10.0, 16.0, 20.0, 13.0, 17.5]));
    let expected = engine.handle("temperature above 15").await.records;

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let engine = engine.clone();
            tokio::spawn(async move { engine.handle("temperature above 15").await })
        })
        .collect();

    for handle in handles {
        let response = handle.await.unwrap();
        assert_eq!(response.records, expected);
    }
}
