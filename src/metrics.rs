//! Prometheus metrics for the query engine.
//!
//! One global [`Metrics`] instance counts requests and their outcomes and
//! records end-to-end request latency.

use prometheus::{Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, OnceLock};

use crate::error::ErrorKind;

/// Global metrics instance.
static METRICS: OnceLock<Arc<Metrics>> = OnceLock::new();

/// Get or initialize the global metrics instance.
pub fn get_metrics() -> Arc<Metrics> {
    METRICS.get_or_init(|| Arc::new(Metrics::new())).clone()
}

/// Latency buckets in seconds, 1ms to 10s.
fn latency_buckets() -> Vec<f64> {
    vec![
        0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
    ]
}

/// All metrics of the engine.
pub struct Metrics {
    pub registry: Registry,

    /// Questions handled.
    pub requests_total: IntCounter,
    /// Questions with no recognized keyword.
    pub unknown_intent_total: IntCounter,
    /// Queries that matched no data.
    pub empty_results_total: IntCounter,
    /// Storage failures, labelled by error kind.
    pub storage_failures_total: IntCounterVec,
    /// Numeric literals that could not be used.
    pub skipped_literals_total: IntCounter,

    /// End-to-end request duration in seconds.
    pub request_duration_seconds: Histogram,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let requests_total =
            IntCounter::new("floatchat_requests_total", "Total number of questions handled")
                .expect("failed to create counter");

        let unknown_intent_total = IntCounter::new(
            "floatchat_unknown_intent_total",
            "Questions that matched no intent",
        )
        .expect("failed to create counter");

        let empty_results_total = IntCounter::new(
            "floatchat_empty_results_total",
            "Queries that returned no data",
        )
        .expect("failed to create counter");

        let storage_failures_total = IntCounterVec::new(
            Opts::new("floatchat_storage_failures_total", "Failed storage round trips"),
            &["kind"],
        )
        .expect("failed to create counter");

        let skipped_literals_total = IntCounter::new(
            "floatchat_skipped_literals_total",
            "Numeric literals skipped during extraction",
        )
        .expect("failed to create counter");

        let request_duration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "floatchat_request_duration_seconds",
                "Question handling duration in seconds",
            )
            .buckets(latency_buckets()),
        )
        .expect("failed to create histogram");

        registry
            .register(Box::new(requests_total.clone()))
            .expect("failed to register counter");
        registry
            .register(Box::new(unknown_intent_total.clone()))
            .expect("failed to register counter");
        registry
            .register(Box::new(empty_results_total.clone()))
            .expect("failed to register counter");
        registry
            .register(Box::new(storage_failures_total.clone()))
            .expect("failed to register counter");
        registry
            .register(Box::new(skipped_literals_total.clone()))
            .expect("failed to register counter");
        registry
            .register(Box::new(request_duration_seconds.clone()))
            .expect("failed to register histogram");

        Self {
            registry,
            requests_total,
            unknown_intent_total,
            empty_results_total,
            storage_failures_total,
            skipped_literals_total,
            request_duration_seconds,
        }
    }

    /// Count a storage failure under its error kind.
    pub fn record_storage_failure(&self, kind: ErrorKind) {
        self.storage_failures_total
            .with_label_values(&[kind.as_str()])
            .inc();
    }

    /// Render all metrics in the Prometheus text format.
    pub fn gather_text(&self) -> String {
        use prometheus::Encoder;

        let encoder = prometheus::TextEncoder::new();
        let mut buffer = Vec::new();
        if let Err(e) = encoder.encode(&self.registry.gather(), &mut buffer) {
            tracing::warn!("Failed to encode metrics: {}", e);
        }
        String::from_utf8_lossy(&buffer).into_owned()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let failures = |kind: ErrorKind| {
            self.storage_failures_total
                .with_label_values(&[kind.as_str()])
                .get()
        };
        let count = self.request_duration_seconds.get_sample_count();
        let sum = self.request_duration_seconds.get_sample_sum();

        MetricsSnapshot {
            requests_total: self.requests_total.get(),
            unknown_intent_total: self.unknown_intent_total.get(),
            empty_results_total: self.empty_results_total.get(),
            storage_unavailable_total: failures(ErrorKind::StorageUnavailable),
            schema_mismatch_total: failures(ErrorKind::SchemaMismatch),
            skipped_literals_total: self.skipped_literals_total.get(),
            mean_request_seconds: (count > 0).then(|| sum / count as f64),
        }
    }
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub requests_total: u64,
    pub unknown_intent_total: u64,
    pub empty_results_total: u64,
    pub storage_unavailable_total: u64,
    pub schema_mismatch_total: u64,
    pub skipped_literals_total: u64,
    pub mean_request_seconds: Option<f64>,
}
