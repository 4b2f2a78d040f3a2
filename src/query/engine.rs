//! Query engine.
//!
//! Runs one question through normalize, classify, extract, synthesize,
//! execute and compose. Every stage before execution is a pure function of
//! its input; the only shared state is the read-only store handle, so one
//! engine can serve any number of concurrent requests.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use super::classifier::IntentClassifier;
use super::composer::ResponseComposer;
use super::extractor::ConstraintExtractor;
use super::normalizer::normalize;
use super::policy::KeywordPolicy;
use super::synthesizer::QuerySynthesizer;
use super::types::{Column, QueryResult, QuerySpec, QueryStats, Response, SummaryStats};
use crate::config::Config;
use crate::error::{ErrorKind, StorageError};
use crate::metrics::get_metrics;
use crate::storage::ProfileStore;

/// Default bound on a single storage round trip.
pub const DEFAULT_STORAGE_TIMEOUT: Duration = Duration::from_millis(5000);

// ============================================================================
// Pipeline State
// ============================================================================

/// Stage of a single request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Normalizing,
    Classifying,
    Extracting,
    Synthesizing,
    Executing,
    Composing,
    Done,
    /// Storage failed; an apology is emitted and the run returns to idle
    Failed,
}

/// Per-request state tracker. Never shared between requests.
#[derive(Debug)]
struct PipelineRun {
    state: PipelineState,
    history: Vec<PipelineState>,
}

impl PipelineRun {
    fn new() -> Self {
        Self {
            state: PipelineState::Idle,
            history: vec![PipelineState::Idle],
        }
    }

    fn advance(&mut self, next: PipelineState) {
        debug!(from = ?self.state, to = ?next, "Pipeline transition");
        self.state = next;
        self.history.push(next);
    }
}

// ============================================================================
// Query Engine
// ============================================================================

/// Answers natural-language questions against a [`ProfileStore`].
#[derive(Clone)]
pub struct QueryEngine {
    store: Arc<dyn ProfileStore>,
    classifier: IntentClassifier,
    extractor: ConstraintExtractor,
    synthesizer: QuerySynthesizer,
    composer: ResponseComposer,
    timeout: Duration,
}

impl QueryEngine {
    /// Engine with the default keyword policy and limits.
    pub fn new(store: Arc<dyn ProfileStore>) -> Self {
        let policy = Arc::new(KeywordPolicy::default());
        Self {
            store,
            classifier: IntentClassifier::new(policy.clone()),
            extractor: ConstraintExtractor::new(policy),
            synthesizer: QuerySynthesizer::default(),
            composer: ResponseComposer::default(),
            timeout: DEFAULT_STORAGE_TIMEOUT,
        }
    }

    /// Engine configured from the `[query]` and `[storage]` sections.
    pub fn from_config(store: Arc<dyn ProfileStore>, config: &Config) -> Self {
        Self::new(store)
            .with_policy(Arc::new(KeywordPolicy::from_config(&config.query)))
            .with_max_rows(config.query.max_rows)
            .with_preview_rows(config.query.preview_rows)
            .with_timeout(config.storage.timeout())
    }

    pub fn with_policy(mut self, policy: Arc<KeywordPolicy>) -> Self {
        self.classifier = IntentClassifier::new(policy.clone());
        self.extractor = ConstraintExtractor::new(policy);
        self
    }

    pub fn with_max_rows(mut self, max_rows: usize) -> Self {
        self.synthesizer = QuerySynthesizer::new(max_rows);
        self
    }

    pub fn with_preview_rows(mut self, preview_rows: usize) -> Self {
        self.composer = ResponseComposer::new(preview_rows);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn store(&self) -> &Arc<dyn ProfileStore> {
        &self.store
    }

    /// Answer one question. Never fails: every problem becomes a
    /// [`Response`] carrying an [`ErrorKind`].
    pub async fn handle(&self, raw: &str) -> Response {
        let started = Instant::now();
        let metrics = get_metrics();
        metrics.requests_total.inc();

        let mut run = PipelineRun::new();

        run.advance(PipelineState::Normalizing);
        let normalized = normalize(raw);

        run.advance(PipelineState::Classifying);
        let classification = self.classifier.classify(&normalized);
        let intents = classification.intents;

        if intents.is_unknown() {
            metrics.unknown_intent_total.inc();
            run.advance(PipelineState::Done);
            let mut response = self.composer.guidance();
            response.stats = QueryStats {
                analysis_time_us: started.elapsed().as_micros() as u64,
                execution_time_ms: 0,
                total_time_ms: started.elapsed().as_millis() as u64,
            };
            info!(error = ErrorKind::NoIntentMatched.as_str(), "Handled question");
            return response;
        }

        run.advance(PipelineState::Extracting);
        let extraction = self.extractor.extract(&normalized, &intents);
        metrics
            .skipped_literals_total
            .inc_by(extraction.skipped.len() as u64);

        run.advance(PipelineState::Synthesizing);
        let spec = self.synthesizer.synthesize(&intents, &extraction);
        let analysis_time = started.elapsed();

        run.advance(PipelineState::Executing);
        let execute_started = Instant::now();
        let outcome = self.execute(&spec).await;
        let execution_time = execute_started.elapsed();

        let mut response = match outcome {
            Ok(result) => {
                run.advance(PipelineState::Composing);
                let response = self.composer.compose(&intents, &spec, result);
                if response.error == Some(ErrorKind::EmptyResult) {
                    metrics.empty_results_total.inc();
                }
                run.advance(PipelineState::Done);
                response
            }
            Err(err) => {
                run.advance(PipelineState::Failed);
                let kind = err.kind();
                match kind {
                    ErrorKind::SchemaMismatch => {
                        error!(backend = self.store.backend_name(), "Schema mismatch: {}", err)
                    }
                    _ => warn!(backend = self.store.backend_name(), "Storage unavailable: {}", err),
                }
                metrics.record_storage_failure(kind);
                let response = self.composer.storage_failure(&intents, &err);
                run.advance(PipelineState::Idle);
                response
            }
        };

        let total_time = started.elapsed();
        response.stats = QueryStats {
            analysis_time_us: analysis_time.as_micros() as u64,
            execution_time_ms: execution_time.as_millis() as u64,
            total_time_ms: total_time.as_millis() as u64,
        };
        metrics
            .request_duration_seconds
            .observe(total_time.as_secs_f64());

        info!(
            intents = ?response.intents,
            records = response.records.len(),
            error = response.error.map(|k| k.as_str()),
            total_ms = response.stats.total_time_ms,
            "Handled question"
        );
        debug!(states = ?run.history, "Pipeline finished");

        response
    }

    /// Dashboard totals over the whole table.
    pub async fn summary_stats(&self) -> Result<SummaryStats, StorageError> {
        let spec = QuerySpec::aggregate(vec![Column::Temp, Column::Psal]);
        match self.execute(&spec).await? {
            QueryResult::Aggregates(agg) => Ok(SummaryStats {
                total_count: agg.total,
                unique_location_count: agg.unique_locations,
                avg_temperature: agg.stats(Column::Temp).and_then(|s| s.avg),
                avg_salinity: agg.stats(Column::Psal).and_then(|s| s.avg),
            }),
            other => Err(StorageError::Query(format!(
                "expected aggregates, got {other:?}"
            ))),
        }
    }

    async fn execute(&self, spec: &QuerySpec) -> Result<QueryResult, StorageError> {
        match tokio::time::timeout(self.timeout, self.store.execute(spec)).await {
            Ok(result) => result,
            Err(_) => Err(StorageError::Timeout(self.timeout.as_millis() as u64)),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
