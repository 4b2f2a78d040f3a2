//! FloatChat: natural-language questions over ARGO float profiles
//!
//! Turns a free-text question into a read-only, parameterized query against
//! the profile table and answers with a short narrative plus the matching
//! records.

pub mod config;
pub mod error;
pub mod metrics;
pub mod query;
pub mod storage;

pub use config::{Config, QueryConfig, StorageBackendType, StorageConfig};
pub use error::{ConfigError, ErrorKind, FloatChatError, Result, StorageError};
pub use metrics::{get_metrics, Metrics, MetricsSnapshot};
pub use query::{
    fmt_value, normalize, ClassificationResult, Column, Constraint, ConstraintExtractor,
    ConstraintValue, Extraction, Intent, IntentClassifier, IntentSet, KeywordPolicy, MatchMode,
    Operator, ProfileRecord, QueryEngine, QueryResult, QueryShape, QuerySpec, QuerySynthesizer,
    RecordProjection, Response, ResponseComposer, SummaryStats, TieBreak, EXAMPLE_QUESTIONS,
};
pub use storage::{
    create_store, sample_records, seed_database, MemoryStore, ProfileStore, SqliteStore,
};
