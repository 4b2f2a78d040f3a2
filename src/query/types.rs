//! Types for the natural language query pipeline.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ErrorKind;

// ============================================================================
// Intent
// ============================================================================

/// Classified purpose behind a question.
///
/// Declaration order is the order in which intents are reported and rendered.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Summary,
    Count,
    Temperature,
    Salinity,
    Pressure,
    Location,
    Range,
    Visualization,
    Unknown,
}

impl Intent {
    /// Every intent that can be matched by keywords.
    pub const MATCHABLE: [Intent; 8] = [
        Intent::Summary,
        Intent::Count,
        Intent::Temperature,
        Intent::Salinity,
        Intent::Pressure,
        Intent::Location,
        Intent::Range,
        Intent::Visualization,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Summary => "Summary",
            Self::Count => "Count",
            Self::Temperature => "Temperature",
            Self::Salinity => "Salinity",
            Self::Pressure => "Pressure",
            Self::Location => "Location",
            Self::Range => "Range",
            Self::Visualization => "Visualization",
            Self::Unknown => "Unknown",
        }
    }

    /// The measurement column a value intent refers to.
    pub fn measurement_column(&self) -> Option<Column> {
        match self {
            Self::Temperature => Some(Column::Temp),
            Self::Salinity => Some(Column::Psal),
            Self::Pressure => Some(Column::Pres),
            _ => None,
        }
    }
}

/// The set of intents active for one request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentSet(BTreeSet<Intent>);

impl IntentSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// The set holding only [`Intent::Unknown`].
    pub fn unknown() -> Self {
        Self(BTreeSet::from([Intent::Unknown]))
    }

    pub fn insert(&mut self, intent: Intent) {
        self.0.insert(intent);
    }

    pub fn contains(&self, intent: Intent) -> bool {
        self.0.contains(&intent)
    }

    pub fn is_unknown(&self) -> bool {
        self.0.is_empty() || self.contains(Intent::Unknown)
    }

    pub fn iter(&self) -> impl Iterator<Item = Intent> + '_ {
        self.0.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Measurement columns named by value intents, in table order.
    pub fn measurement_columns(&self) -> Vec<Column> {
        self.iter().filter_map(|i| i.measurement_column()).collect()
    }
}

impl FromIterator<Intent> for IntentSet {
    fn from_iter<T: IntoIterator<Item = Intent>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

// ============================================================================
// Columns
// ============================================================================

/// Columns of the profile table.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Column {
    Id,
    ProfileNumber,
    LevelCount,
    Juld,
    Latitude,
    Longitude,
    Pres,
    Temp,
    Psal,
    PresAdjusted,
    TempAdjusted,
    PsalAdjusted,
    SourceFile,
}

impl Column {
    /// Every column, in table order.
    pub const ALL: [Column; 13] = [
        Column::Id,
        Column::ProfileNumber,
        Column::LevelCount,
        Column::Juld,
        Column::Latitude,
        Column::Longitude,
        Column::Pres,
        Column::Temp,
        Column::Psal,
        Column::PresAdjusted,
        Column::TempAdjusted,
        Column::PsalAdjusted,
        Column::SourceFile,
    ];

    /// Columns every profile table must carry. The rest are optional and
    /// read as null when the table lacks them.
    pub const CORE: [Column; 6] = [
        Column::Id,
        Column::Latitude,
        Column::Longitude,
        Column::Pres,
        Column::Temp,
        Column::Psal,
    ];

    /// Columns summarized by aggregate queries.
    pub const MEASUREMENTS: [Column; 5] = [
        Column::Temp,
        Column::Psal,
        Column::Pres,
        Column::Latitude,
        Column::Longitude,
    ];

    /// Projection used for map-only answers.
    pub const LOCATION: [Column; 3] = [Column::Id, Column::Latitude, Column::Longitude];

    /// Physical column name in the backing table. Never derived from input.
    pub fn sql_name(&self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::ProfileNumber => "N_PROF",
            Self::LevelCount => "N_LEVELS",
            Self::Juld => "JULD",
            Self::Latitude => "LATITUDE",
            Self::Longitude => "LONGITUDE",
            Self::Pres => "PRES",
            Self::Temp => "TEMP",
            Self::Psal => "PSAL",
            Self::PresAdjusted => "PRES_ADJUSTED",
            Self::TempAdjusted => "TEMP_ADJUSTED",
            Self::PsalAdjusted => "PSAL_ADJUSTED",
            Self::SourceFile => "SOURCE_FILE",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Id => "Id",
            Self::ProfileNumber => "Profile",
            Self::LevelCount => "Levels",
            Self::Juld => "Date",
            Self::Latitude => "Latitude",
            Self::Longitude => "Longitude",
            Self::Pres => "Pressure",
            Self::Temp => "Temperature",
            Self::Psal => "Salinity",
            Self::PresAdjusted => "Adjusted pressure",
            Self::TempAdjusted => "Adjusted temperature",
            Self::PsalAdjusted => "Adjusted salinity",
            Self::SourceFile => "Source",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            Self::Temp | Self::TempAdjusted => "°C",
            Self::Psal | Self::PsalAdjusted => " PSU",
            Self::Pres | Self::PresAdjusted => " dbar",
            Self::Latitude | Self::Longitude => "°",
            _ => "",
        }
    }

    pub fn is_numeric(&self) -> bool {
        !matches!(self, Self::SourceFile)
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sql_name())
    }
}

// ============================================================================
// Constraints
// ============================================================================

/// Comparison operator of a constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Gt,
    Lt,
    Eq,
    Between,
}

impl Operator {
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Gt => ">",
            Self::Lt => "<",
            Self::Eq => "=",
            Self::Between => "BETWEEN",
        }
    }
}

/// Right-hand side of a constraint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConstraintValue {
    Single(f64),
    Pair(f64, f64),
}

/// A single `column <op> value` filter. Constraints combine with AND.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Constraint {
    pub column: Column,
    pub operator: Operator,
    pub value: ConstraintValue,
}

impl Constraint {
    pub fn greater_than(column: Column, value: f64) -> Self {
        Self {
            column,
            operator: Operator::Gt,
            value: ConstraintValue::Single(value),
        }
    }

    pub fn less_than(column: Column, value: f64) -> Self {
        Self {
            column,
            operator: Operator::Lt,
            value: ConstraintValue::Single(value),
        }
    }

    pub fn equal_to(column: Column, value: f64) -> Self {
        Self {
            column,
            operator: Operator::Eq,
            value: ConstraintValue::Single(value),
        }
    }

    /// `column >= value`, as a range with an open top.
    pub fn at_least(column: Column, value: f64) -> Self {
        Self::between(column, value, f64::MAX)
    }

    /// `column <= value`, as a range with an open bottom.
    pub fn at_most(column: Column, value: f64) -> Self {
        Self::between(column, f64::MIN, value)
    }

    /// Inclusive range; bounds are reordered so `low <= high`.
    pub fn between(column: Column, a: f64, b: f64) -> Self {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        Self {
            column,
            operator: Operator::Between,
            value: ConstraintValue::Pair(low, high),
        }
    }

    /// Symmetric band around `center`.
    pub fn near(column: Column, center: f64, tolerance: f64) -> Self {
        Self::between(column, center - tolerance, center + tolerance)
    }

    /// The literal values this constraint binds, in placeholder order.
    pub fn bound_values(&self) -> Vec<f64> {
        match self.value {
            ConstraintValue::Single(v) => vec![v],
            ConstraintValue::Pair(low, high) => vec![low, high],
        }
    }

    /// Evaluate against a value; NULL never matches.
    pub fn matches(&self, value: Option<f64>) -> bool {
        let Some(v) = value else {
            return false;
        };
        match (self.operator, self.value) {
            (Operator::Gt, ConstraintValue::Single(x)) => v > x,
            (Operator::Lt, ConstraintValue::Single(x)) => v < x,
            (Operator::Eq, ConstraintValue::Single(x)) => v == x,
            (Operator::Between, ConstraintValue::Pair(low, high)) => v >= low && v <= high,
            // Mismatched operator/value pairs only come from hand-built constraints
            (Operator::Between, ConstraintValue::Single(x)) => v == x,
            (_, ConstraintValue::Pair(low, high)) => v >= low && v <= high,
        }
    }

    pub fn describe(&self) -> String {
        match self.value {
            ConstraintValue::Single(v) => {
                format!("{} {} {}", self.column.display_name(), self.operator.symbol(), v)
            }
            ConstraintValue::Pair(low, high) if high == f64::MAX => {
                format!("{} >= {}", self.column.display_name(), low)
            }
            ConstraintValue::Pair(low, high) if low == f64::MIN => {
                format!("{} <= {}", self.column.display_name(), high)
            }
            ConstraintValue::Pair(low, high) => format!(
                "{} between {} and {}",
                self.column.display_name(),
                low,
                high
            ),
        }
    }
}

// ============================================================================
// Query Spec
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBy {
    pub column: Column,
    pub direction: SortDirection,
}

/// What a query returns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum QueryShape {
    /// Matching records, projected onto the given columns
    Rows { projection: Vec<Column> },
    /// Number of matching records only
    Count,
    /// Count, distinct locations and min/max/avg of the given columns
    Aggregate { columns: Vec<Column> },
}

/// Parameterized, read-only description of what to fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuerySpec {
    pub shape: QueryShape,
    pub constraints: Vec<Constraint>,
    /// Columns that must be non-null
    pub required: Vec<Column>,
    pub order: Option<OrderBy>,
    pub limit: usize,
}

impl QuerySpec {
    pub fn rows(projection: Vec<Column>, limit: usize) -> Self {
        Self {
            shape: QueryShape::Rows { projection },
            constraints: Vec::new(),
            required: Vec::new(),
            order: None,
            limit,
        }
    }

    pub fn count() -> Self {
        Self {
            shape: QueryShape::Count,
            constraints: Vec::new(),
            required: Vec::new(),
            order: None,
            limit: 1,
        }
    }

    pub fn aggregate(columns: Vec<Column>) -> Self {
        Self {
            shape: QueryShape::Aggregate { columns },
            constraints: Vec::new(),
            required: Vec::new(),
            order: None,
            limit: 1,
        }
    }

    pub fn with_constraints(mut self, constraints: Vec<Constraint>) -> Self {
        self.constraints = constraints;
        self
    }

    pub fn with_required(mut self, required: Vec<Column>) -> Self {
        self.required = required;
        self
    }

    pub fn with_order(mut self, order: Option<OrderBy>) -> Self {
        self.order = order;
        self
    }

    /// Columns the query filters, orders or aggregates on. Projected
    /// columns are not included.
    pub fn referenced_columns(&self) -> Vec<Column> {
        let mut columns: Vec<Column> = self.required.clone();
        columns.extend(self.constraints.iter().map(|c| c.column));
        columns.extend(self.order.map(|o| o.column));
        if let QueryShape::Aggregate { columns: aggregated } = &self.shape {
            columns.extend(aggregated.iter().copied());
            columns.extend([Column::Latitude, Column::Longitude]);
        }
        columns.sort();
        columns.dedup();
        columns
    }
}

// ============================================================================
// Records
// ============================================================================

/// One stored profile measurement, as committed by the ingestion job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileRecord {
    pub id: i64,
    #[serde(default)]
    pub profile_number: Option<i64>,
    #[serde(default)]
    pub level_count: Option<i64>,
    #[serde(default)]
    pub juld: Option<f64>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub pressure: Option<f64>,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub salinity: Option<f64>,
    #[serde(default)]
    pub pressure_adjusted: Option<f64>,
    #[serde(default)]
    pub temperature_adjusted: Option<f64>,
    #[serde(default)]
    pub salinity_adjusted: Option<f64>,
    #[serde(default)]
    pub source_file: Option<String>,
}

impl ProfileRecord {
    /// Numeric value of a column; `None` for NULL and for `SourceFile`.
    pub fn value(&self, column: Column) -> Option<f64> {
        match column {
            Column::Id => Some(self.id as f64),
            Column::ProfileNumber => self.profile_number.map(|v| v as f64),
            Column::LevelCount => self.level_count.map(|v| v as f64),
            Column::Juld => self.juld,
            Column::Latitude => self.latitude,
            Column::Longitude => self.longitude,
            Column::Pres => self.pressure,
            Column::Temp => self.temperature,
            Column::Psal => self.salinity,
            Column::PresAdjusted => self.pressure_adjusted,
            Column::TempAdjusted => self.temperature_adjusted,
            Column::PsalAdjusted => self.salinity_adjusted,
            Column::SourceFile => None,
        }
    }

    pub fn is_null(&self, column: Column) -> bool {
        match column {
            Column::SourceFile => self.source_file.is_none(),
            other => self.value(other).is_none(),
        }
    }

    /// Copy only the projected columns; the rest stay `None`.
    pub fn project(&self, projection: &[Column]) -> RecordProjection {
        let mut out = RecordProjection::default();
        for column in projection {
            match column {
                Column::Id => out.id = Some(self.id),
                Column::ProfileNumber => out.profile_number = self.profile_number,
                Column::LevelCount => out.level_count = self.level_count,
                Column::Juld => out.juld = self.juld,
                Column::Latitude => out.latitude = self.latitude,
                Column::Longitude => out.longitude = self.longitude,
                Column::Pres => out.pressure = self.pressure,
                Column::Temp => out.temperature = self.temperature,
                Column::Psal => out.salinity = self.salinity,
                Column::PresAdjusted => out.pressure_adjusted = self.pressure_adjusted,
                Column::TempAdjusted => out.temperature_adjusted = self.temperature_adjusted,
                Column::PsalAdjusted => out.salinity_adjusted = self.salinity_adjusted,
                Column::SourceFile => out.source_file = self.source_file.clone(),
            }
        }
        out
    }
}

/// A record as exposed to the front end.
///
/// The six map/chart fields are always serialized, as `null` when missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordProjection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_number: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level_count: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub juld: Option<f64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub temperature: Option<f64>,
    pub salinity: Option<f64>,
    pub pressure: Option<f64>,
    pub source_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pressure_adjusted: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature_adjusted: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salinity_adjusted: Option<f64>,
}

impl RecordProjection {
    pub fn value(&self, column: Column) -> Option<f64> {
        match column {
            Column::Id => self.id.map(|v| v as f64),
            Column::ProfileNumber => self.profile_number.map(|v| v as f64),
            Column::LevelCount => self.level_count.map(|v| v as f64),
            Column::Juld => self.juld,
            Column::Latitude => self.latitude,
            Column::Longitude => self.longitude,
            Column::Pres => self.pressure,
            Column::Temp => self.temperature,
            Column::Psal => self.salinity,
            Column::PresAdjusted => self.pressure_adjusted,
            Column::TempAdjusted => self.temperature_adjusted,
            Column::PsalAdjusted => self.salinity_adjusted,
            Column::SourceFile => None,
        }
    }
}

// ============================================================================
// Query Result
// ============================================================================

/// min/max/avg of one column; all `None` when every value is NULL.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColumnStats {
    pub column: Column,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub avg: Option<f64>,
}

impl ColumnStats {
    /// Compute stats over the non-null values of an iterator.
    pub fn from_values(column: Column, values: impl IntoIterator<Item = Option<f64>>) -> Self {
        let mut min: Option<f64> = None;
        let mut max: Option<f64> = None;
        let mut sum = 0.0;
        let mut n = 0usize;
        for v in values.into_iter().flatten() {
            min = Some(min.map_or(v, |m| m.min(v)));
            max = Some(max.map_or(v, |m| m.max(v)));
            sum += v;
            n += 1;
        }
        Self {
            column,
            min,
            max,
            avg: (n > 0).then(|| sum / n as f64),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Aggregates {
    pub total: u64,
    pub unique_locations: u64,
    pub columns: Vec<ColumnStats>,
}

impl Aggregates {
    pub fn stats(&self, column: Column) -> Option<&ColumnStats> {
        self.columns.iter().find(|s| s.column == column)
    }
}

/// What the storage boundary returns for a [`QuerySpec`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum QueryResult {
    Rows(Vec<RecordProjection>),
    Count(u64),
    Aggregates(Aggregates),
}

impl QueryResult {
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Rows(rows) => rows.is_empty(),
            Self::Count(n) => *n == 0,
            Self::Aggregates(agg) => agg.total == 0,
        }
    }
}

// ============================================================================
// Responses
// ============================================================================

/// Timing of one pipeline run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryStats {
    /// Normalize + classify + extract + synthesize, in microseconds
    pub analysis_time_us: u64,
    /// Storage round trip in milliseconds
    pub execution_time_ms: u64,
    /// Total time in milliseconds
    pub total_time_ms: u64,
}

/// Answer to one question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub narrative: String,
    pub records: Vec<RecordProjection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorKind>,
    pub intents: Vec<Intent>,
    pub stats: QueryStats,
}

impl Response {
    pub fn new(narrative: impl Into<String>, records: Vec<RecordProjection>) -> Self {
        Self {
            narrative: narrative.into(),
            records,
            error: None,
            intents: Vec::new(),
            stats: QueryStats::default(),
        }
    }

    pub fn with_error(mut self, kind: ErrorKind) -> Self {
        self.error = Some(kind);
        self
    }

    pub fn with_intents(mut self, intents: &IntentSet) -> Self {
        self.intents = intents.iter().collect();
        self
    }
}

/// Dashboard totals.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryStats {
    pub total_count: u64,
    pub unique_location_count: u64,
    pub avg_temperature: Option<f64>,
    pub avg_salinity: Option<f64>,
}

// ============================================================================
// Tests
// ============================================================================
