//! Response Composer.
//!
//! Turns a [`QueryResult`] into the narrative text and record payload handed
//! back to the caller. Each active intent has its own render function; their
//! sections are concatenated in intent order.

use super::types::{
    Column, ColumnStats, Intent, IntentSet, QueryResult, QueryShape, QuerySpec, RecordProjection,
    Response,
};
use crate::error::{ErrorKind, StorageError};

/// Records previewed in the narrative by default.
pub const DEFAULT_PREVIEW_ROWS: usize = 5;

/// Questions offered when nothing in the input was recognized.
pub const EXAMPLE_QUESTIONS: [&str; 6] = [
    "Show me a summary of the data",
    "Find profiles with temperature above 15 degrees",
    "What's the salinity range?",
    "Show me locations with high pressure",
    "How many profiles are there?",
    "Find profiles near latitude 40 degrees",
];

const EMPTY_NARRATIVE: &str = "No data found matching your criteria.";

/// Builds [`Response`]s.
#[derive(Debug, Clone)]
pub struct ResponseComposer {
    preview_rows: usize,
}

impl Default for ResponseComposer {
    fn default() -> Self {
        Self::new(DEFAULT_PREVIEW_ROWS)
    }
}

impl ResponseComposer {
    pub fn new(preview_rows: usize) -> Self {
        Self { preview_rows }
    }

    /// Compose the answer for an executed query.
    ///
    /// An empty result is a valid answer: it gets its own narrative and is
    /// tagged [`ErrorKind::EmptyResult`] for callers that care.
    pub fn compose(&self, intents: &IntentSet, spec: &QuerySpec, result: QueryResult) -> Response {
        if result.is_empty() {
            let mut narrative = EMPTY_NARRATIVE.to_string();
            if let Some(filters) = filters_line(spec) {
                narrative.push('\n');
                narrative.push_str(&filters);
            }
            return Response::new(narrative, Vec::new())
                .with_error(ErrorKind::EmptyResult)
                .with_intents(intents);
        }

        let ctx = RenderContext {
            intents,
            spec,
            result: &result,
        };

        let mut blocks = vec![header(&ctx)];
        blocks.extend(intents.iter().filter_map(|intent| render_intent(intent, &ctx)));
        if let QueryResult::Rows(rows) = &result {
            blocks.push(self.preview(rows, spec));
        }

        let records = match result {
            QueryResult::Rows(rows) => rows,
            QueryResult::Count(_) | QueryResult::Aggregates(_) => Vec::new(),
        };

        Response::new(blocks.join("\n\n"), records).with_intents(intents)
    }

    /// Guidance for a question no keyword matched.
    pub fn guidance(&self) -> Response {
        Response::new(guidance_text(), Vec::new())
            .with_error(ErrorKind::NoIntentMatched)
            .with_intents(&IntentSet::unknown())
    }

    /// Apology for a failed storage round trip.
    pub fn storage_failure(&self, intents: &IntentSet, err: &StorageError) -> Response {
        let kind = err.kind();
        let narrative = match kind {
            ErrorKind::SchemaMismatch => {
                "Sorry, the profile data is not in the layout I expect, so I can't answer \
                 that right now."
            }
            _ => "Sorry, I can't reach the profile data right now. Please try again in a moment.",
        };
        Response::new(narrative, Vec::new())
            .with_error(kind)
            .with_intents(intents)
    }

    fn preview(&self, rows: &[RecordProjection], spec: &QuerySpec) -> String {
        let projection: &[Column] = match &spec.shape {
            QueryShape::Rows { projection } => projection.as_slice(),
            _ => &[],
        };
        let shows = |column: Column| projection.contains(&column);

        let mut lines = Vec::new();
        for (i, row) in rows.iter().take(self.preview_rows).enumerate() {
            lines.push(format!("Profile {}:", i + 1));
            if shows(Column::Latitude) && shows(Column::Longitude) {
                lines.push(format!(
                    "  Location: {}, {}",
                    fmt_value(Column::Latitude, row.latitude),
                    fmt_value(Column::Longitude, row.longitude)
                ));
            }
            for column in [Column::Temp, Column::Psal, Column::Pres] {
                if shows(column) {
                    lines.push(format!(
                        "  {}: {}",
                        column.display_name(),
                        fmt_value(column, row.value(column))
                    ));
                }
            }
            if shows(Column::SourceFile) {
                lines.push(format!(
                    "  Source: {}",
                    row.source_file.as_deref().unwrap_or("N/A")
                ));
            }
        }

        if rows.len() > self.preview_rows {
            lines.push(format!(
                "...and {} more in the returned records.",
                rows.len() - self.preview_rows
            ));
        }
        lines.join("\n")
    }
}

// ============================================================================
// Rendering
// ============================================================================

struct RenderContext<'a> {
    intents: &'a IntentSet,
    spec: &'a QuerySpec,
    result: &'a QueryResult,
}

impl RenderContext<'_> {
    fn has(&self, intent: Intent) -> bool {
        self.intents.contains(intent)
    }

    /// Stats for a column: from the aggregates, or computed over returned rows.
    fn stats(&self, column: Column) -> Option<ColumnStats> {
        match (self.result, &self.spec.shape) {
            (QueryResult::Aggregates(agg), _) => agg.stats(column).copied(),
            (QueryResult::Rows(rows), QueryShape::Rows { projection })
                if projection.contains(&column) =>
            {
                Some(ColumnStats::from_values(column, rows.iter().map(|r| r.value(column))))
            }
            _ => None,
        }
    }
}

fn render_intent(intent: Intent, ctx: &RenderContext<'_>) -> Option<String> {
    match intent {
        Intent::Summary => render_summary(ctx),
        Intent::Count => render_count(ctx),
        Intent::Temperature | Intent::Salinity | Intent::Pressure => {
            intent.measurement_column().and_then(|c| render_measurement(c, ctx))
        }
        Intent::Location => render_location(ctx),
        Intent::Range => render_range(ctx),
        Intent::Visualization => render_visualization(ctx),
        Intent::Unknown => Some(guidance_text()),
    }
}

fn render_summary(ctx: &RenderContext<'_>) -> Option<String> {
    let QueryResult::Aggregates(agg) = ctx.result else {
        return None;
    };
    let mut lines = vec![
        format!("Total Profiles: {}", agg.total),
        format!("Unique Locations: {}", agg.unique_locations),
    ];
    lines.extend(agg.columns.iter().map(stats_line));
    Some(lines.join("\n"))
}

fn render_count(ctx: &RenderContext<'_>) -> Option<String> {
    match ctx.result {
        QueryResult::Count(n) => Some(format!("Total Profiles: {n}")),
        _ => None,
    }
}

fn render_measurement(column: Column, ctx: &RenderContext<'_>) -> Option<String> {
    if ctx.has(Intent::Summary) {
        return None;
    }
    ctx.stats(column).map(|s| stats_line(&s))
}

fn render_location(ctx: &RenderContext<'_>) -> Option<String> {
    if ctx.has(Intent::Summary) {
        return None;
    }
    match ctx.result {
        QueryResult::Rows(rows) => {
            let mut lines: Vec<String> = [Column::Latitude, Column::Longitude]
                .into_iter()
                .filter_map(|c| ctx.stats(c))
                .map(|s| stats_line(&s))
                .collect();
            lines.push(format!("Unique Locations: {}", unique_locations(rows)));
            Some(lines.join("\n"))
        }
        QueryResult::Aggregates(agg) => Some(format!("Unique Locations: {}", agg.unique_locations)),
        QueryResult::Count(_) => None,
    }
}

fn render_range(ctx: &RenderContext<'_>) -> Option<String> {
    if ctx.has(Intent::Summary) {
        return None;
    }
    let named = ctx.intents.measurement_columns();
    let lines: Vec<String> = Column::MEASUREMENTS
        .into_iter()
        .filter(|c| !named.contains(c))
        .filter(|c| {
            !(ctx.has(Intent::Location) && matches!(c, Column::Latitude | Column::Longitude))
        })
        .filter_map(|c| ctx.stats(c))
        .map(|s| stats_line(&s))
        .collect();
    (!lines.is_empty()).then(|| lines.join("\n"))
}

fn render_visualization(ctx: &RenderContext<'_>) -> Option<String> {
    let QueryResult::Rows(rows) = ctx.result else {
        return None;
    };
    let mappable = rows
        .iter()
        .filter(|r| r.latitude.is_some() && r.longitude.is_some())
        .count();
    Some(format!(
        "{mappable} of {} records have coordinates for plotting.",
        rows.len()
    ))
}

fn header(ctx: &RenderContext<'_>) -> String {
    let mut header = match ctx.result {
        QueryResult::Rows(rows) if rows.len() >= ctx.spec.limit => format!(
            "Found {} data points matching your query (limited to {}):",
            rows.len(),
            ctx.spec.limit
        ),
        QueryResult::Rows(rows) => format!("Found {} data points matching your query:", rows.len()),
        QueryResult::Count(_) => "Here's how many profiles match your query:".to_string(),
        QueryResult::Aggregates(_) if ctx.has(Intent::Summary) => {
            "Here's a summary of the oceanographic data:".to_string()
        }
        QueryResult::Aggregates(_) => "Here are the value ranges in the data:".to_string(),
    };
    if let Some(filters) = filters_line(ctx.spec) {
        header.push('\n');
        header.push_str(&filters);
    }
    header
}

fn filters_line(spec: &QuerySpec) -> Option<String> {
    if spec.constraints.is_empty() {
        return None;
    }
    let described: Vec<String> = spec.constraints.iter().map(|c| c.describe()).collect();
    Some(format!("Filters: {}", described.join(", ")))
}

fn guidance_text() -> String {
    let mut text = String::from(
        "I couldn't tell what you'd like to know about the float data. Try asking something like:",
    );
    for example in EXAMPLE_QUESTIONS {
        text.push_str("\n- ");
        text.push_str(example);
    }
    text
}

fn stats_line(stats: &ColumnStats) -> String {
    let column = stats.column;
    format!(
        "{} Range: {} to {} (average {})",
        column.display_name(),
        fmt_value(column, stats.min),
        fmt_value(column, stats.max),
        fmt_value(column, stats.avg)
    )
}

fn unique_locations(rows: &[RecordProjection]) -> usize {
    let mut pairs: Vec<(u64, u64)> = rows
        .iter()
        .filter_map(|r| Some((r.latitude?.to_bits(), r.longitude?.to_bits())))
        .collect();
    pairs.sort_unstable();
    pairs.dedup();
    pairs.len()
}

/// Two decimals, three for coordinates; `N/A` when missing.
pub fn fmt_value(column: Column, value: Option<f64>) -> String {
    let Some(v) = value else {
        return "N/A".to_string();
    };
    let digits = match column {
        Column::Latitude | Column::Longitude => 3,
        _ => 2,
    };
    format!("{v:.digits$}{}", column.unit())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::types::{Aggregates, Constraint};

    fn intents(list: &[Intent]) -> IntentSet {
        list.iter().copied().collect()
    }

    fn row(id: i64, lat: Option<f64>, temp: Option<f64>) -> RecordProjection {
        RecordProjection {
            id: Some(id),
            latitude: lat,
            longitude: lat.map(|_| -70.0),
            temperature: temp,
            ..Default::default()
        }
    }

    #[test]
    fn test_empty_result_narrative() {
        let spec = QuerySpec::rows(Column::ALL.to_vec(), 10)
            .with_constraints(vec![Constraint::greater_than(Column::Temp, 50.0)]);
        let response = ResponseComposer::default().compose(
            &intents(&[Intent::Temperature]),
            &spec,
            QueryResult::Rows(Vec::new()),
        );
        assert!(response.narrative.starts_with(EMPTY_NARRATIVE));
        assert!(response.narrative.contains("Temperature > 50"));
        assert_eq!(response.error, Some(ErrorKind::EmptyResult));
        assert!(response.records.is_empty());
    }

    #[test]
    fn test_missing_values_stay_null() {
        let spec = QuerySpec::rows(Column::ALL.to_vec(), 10);
        let rows = vec![row(1, Some(40.5), None), row(2, None, Some(15.0))];
        let response = ResponseComposer::default().compose(
            &intents(&[Intent::Temperature]),
            &spec,
            QueryResult::Rows(rows.clone()),
        );
        assert_eq!(response.records, rows);
        assert_eq!(response.records[0].temperature, None);
        assert!(response.narrative.contains("Temperature: N/A"));
        assert!(response.narrative.contains("Location: N/A, N/A"));
        assert!(response.error.is_none());

        let json = serde_json::to_value(&response.records[0]).unwrap();
        assert!(json["temperature"].is_null());
        assert!(json["salinity"].is_null());
    }

    #[test]
    fn test_sections_follow_intent_order() {
        let spec = QuerySpec::rows(Column::ALL.to_vec(), 10);
        let rows = vec![row(1, Some(40.5), Some(15.2)), row(2, Some(41.0), Some(14.8))];
        let response = ResponseComposer::default().compose(
            &intents(&[Intent::Location, Intent::Temperature]),
            &spec,
            QueryResult::Rows(rows),
        );
        let temp = response.narrative.find("Temperature Range").unwrap();
        let lat = response.narrative.find("Latitude Range").unwrap();
        assert!(temp < lat);
        assert!(response.narrative.contains("Temperature Range: 14.80°C to 15.20°C"));
        assert!(response.narrative.contains("Latitude Range: 40.500° to 41.000°"));
        assert!(response.narrative.contains("Unique Locations: 2"));
    }

    #[test]
    fn test_preview_is_bounded() {
        let spec = QuerySpec::rows(Column::ALL.to_vec(), 100);
        let rows: Vec<_> = (1..=8).map(|i| row(i, Some(40.0), Some(i as f64))).collect();
        let response = ResponseComposer::new(3).compose(
            &intents(&[Intent::Temperature]),
            &spec,
            QueryResult::Rows(rows),
        );
        assert!(response.narrative.contains("Profile 3:"));
        assert!(!response.narrative.contains("Profile 4:"));
        assert!(response.narrative.contains("...and 5 more"));
        assert_eq!(response.records.len(), 8);
    }

    #[test]
    fn test_summary_narrative() {
        let agg = Aggregates {
            total: 3,
            unique_locations: 2,
            columns: vec![ColumnStats {
                column: Column::Temp,
                min: Some(10.0),
                max: Some(30.0),
                avg: Some(20.0),
            }],
        };
        let response = ResponseComposer::default().compose(
            &intents(&[Intent::Summary, Intent::Temperature]),
            &QuerySpec::aggregate(vec![Column::Temp]),
            QueryResult::Aggregates(agg),
        );
        assert!(response.narrative.starts_with("Here's a summary"));
        assert!(response.narrative.contains("Total Profiles: 3"));
        assert!(response
            .narrative
            .contains("Temperature Range: 10.00°C to 30.00°C (average 20.00°C)"));
        assert_eq!(response.narrative.matches("Temperature Range").count(), 1);
        assert!(response.records.is_empty());
    }

    #[test]
    fn test_count_narrative() {
        let response = ResponseComposer::default().compose(
            &intents(&[Intent::Count]),
            &QuerySpec::count(),
            QueryResult::Count(42),
        );
        assert!(response.narrative.contains("Total Profiles: 42"));
        assert!(response.records.is_empty());
    }

    #[test]
    fn test_guidance_and_failure() {
        let composer = ResponseComposer::default();
        let guidance = composer.guidance();
        assert_eq!(guidance.error, Some(ErrorKind::NoIntentMatched));
        for example in EXAMPLE_QUESTIONS {
            assert!(guidance.narrative.contains(example));
        }

        let failure = composer.storage_failure(
            &intents(&[Intent::Count]),
            &StorageError::SchemaMismatch("TEMP".into()),
        );
        assert_eq!(failure.error, Some(ErrorKind::SchemaMismatch));
        assert!(failure.narrative.starts_with("Sorry"));
    }

    #[test]
    fn test_fmt_value() {
        assert_eq!(fmt_value(Column::Temp, None), "N/A");
        assert_eq!(fmt_value(Column::Psal, Some(35.14)), "35.14 PSU");
        assert_eq!(fmt_value(Column::Latitude, Some(40.5)), "40.500°");
    }
}
