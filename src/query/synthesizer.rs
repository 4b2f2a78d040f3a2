//! Query Synthesizer.
//!
//! Builds a read-only [`QuerySpec`] from the active intents and extracted
//! constraints. Literal values stay inside [`Constraint`]s; turning them into
//! bound parameters is the storage layer's job, see `storage::sql`.

use super::extractor::Extraction;
use super::types::{Column, Intent, IntentSet, OrderBy, QuerySpec, SortDirection};

/// Maximum rows any query may return, whatever the question asks for.
pub const DEFAULT_MAX_ROWS: usize = 1000;

/// Turns intents and constraints into a [`QuerySpec`].
#[derive(Debug, Clone)]
pub struct QuerySynthesizer {
    max_rows: usize,
}

impl Default for QuerySynthesizer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ROWS)
    }
}

impl QuerySynthesizer {
    pub fn new(max_rows: usize) -> Self {
        Self {
            max_rows: max_rows.max(1),
        }
    }

    pub fn max_rows(&self) -> usize {
        self.max_rows
    }

    /// Build the query for one request.
    ///
    /// Shape precedence: summary, count, unconstrained range, rows.
    pub fn synthesize(&self, intents: &IntentSet, extraction: &Extraction) -> QuerySpec {
        let constraints = extraction.constraints.clone();
        let measured = intents.measurement_columns();

        if intents.contains(Intent::Summary) {
            return QuerySpec::aggregate(Column::MEASUREMENTS.to_vec()).with_constraints(constraints);
        }

        if intents.contains(Intent::Count) {
            return QuerySpec::count().with_constraints(constraints);
        }

        if intents.contains(Intent::Range) && constraints.is_empty() {
            let columns = if measured.is_empty() {
                Column::MEASUREMENTS.to_vec()
            } else {
                measured
            };
            return QuerySpec::aggregate(columns);
        }

        let location_only = intents.contains(Intent::Location)
            && constraints.is_empty()
            && measured.is_empty()
            && !intents.contains(Intent::Visualization);
        let projection = if location_only {
            Column::LOCATION.to_vec()
        } else {
            Column::ALL.to_vec()
        };

        let mut required = measured.clone();
        if location_only || intents.contains(Intent::Visualization) {
            required.extend([Column::Latitude, Column::Longitude]);
        }

        let order = measured.first().map(|&column| OrderBy {
            column,
            direction: extraction.direction.unwrap_or(SortDirection::Desc),
        });

        let limit = extraction
            .limit
            .map_or(self.max_rows, |n| n.min(self.max_rows));

        QuerySpec::rows(projection, limit)
            .with_constraints(constraints)
            .with_required(required)
            .with_order(order)
    }
}

// ============================================================================
// Tests
// ============================================================================
