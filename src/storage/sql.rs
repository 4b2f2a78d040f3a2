//! SQL rendering for query specs.
//!
//! The SQL text is assembled only from fixed fragments and column names
//! owned by [`Column`]; every value from the question travels in
//! [`SqlStatement::params`] and is bound by the driver.

use crate::error::StorageError;
use crate::query::{Column, Constraint, ConstraintValue, Operator, QueryShape, QuerySpec};

/// A value bound to a `?` placeholder.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SqlParam {
    Real(f64),
    Integer(i64),
}

/// SQL text plus its parameters, in placeholder order.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlStatement {
    pub sql: String,
    pub params: Vec<SqlParam>,
}

impl SqlStatement {
    /// Render a query spec against `table`.
    pub fn render(spec: &QuerySpec, table: &str) -> Result<Self, StorageError> {
        if !is_identifier(table) {
            return Err(StorageError::Query(format!("invalid table name: {table:?}")));
        }

        let mut params = Vec::new();
        let where_clause = where_clause(spec, &mut params);

        let sql = match &spec.shape {
            QueryShape::Rows { projection } => {
                let columns = projection
                    .iter()
                    .map(|c| c.sql_name())
                    .collect::<Vec<_>>()
                    .join(", ");
                let order = match spec.order {
                    Some(order) => format!(
                        "{} {}, id ASC",
                        order.column.sql_name(),
                        order.direction.sql()
                    ),
                    None => "id ASC".to_string(),
                };
                params.push(SqlParam::Integer(spec.limit as i64));
                format!("SELECT {columns} FROM {table}{where_clause} ORDER BY {order} LIMIT ?")
            }
            QueryShape::Count => {
                format!("SELECT COUNT(*) AS total FROM {table}{where_clause}")
            }
            QueryShape::Aggregate { columns } => {
                let mut select = vec![
                    "COUNT(*) AS total".to_string(),
                    "COUNT(DISTINCT LATITUDE || ',' || LONGITUDE) AS unique_locations".to_string(),
                ];
                for column in columns {
                    let name = column.sql_name();
                    select.push(format!(
                        "MIN({name}) AS {min}, MAX({name}) AS {max}, AVG({name}) AS {avg}",
                        min = alias("min", *column),
                        max = alias("max", *column),
                        avg = alias("avg", *column),
                    ));
                }
                format!("SELECT {} FROM {table}{where_clause}", select.join(", "))
            }
        };

        Ok(Self { sql, params })
    }

    pub fn placeholder_count(&self) -> usize {
        self.sql.matches('?').count()
    }
}

/// Result column name of an aggregate.
pub fn alias(function: &str, column: Column) -> String {
    format!("{function}_{}", column.sql_name())
}

fn where_clause(spec: &QuerySpec, params: &mut Vec<SqlParam>) -> String {
    let mut conditions: Vec<String> = spec
        .required
        .iter()
        .map(|c| format!("{} IS NOT NULL", c.sql_name()))
        .collect();

    for constraint in &spec.constraints {
        conditions.push(condition(constraint));
        params.extend(constraint.bound_values().into_iter().map(SqlParam::Real));
    }

    if conditions.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", conditions.join(" AND "))
    }
}

fn condition(constraint: &Constraint) -> String {
    let name = constraint.column.sql_name();
    match (constraint.operator, constraint.value) {
        (_, ConstraintValue::Pair(..)) => format!("{name} BETWEEN ? AND ?"),
        (Operator::Between, ConstraintValue::Single(_)) => format!("{name} = ?"),
        (op, ConstraintValue::Single(_)) => format!("{name} {} ?", op.symbol()),
    }
}

/// Plain SQL identifier: ASCII letter or underscore, then letters, digits, underscores.
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

// ============================================================================
// Tests
// ============================================================================
