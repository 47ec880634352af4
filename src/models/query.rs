//! Query-related data models.
//!
//! Bound parameter values, result sets and execution limits.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::time::Duration;

/// Default row limit for query results.
pub const DEFAULT_ROW_LIMIT: u32 = 1000;

/// Maximum allowed row limit.
pub const MAX_ROW_LIMIT: u32 = 100_000;

/// Default query timeout in seconds.
pub const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 30;

/// Maximum query timeout in seconds.
pub const MAX_QUERY_TIMEOUT_SECS: u64 = 600;

/// A parameter value for bound statements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueryParam {
    Null,
    Bool(bool),
    /// Stored as i64 for maximum range
    Int(i64),
    Float(f64),
    Text(String),
}

impl QueryParam {
    /// Convert a JSON cell into a parameter.
    ///
    /// Returns `None` for cells that render as SQL `NULL` (JSON null or a
    /// blank string); those are emitted as a literal instead of a placeholder.
    pub fn from_cell(value: &JsonValue) -> Option<Self> {
        match value {
            JsonValue::Null => None,
            JsonValue::String(s) if s.trim().is_empty() => None,
            JsonValue::String(s) => Some(Self::Text(s.clone())),
            JsonValue::Bool(b) => Some(Self::Bool(*b)),
            JsonValue::Number(n) => match n.as_i64() {
                Some(i) => Some(Self::Int(i)),
                None => n.as_f64().map(Self::Float),
            },
            other => Some(Self::Text(other.to_string())),
        }
    }
}

/// Rows returned by a read statement.
///
/// Rows are positional so duplicate column names (common in joins) survive.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RowSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<JsonValue>>,
    /// True when more rows existed than the configured row limit
    pub truncated: bool,
}

impl RowSet {
    /// Get the number of rows in the result.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Values of one named column, in row order.
    pub fn column_values(&self, name: &str) -> Vec<&JsonValue> {
        match self.columns.iter().position(|c| c == name) {
            Some(idx) => self.rows.iter().filter_map(|r| r.get(idx)).collect(),
            None => Vec::new(),
        }
    }
}

/// Per-statement limits applied by the executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionLimits {
    pub query_timeout_secs: u64,
    pub row_limit: u32,
}

impl ExecutionLimits {
    /// Build limits, clamping both values into their allowed ranges.
    pub fn new(query_timeout_secs: u64, row_limit: u32) -> Self {
        Self {
            query_timeout_secs: query_timeout_secs.clamp(1, MAX_QUERY_TIMEOUT_SECS),
            row_limit: row_limit.clamp(1, MAX_ROW_LIMIT),
        }
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }
}

impl Default for ExecutionLimits {
    fn default() -> Self {
        Self::new(DEFAULT_QUERY_TIMEOUT_SECS, DEFAULT_ROW_LIMIT)
    }
}
