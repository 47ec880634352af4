//! Operation outcomes and the report relayed to callers.

use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::error::{DbError, DbResult};
use crate::models::RowSet;

/// Whether an operation did something or legitimately matched nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OpStatus {
    Succeed,
    NoMatch,
}

/// Result of one successful operation.
#[derive(Debug, Clone, Serialize)]
pub struct OpOutcome {
    pub status: OpStatus,
    pub message: String,
    /// SQL that was executed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sql: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows_affected: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows: Option<RowSet>,
    /// Rendered text output (the ERD)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl OpOutcome {
    pub fn succeed(message: impl Into<String>) -> Self {
        Self {
            status: OpStatus::Succeed,
            message: message.into(),
            sql: None,
            rows_affected: None,
            rows: None,
            text: None,
        }
    }

    pub fn no_match(message: impl Into<String>) -> Self {
        Self {
            status: OpStatus::NoMatch,
            ..Self::succeed(message)
        }
    }

    pub fn with_sql(mut self, sql: impl Into<String>) -> Self {
        self.sql = Some(sql.into());
        self
    }

    pub fn with_rows_affected(mut self, count: u64) -> Self {
        self.rows_affected = Some(count);
        self
    }

    pub fn with_rows(mut self, rows: RowSet) -> Self {
        self.rows = Some(rows);
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn is_no_match(&self) -> bool {
        self.status == OpStatus::NoMatch
    }
}

/// The message/query/columns/rows tuple shown to the user.
///
/// Every message starts with `Succeed:` or `Failed:`; `failure` carries the
/// error category so callers can branch without parsing the message.
#[derive(Debug, Clone, Serialize)]
pub struct OpReport {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<JsonValue>>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub truncated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows_affected: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<&'static str>,
}

impl OpReport {
    pub fn from_result(result: DbResult<OpOutcome>) -> Self {
        match result {
            Ok(outcome) => Self::from(outcome),
            Err(err) => Self::from(err),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.failure.is_some()
    }
}

impl From<OpOutcome> for OpReport {
    fn from(outcome: OpOutcome) -> Self {
        let rows = outcome.rows.unwrap_or_default();
        Self {
            message: outcome.message,
            query: outcome.sql,
            columns: rows.columns,
            rows: rows.rows,
            truncated: rows.truncated,
            rows_affected: outcome.rows_affected,
            text: outcome.text,
            failure: None,
        }
    }
}

impl From<DbError> for OpReport {
    fn from(err: DbError) -> Self {
        Self {
            message: format!("Failed: {}", err),
            query: err.sql().map(String::from),
            columns: Vec::new(),
            rows: Vec::new(),
            truncated: false,
            rows_affected: None,
            text: None,
            failure: Some(err.category()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_success_report_carries_rows() {
        let outcome = OpOutcome::succeed("Succeed: Sorted Table")
            .with_sql("SELECT * FROM t ORDER BY a ASC")
            .with_rows(RowSet {
                columns: vec!["a".to_string()],
                rows: vec![vec![json!(1)]],
                truncated: false,
            });
        let report = OpReport::from_result(Ok(outcome));
        assert_eq!(report.message, "Succeed: Sorted Table");
        assert_eq!(report.query.as_deref(), Some("SELECT * FROM t ORDER BY a ASC"));
        assert_eq!(report.columns, vec!["a"]);
        assert!(!report.is_failure());
    }

    #[test]
    fn test_failure_report() {
        let err = DbError::execution("no such table: ghost", None).with_sql("SELECT * FROM ghost");
        let report = OpReport::from_result(Err(err));
        assert_eq!(report.message, "Failed: no such table: ghost");
        assert_eq!(report.query.as_deref(), Some("SELECT * FROM ghost"));
        assert_eq!(report.failure, Some("execution"));
    }

    #[test]
    fn test_no_match_is_not_failure() {
        let outcome = OpOutcome::no_match("Succeed: No Matching Rows to Delete").with_rows_affected(0);
        assert!(outcome.is_no_match());
        let report = OpReport::from(outcome);
        assert!(report.message.starts_with("Succeed:"));
        assert!(!report.is_failure());
        assert_eq!(report.rows_affected, Some(0));
    }

    #[test]
    fn test_report_serialization_skips_empty_fields() {
        let report = OpReport::from(OpOutcome::succeed("Succeed: Dropped Table t"));
        let value = serde_json::to_value(&report).unwrap();
        assert!(value.get("failure").is_none());
        assert!(value.get("truncated").is_none());
        assert_eq!(value["columns"], json!([]));
    }
}
