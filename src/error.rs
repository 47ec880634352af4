//! Error types for the workbench engine.
//!
//! Every failure is classified into one of a small set of variants so callers
//! can branch on the category (validation, reference, execution, connection)
//! without matching on message text. Zero-row outcomes are not errors; see
//! [`crate::ops::OpStatus`].

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    /// Missing or malformed input, detected before touching the database.
    #[error("{message}")]
    Validation { field: String, message: String },

    /// A referenced table or column is missing or not a legal target.
    #[error("{message}")]
    Reference {
        table: String,
        column: Option<String>,
        message: String,
    },

    /// The database rejected the statement.
    #[error("{message}")]
    Execution {
        message: String,
        /// e.g., "42P01" for undefined table
        sql_state: Option<String>,
        sql: Option<String>,
    },

    #[error("Connection failed: {message}")]
    Connection {
        message: String,
        suggestion: String,
        sql: Option<String>,
    },

    #[error("No Active DB Connection")]
    NoActiveConnection,

    #[error("Timeout: {operation} exceeded {elapsed_secs}s")]
    Timeout {
        operation: String,
        elapsed_secs: u32,
        sql: Option<String>,
    },

    #[error("Internal error: {message}")]
    Internal {
        message: String,
        sql: Option<String>,
    },
}

impl DbError {
    /// Create a validation error for a named input field.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a reference error naming the offending table (and column, if any).
    pub fn reference(
        table: impl Into<String>,
        column: Option<&str>,
        message: impl Into<String>,
    ) -> Self {
        Self::Reference {
            table: table.into(),
            column: column.map(String::from),
            message: message.into(),
        }
    }

    /// Create an execution error with optional SQL state.
    pub fn execution(message: impl Into<String>, sql_state: Option<String>) -> Self {
        Self::Execution {
            message: clean_driver_message(&message.into()),
            sql_state,
            sql: None,
        }
    }

    /// Create a connection error with a helpful suggestion.
    pub fn connection(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            suggestion: suggestion.into(),
            sql: None,
        }
    }

    /// Create a timeout error.
    pub fn timeout(operation: impl Into<String>, elapsed_secs: u32) -> Self {
        Self::Timeout {
            operation: operation.into(),
            elapsed_secs,
            sql: None,
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            sql: None,
        }
    }

    /// Attach the SQL text that was attempted.
    ///
    /// Every failure raised after a statement reached the pool carries it;
    /// validation, reference and missing-session errors happen before any SQL
    /// is sent and are returned unchanged.
    pub fn with_sql(mut self, statement: impl Into<String>) -> Self {
        if let Some(slot) = self.sql_slot() {
            *slot = Some(statement.into());
        }
        self
    }

    /// The SQL text attached to this error, if any.
    pub fn sql(&self) -> Option<&str> {
        match self {
            Self::Execution { sql, .. }
            | Self::Connection { sql, .. }
            | Self::Timeout { sql, .. }
            | Self::Internal { sql, .. } => sql.as_deref(),
            Self::Validation { .. } | Self::Reference { .. } | Self::NoActiveConnection => None,
        }
    }

    fn sql_slot(&mut self) -> Option<&mut Option<String>> {
        match self {
            Self::Execution { sql, .. }
            | Self::Connection { sql, .. }
            | Self::Timeout { sql, .. }
            | Self::Internal { sql, .. } => Some(sql),
            Self::Validation { .. } | Self::Reference { .. } | Self::NoActiveConnection => None,
        }
    }

    /// Get the suggestion for this error, if available.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Connection { suggestion, .. } => Some(suggestion),
            _ => None,
        }
    }

    /// Stable category name for callers that branch on the failure kind.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "validation",
            Self::Reference { .. } => "reference",
            Self::Execution { .. } | Self::Timeout { .. } => "execution",
            Self::Connection { .. } | Self::NoActiveConnection => "connection",
            Self::Internal { .. } => "internal",
        }
    }
}

/// Strip driver boilerplate from a database diagnostic, keeping the root cause.
///
/// Removes the `error returned from database:` wrapper, MySQL-style
/// `1146 (42S02): ` code prefixes and a trailing
/// `(Background on this error at: ...)` link. URLs quoted inside the
/// diagnostic, such as an offending value, are kept.
pub fn clean_driver_message(raw: &str) -> String {
    let mut message = raw.trim();

    if let Some(rest) = message.strip_prefix("error returned from database:") {
        message = rest.trim_start();
    }

    // "1146 (42S02): Table 'shop.items' doesn't exist"
    if let Some((head, tail)) = message.split_once("): ") {
        let mut parts = head.splitn(2, " (");
        let code = parts.next().unwrap_or_default();
        let state = parts.next().unwrap_or_default();
        if !code.is_empty()
            && code.chars().all(|c| c.is_ascii_digit())
            && state.len() == 5
            && state.chars().all(|c| c.is_ascii_alphanumeric())
        {
            message = tail;
        }
    }

    message = strip_trailing_link(message);
    message.trim().to_string()
}

/// Drop a `(Background on this error at: <url>)` group that ends the message.
fn strip_trailing_link(message: &str) -> &str {
    let message = message.trim_end();
    if message.ends_with(')') {
        if let Some(idx) = message.rfind("(Background on this error at:") {
            if !message[idx..message.len() - 1].contains(')') {
                return message[..idx].trim_end();
            }
        }
    }
    message
}

/// Convert sqlx errors to DbError.
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Configuration(msg) => DbError::connection(
                msg.to_string(),
                "Check the connection string format and credentials",
            ),
            sqlx::Error::Database(db_err) => {
                let code = db_err.code().map(|c| c.to_string());
                DbError::execution(db_err.message(), code)
            }
            sqlx::Error::RowNotFound => DbError::execution("No rows returned", None),
            sqlx::Error::PoolTimedOut => DbError::timeout("connection pool acquire", 30),
            sqlx::Error::PoolClosed => {
                DbError::connection("Connection pool is closed", "Reconnect to the database")
            }
            sqlx::Error::Io(io_err) => DbError::connection(
                format!("I/O error: {}", io_err),
                "Check network connectivity and database server status",
            ),
            sqlx::Error::Tls(tls_err) => DbError::connection(
                format!("TLS error: {}", tls_err),
                "Verify TLS configuration and certificates",
            ),
            sqlx::Error::Protocol(msg) => DbError::connection(
                format!("Protocol error: {}", msg),
                "Check database server compatibility",
            ),
            sqlx::Error::ColumnNotFound(col) => {
                DbError::internal(format!("Column not found in result: {}", col))
            }
            sqlx::Error::ColumnDecode { index, source } => {
                DbError::internal(format!("Failed to decode column {}: {}", index, source))
            }
            sqlx::Error::Decode(source) => DbError::internal(format!("Decode error: {}", source)),
            sqlx::Error::WorkerCrashed => DbError::internal("Database worker crashed"),
            _ => DbError::internal(format!("Unknown database error: {}", err)),
        }
    }
}

/// Result type alias for database operations.
pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DbError::connection("Failed to connect", "Check credentials");
        assert!(err.to_string().contains("Connection failed"));
        assert_eq!(DbError::NoActiveConnection.to_string(), "No Active DB Connection");
    }

    #[test]
    fn test_validation_display_is_bare_message() {
        let err = DbError::validation("url", "Required DB URL");
        assert_eq!(err.to_string(), "Required DB URL");
        assert_eq!(err.category(), "validation");
    }

    #[test]
    fn test_with_sql_attaches_to_post_dispatch_failures() {
        let err = DbError::execution("syntax error", None).with_sql("SELEC 1");
        assert_eq!(err.sql(), Some("SELEC 1"));

        let err = DbError::timeout("query execution", 1).with_sql("SELECT 1");
        assert_eq!(err.sql(), Some("SELECT 1"));
        assert_eq!(err.to_string(), "Timeout: query execution exceeded 1s");

        let err = DbError::connection("Connection pool is closed", "Reconnect").with_sql("SELECT 2");
        assert_eq!(err.sql(), Some("SELECT 2"));

        let err = DbError::internal("Decode error: bad utf-8").with_sql("SELECT 3");
        assert_eq!(err.sql(), Some("SELECT 3"));
    }

    #[test]
    fn test_with_sql_ignored_before_dispatch() {
        let err = DbError::validation("table", "Undefined Table").with_sql("SELECT 1");
        assert_eq!(err.sql(), None);

        let err = DbError::reference("t", None, "Table 't' does not exist").with_sql("SELECT 1");
        assert_eq!(err.sql(), None);
        assert_eq!(DbError::NoActiveConnection.with_sql("SELECT 1").sql(), None);
    }

    #[test]
    fn test_clean_driver_message_strips_mysql_code() {
        assert_eq!(
            clean_driver_message("1146 (42S02): Table 'shop.items' doesn't exist"),
            "Table 'shop.items' doesn't exist"
        );
    }

    #[test]
    fn test_clean_driver_message_strips_wrapper_and_link() {
        let raw = "error returned from database: no such table: items (Background on this error at: https://sqlalche.me/e/20/e3q8)";
        assert_eq!(clean_driver_message(raw), "no such table: items");
    }

    #[test]
    fn test_clean_driver_message_keeps_quoted_urls() {
        assert_eq!(
            clean_driver_message(
                "1062 (23000): Duplicate entry 'https://example.com/a' for key 'links.url'"
            ),
            "Duplicate entry 'https://example.com/a' for key 'links.url'"
        );
        assert_eq!(
            clean_driver_message("UNIQUE constraint failed: links.url (value http://x.io)"),
            "UNIQUE constraint failed: links.url (value http://x.io)"
        );
    }

    #[test]
    fn test_clean_driver_message_link_must_end_message() {
        // a background note in the middle is part of the diagnostic
        let raw = "check failed (Background on this error at: https://sqlalche.me/e/20/gkpj) for row 3";
        assert_eq!(clean_driver_message(raw), raw);
    }

    #[test]
    fn test_clean_driver_message_keeps_plain_text() {
        assert_eq!(
            clean_driver_message("relation \"items\" does not exist"),
            "relation \"items\" does not exist"
        );
        // parenthesised text that is not a code prefix stays
        assert_eq!(
            clean_driver_message("near \"(\": syntax error (code 1): bad"),
            "near \"(\": syntax error (code 1): bad"
        );
    }

    #[test]
    fn test_suggestion() {
        let err = DbError::connection("refused", "Start the server");
        assert_eq!(err.suggestion(), Some("Start the server"));
        assert_eq!(DbError::internal("x").suggestion(), None);
    }
}
