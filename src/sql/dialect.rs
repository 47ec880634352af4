//! Per-dialect spellings.
//!
//! The engine emits one SQL family; only these few tokens differ between
//! MySQL, PostgreSQL and SQLite.

use crate::models::DatabaseType;

/// Bind placeholder for the `index`-th parameter (1-based).
///
/// PostgreSQL placeholders are wrapped in a cast to the declared column type
/// when it is known, so text values coerce to the column.
pub fn placeholder(db: DatabaseType, index: usize, cast_type: Option<&str>) -> String {
    match db {
        DatabaseType::PostgreSQL => match cast_type.map(str::trim).filter(|t| !t.is_empty()) {
            Some(ty) => format!("CAST(${} AS {})", index, ty),
            None => format!("${}", index),
        },
        DatabaseType::MySQL | DatabaseType::SQLite => "?".to_string(),
    }
}

pub fn auto_increment_keyword(db: DatabaseType) -> &'static str {
    match db {
        DatabaseType::MySQL => "AUTO_INCREMENT",
        DatabaseType::SQLite => "AUTOINCREMENT",
        DatabaseType::PostgreSQL => "GENERATED BY DEFAULT AS IDENTITY",
    }
}

/// Column type change clause, or `None` when the dialect has no such clause.
pub fn modify_column_clause(db: DatabaseType, column: &str, data_type: &str) -> Option<String> {
    match db {
        DatabaseType::MySQL => Some(format!("MODIFY COLUMN {} {}", column, data_type)),
        DatabaseType::PostgreSQL => Some(format!("ALTER COLUMN {} TYPE {}", column, data_type)),
        DatabaseType::SQLite => None,
    }
}

/// Quote free text as a SQL string literal.
pub fn quote_literal(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}
