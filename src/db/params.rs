//! Parameter binding for bound statements.
//!
//! Only insert and update statements carry parameters: each non-blank cell of
//! an inserted row, each `SET` value and the update's condition value. Blank
//! cells never reach here; the builder writes them as a literal `NULL`.

use crate::models::QueryParam;
use sqlx::mysql::MySqlArguments;
use sqlx::postgres::PgArguments;
use sqlx::sqlite::SqliteArguments;
use sqlx::{MySql, Postgres, Sqlite};

/// Bind one insert/update cell to a MySQL query (`?` placeholder).
pub(crate) fn bind_mysql_param<'q>(
    query: sqlx::query::Query<'q, MySql, MySqlArguments>,
    param: &'q QueryParam,
) -> sqlx::query::Query<'q, MySql, MySqlArguments> {
    match param {
        QueryParam::Null => query.bind(None::<String>),
        QueryParam::Bool(v) => query.bind(*v),
        QueryParam::Int(v) => query.bind(*v),
        QueryParam::Float(v) => query.bind(*v),
        QueryParam::Text(v) => query.bind(v.as_str()),
    }
}

/// Bind one insert/update cell to a PostgreSQL query.
///
/// Form input arrives as text, so most cells bind as text; the
/// `CAST($n AS <declared type>)` placeholder converts them to the column type.
pub(crate) fn bind_postgres_param<'q>(
    query: sqlx::query::Query<'q, Postgres, PgArguments>,
    param: &'q QueryParam,
) -> sqlx::query::Query<'q, Postgres, PgArguments> {
    match param {
        QueryParam::Null => query.bind(None::<String>),
        QueryParam::Bool(v) => query.bind(*v),
        QueryParam::Int(v) => query.bind(*v),
        QueryParam::Float(v) => query.bind(*v),
        QueryParam::Text(v) => query.bind(v.as_str()),
    }
}

/// Bind one insert/update cell to a SQLite query. Column affinity converts
/// numeric text on storage.
pub(crate) fn bind_sqlite_param<'q>(
    query: sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>,
    param: &'q QueryParam,
) -> sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>> {
    match param {
        QueryParam::Null => query.bind(None::<String>),
        QueryParam::Bool(v) => query.bind(*v),
        QueryParam::Int(v) => query.bind(*v),
        QueryParam::Float(v) => query.bind(*v),
        QueryParam::Text(v) => query.bind(v.as_str()),
    }
}
