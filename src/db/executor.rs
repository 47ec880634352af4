//! Statement execution.
//!
//! Every statement the engine issues goes through [`StatementExecutor`], which
//! applies the configured [`ExecutionLimits`]:
//! - reads stream at most `row_limit + 1` rows and flag truncation
//! - every round trip is bounded by the query timeout
//! - writes can run inside an explicit transaction that commits only on
//!   success
//!
//! Database-specific code lives in parallel submodules (`mysql`, `postgres`,
//! `sqlite`) with identical shapes.

use crate::db::pool::DbPool;
use crate::db::types::RowToJson;
use crate::error::{DbError, DbResult};
use crate::models::{ExecutionLimits, QueryParam, RowSet};
use futures_util::StreamExt;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Executes SQL against a pool within fixed limits.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatementExecutor {
    limits: ExecutionLimits,
}

impl StatementExecutor {
    pub fn new(limits: ExecutionLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> ExecutionLimits {
        self.limits
    }

    /// Run a read statement and return its rows.
    ///
    /// Column names come from the first row, or from the prepared statement's
    /// description when nothing matched.
    pub async fn fetch(&self, pool: &DbPool, sql: &str, params: &[QueryParam]) -> DbResult<RowSet> {
        let row_limit = self.limits.row_limit;
        let query_timeout = self.limits.query_timeout();

        debug!(sql = %sql, params = params.len(), limit = row_limit, "Executing read");

        let result = match pool {
            DbPool::MySql(p) => {
                let rows = mysql::fetch_rows(p, sql, params, row_limit, query_timeout).await?;
                into_row_set(rows, row_limit)
            }
            DbPool::Postgres(p) => {
                let rows = postgres::fetch_rows(p, sql, params, row_limit, query_timeout).await?;
                into_row_set(rows, row_limit)
            }
            DbPool::SQLite(p) => {
                let rows = sqlite::fetch_rows(p, sql, params, row_limit, query_timeout).await?;
                into_row_set(rows, row_limit)
            }
        };

        match result {
            Some(set) => Ok(set),
            None => Ok(RowSet {
                columns: self.column_names(pool, sql).await,
                rows: Vec::new(),
                truncated: false,
            }),
        }
    }

    /// Run a write statement in autocommit mode and return affected rows.
    pub async fn execute(&self, pool: &DbPool, sql: &str, params: &[QueryParam]) -> DbResult<u64> {
        let query_timeout = self.limits.query_timeout();
        debug!(sql = %sql, params = params.len(), "Executing write");

        match pool {
            DbPool::MySql(p) => mysql::execute(p, sql, params, query_timeout).await,
            DbPool::Postgres(p) => postgres::execute(p, sql, params, query_timeout).await,
            DbPool::SQLite(p) => sqlite::execute(p, sql, params, query_timeout).await,
        }
    }

    /// Run a write statement inside an explicit transaction.
    ///
    /// The transaction commits only if the statement succeeds; on error or
    /// timeout it is rolled back when dropped.
    pub async fn execute_in_transaction(
        &self,
        pool: &DbPool,
        sql: &str,
        params: &[QueryParam],
    ) -> DbResult<u64> {
        let query_timeout = self.limits.query_timeout();
        debug!(sql = %sql, params = params.len(), "Executing write in transaction");

        match pool {
            DbPool::MySql(p) => mysql::execute_in_transaction(p, sql, params, query_timeout).await,
            DbPool::Postgres(p) => {
                postgres::execute_in_transaction(p, sql, params, query_timeout).await
            }
            DbPool::SQLite(p) => {
                sqlite::execute_in_transaction(p, sql, params, query_timeout).await
            }
        }
    }

    /// Result column names of a statement, without running it.
    pub async fn column_names(&self, pool: &DbPool, sql: &str) -> Vec<String> {
        let described = match pool {
            DbPool::MySql(p) => mysql::describe_columns(p, sql).await,
            DbPool::Postgres(p) => postgres::describe_columns(p, sql).await,
            DbPool::SQLite(p) => sqlite::describe_columns(p, sql).await,
        };
        match described {
            Ok(columns) => columns,
            Err(e) => {
                warn!(error = %e, "Could not describe statement columns");
                Vec::new()
            }
        }
    }
}

/// Convert fetched rows into a row set; `None` when there were no rows.
fn into_row_set<R: RowToJson>(rows: Vec<R>, row_limit: u32) -> Option<RowSet> {
    let first = rows.first()?;
    let columns = first.column_names();
    let truncated = rows.len() > row_limit as usize;

    if truncated {
        warn!(limit = row_limit, "Result set truncated");
    }

    let rows = rows
        .iter()
        .take(row_limit as usize)
        .map(|r| r.to_json_values(true))
        .collect();

    Some(RowSet {
        columns,
        rows,
        truncated,
    })
}

fn collect_rows<R>(results: Vec<Result<R, sqlx::Error>>) -> DbResult<Vec<R>> {
    let mut rows = Vec::with_capacity(results.len());
    for result in results {
        rows.push(result.map_err(DbError::from)?);
    }
    Ok(rows)
}

fn timeout_error(operation: &str, timeout: Duration) -> DbError {
    DbError::timeout(operation, timeout.as_secs() as u32)
}

mod mysql {
    use super::*;
    use crate::db::params::bind_mysql_param;
    use sqlx::mysql::MySqlRow;
    use sqlx::{Column, Executor as _, MySqlPool};

    pub async fn fetch_rows(
        pool: &MySqlPool,
        sql: &str,
        params: &[QueryParam],
        row_limit: u32,
        query_timeout: Duration,
    ) -> DbResult<Vec<MySqlRow>> {
        let fetch_limit = row_limit as usize + 1;
        // Without params, send the text protocol so statements MySQL cannot
        // prepare still work.
        let rows_future = if params.is_empty() {
            pool.fetch(sql).take(fetch_limit).collect::<Vec<_>>()
        } else {
            let mut query = sqlx::query(sql);
            for param in params {
                query = bind_mysql_param(query, param);
            }
            query.fetch(pool).take(fetch_limit).collect::<Vec<_>>()
        };

        match timeout(query_timeout, rows_future).await {
            Ok(results) => collect_rows(results),
            Err(_) => Err(timeout_error("query execution", query_timeout)),
        }
    }

    pub async fn execute(
        pool: &MySqlPool,
        sql: &str,
        params: &[QueryParam],
        query_timeout: Duration,
    ) -> DbResult<u64> {
        let result = if params.is_empty() {
            timeout(query_timeout, pool.execute(sql)).await
        } else {
            let mut query = sqlx::query(sql);
            for param in params {
                query = bind_mysql_param(query, param);
            }
            timeout(query_timeout, query.execute(pool)).await
        };

        match result {
            Ok(Ok(r)) => Ok(r.rows_affected()),
            Ok(Err(e)) => Err(DbError::from(e)),
            Err(_) => Err(timeout_error("write operation", query_timeout)),
        }
    }

    pub async fn execute_in_transaction(
        pool: &MySqlPool,
        sql: &str,
        params: &[QueryParam],
        query_timeout: Duration,
    ) -> DbResult<u64> {
        let work = async {
            let mut tx = pool.begin().await?;
            let affected = if params.is_empty() {
                (&mut *tx).execute(sql).await?.rows_affected()
            } else {
                let mut query = sqlx::query(sql);
                for param in params {
                    query = bind_mysql_param(query, param);
                }
                query.execute(&mut *tx).await?.rows_affected()
            };
            tx.commit().await?;
            Ok::<u64, sqlx::Error>(affected)
        };

        match timeout(query_timeout, work).await {
            Ok(result) => result.map_err(DbError::from),
            Err(_) => Err(timeout_error("transaction", query_timeout)),
        }
    }

    pub async fn describe_columns(pool: &MySqlPool, sql: &str) -> DbResult<Vec<String>> {
        let described = pool.describe(sql).await?;
        Ok(described
            .columns()
            .iter()
            .map(|c| c.name().to_string())
            .collect())
    }
}

mod postgres {
    use super::*;
    use crate::db::params::bind_postgres_param;
    use sqlx::postgres::PgRow;
    use sqlx::{Column, Executor as _, PgPool};

    pub async fn fetch_rows(
        pool: &PgPool,
        sql: &str,
        params: &[QueryParam],
        row_limit: u32,
        query_timeout: Duration,
    ) -> DbResult<Vec<PgRow>> {
        let fetch_limit = row_limit as usize + 1;
        let rows_future = if params.is_empty() {
            pool.fetch(sql).take(fetch_limit).collect::<Vec<_>>()
        } else {
            let mut query = sqlx::query(sql);
            for param in params {
                query = bind_postgres_param(query, param);
            }
            query.fetch(pool).take(fetch_limit).collect::<Vec<_>>()
        };

        match timeout(query_timeout, rows_future).await {
            Ok(results) => collect_rows(results),
            Err(_) => Err(timeout_error("query execution", query_timeout)),
        }
    }

    pub async fn execute(
        pool: &PgPool,
        sql: &str,
        params: &[QueryParam],
        query_timeout: Duration,
    ) -> DbResult<u64> {
        let result = if params.is_empty() {
            timeout(query_timeout, pool.execute(sql)).await
        } else {
            let mut query = sqlx::query(sql);
            for param in params {
                query = bind_postgres_param(query, param);
            }
            timeout(query_timeout, query.execute(pool)).await
        };

        match result {
            Ok(Ok(r)) => Ok(r.rows_affected()),
            Ok(Err(e)) => Err(DbError::from(e)),
            Err(_) => Err(timeout_error("write operation", query_timeout)),
        }
    }

    pub async fn execute_in_transaction(
        pool: &PgPool,
        sql: &str,
        params: &[QueryParam],
        query_timeout: Duration,
    ) -> DbResult<u64> {
        let work = async {
            let mut tx = pool.begin().await?;
            let affected = if params.is_empty() {
                (&mut *tx).execute(sql).await?.rows_affected()
            } else {
                let mut query = sqlx::query(sql);
                for param in params {
                    query = bind_postgres_param(query, param);
                }
                query.execute(&mut *tx).await?.rows_affected()
            };
            tx.commit().await?;
            Ok::<u64, sqlx::Error>(affected)
        };

        match timeout(query_timeout, work).await {
            Ok(result) => result.map_err(DbError::from),
            Err(_) => Err(timeout_error("transaction", query_timeout)),
        }
    }

    pub async fn describe_columns(pool: &PgPool, sql: &str) -> DbResult<Vec<String>> {
        let described = pool.describe(sql).await?;
        Ok(described
            .columns()
            .iter()
            .map(|c| c.name().to_string())
            .collect())
    }
}

mod sqlite {
    use super::*;
    use crate::db::params::bind_sqlite_param;
    use sqlx::sqlite::SqliteRow;
    use sqlx::{Column, Executor as _, SqlitePool};

    pub async fn fetch_rows(
        pool: &SqlitePool,
        sql: &str,
        params: &[QueryParam],
        row_limit: u32,
        query_timeout: Duration,
    ) -> DbResult<Vec<SqliteRow>> {
        let fetch_limit = row_limit as usize + 1;
        let rows_future = if params.is_empty() {
            pool.fetch(sql).take(fetch_limit).collect::<Vec<_>>()
        } else {
            let mut query = sqlx::query(sql);
            for param in params {
                query = bind_sqlite_param(query, param);
            }
            query.fetch(pool).take(fetch_limit).collect::<Vec<_>>()
        };

        match timeout(query_timeout, rows_future).await {
            Ok(results) => collect_rows(results),
            Err(_) => Err(timeout_error("query execution", query_timeout)),
        }
    }

    pub async fn execute(
        pool: &SqlitePool,
        sql: &str,
        params: &[QueryParam],
        query_timeout: Duration,
    ) -> DbResult<u64> {
        let result = if params.is_empty() {
            timeout(query_timeout, pool.execute(sql)).await
        } else {
            let mut query = sqlx::query(sql);
            for param in params {
                query = bind_sqlite_param(query, param);
            }
            timeout(query_timeout, query.execute(pool)).await
        };

        match result {
            Ok(Ok(r)) => Ok(r.rows_affected()),
            Ok(Err(e)) => Err(DbError::from(e)),
            Err(_) => Err(timeout_error("write operation", query_timeout)),
        }
    }

    pub async fn execute_in_transaction(
        pool: &SqlitePool,
        sql: &str,
        params: &[QueryParam],
        query_timeout: Duration,
    ) -> DbResult<u64> {
        let work = async {
            let mut tx = pool.begin().await?;
            let affected = if params.is_empty() {
                (&mut *tx).execute(sql).await?.rows_affected()
            } else {
                let mut query = sqlx::query(sql);
                for param in params {
                    query = bind_sqlite_param(query, param);
                }
                query.execute(&mut *tx).await?.rows_affected()
            };
            tx.commit().await?;
            Ok::<u64, sqlx::Error>(affected)
        };

        match timeout(query_timeout, work).await {
            Ok(result) => result.map_err(DbError::from),
            Err(_) => Err(timeout_error("transaction", query_timeout)),
        }
    }

    pub async fn describe_columns(pool: &SqlitePool, sql: &str) -> DbResult<Vec<String>> {
        let described = pool.describe(sql).await?;
        Ok(described
            .columns()
            .iter()
            .map(|c| c.name().to_string())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PoolOptions;
    use crate::db::pool::create_pool;
    use crate::models::DatabaseType;
    use serde_json::json;

    async fn memory_pool() -> DbPool {
        create_pool("sqlite::memory:", DatabaseType::SQLite, &PoolOptions::default())
            .await
            .unwrap()
    }

    #[test]
    fn test_executor_defaults() {
        let executor = StatementExecutor::default();
        assert_eq!(executor.limits(), ExecutionLimits::default());
    }

    #[tokio::test]
    async fn test_fetch_truncates_at_row_limit() {
        let pool = memory_pool().await;
        let executor = StatementExecutor::new(ExecutionLimits::new(5, 2));
        executor
            .execute(&pool, "CREATE TABLE t (id INTEGER PRIMARY KEY, name TEXT)", &[])
            .await
            .unwrap();
        executor
            .execute(&pool, "INSERT INTO t (name) VALUES ('a'), ('b'), ('c')", &[])
            .await
            .unwrap();

        let set = executor
            .fetch(&pool, "SELECT id, name FROM t ORDER BY id", &[])
            .await
            .unwrap();
        assert_eq!(set.columns, vec!["id", "name"]);
        assert_eq!(set.row_count(), 2);
        assert!(set.truncated);
        assert_eq!(set.rows[0], vec![json!(1), json!("a")]);
    }

    #[tokio::test]
    async fn test_empty_result_keeps_column_names() {
        let pool = memory_pool().await;
        let executor = StatementExecutor::default();
        executor
            .execute(&pool, "CREATE TABLE t (id INTEGER, label TEXT)", &[])
            .await
            .unwrap();

        let set = executor
            .fetch(
                &pool,
                "SELECT id, label FROM t WHERE id = ?",
                &[QueryParam::Int(7)],
            )
            .await
            .unwrap();
        assert_eq!(set.columns, vec!["id", "label"]);
        assert!(set.rows.is_empty());
        assert!(!set.truncated);
    }

    #[tokio::test]
    async fn test_failed_transaction_rolls_back() {
        let pool = memory_pool().await;
        let executor = StatementExecutor::default();
        executor
            .execute(&pool, "CREATE TABLE t (id INTEGER PRIMARY KEY)", &[])
            .await
            .unwrap();

        let affected = executor
            .execute_in_transaction(
                &pool,
                "INSERT INTO t (id) VALUES (?), (?)",
                &[QueryParam::Int(1), QueryParam::Int(2)],
            )
            .await
            .unwrap();
        assert_eq!(affected, 2);

        // Duplicate key on the second row fails the whole statement
        let err = executor
            .execute_in_transaction(
                &pool,
                "INSERT INTO t (id) VALUES (?), (?)",
                &[QueryParam::Int(3), QueryParam::Int(1)],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Execution { .. }));

        let set = executor
            .fetch(&pool, "SELECT COUNT(*) AS n FROM t", &[])
            .await
            .unwrap();
        assert_eq!(set.rows[0][0], json!(2));
    }
}
