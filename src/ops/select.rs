//! Join and sort selects.

use crate::db::{DbPool, StatementExecutor};
use crate::error::DbResult;
use crate::models::{JoinSelectRequest, SortSelectRequest};
use crate::ops::outcome::OpOutcome;
use crate::sql::builder::{join_select_sql, sort_select_sql};

pub async fn join_select(
    executor: &StatementExecutor,
    pool: &DbPool,
    req: &JoinSelectRequest,
) -> DbResult<OpOutcome> {
    let sql = join_select_sql(req)?;
    fetch(executor, pool, sql, "Succeed: Join Table").await
}

pub async fn sort_select(
    executor: &StatementExecutor,
    pool: &DbPool,
    req: &SortSelectRequest,
) -> DbResult<OpOutcome> {
    let sql = sort_select_sql(req)?;
    fetch(executor, pool, sql, "Succeed: Sorted Table").await
}

async fn fetch(
    executor: &StatementExecutor,
    pool: &DbPool,
    sql: String,
    message: &str,
) -> DbResult<OpOutcome> {
    let rows = executor
        .fetch(pool, &sql, &[])
        .await
        .map_err(|e| e.with_sql(&sql))?;
    Ok(OpOutcome::succeed(message).with_sql(sql).with_rows(rows))
}
