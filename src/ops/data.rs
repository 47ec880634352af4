//! Row changes: insert, update, delete.
//!
//! Zero affected rows on update or delete is a no-match outcome, not an
//! error.

use tracing::{debug, info};

use crate::db::{CatalogInspector, DbPool, StatementExecutor};
use crate::error::DbResult;
use crate::models::{DatabaseType, DeleteRequest, InsertRequest, UpdateRequest};
use crate::ops::outcome::OpOutcome;
use crate::sql::builder::{ColumnTypes, delete_sql, insert_sql, update_sql};

/// Declared column types, read only where placeholders need casts.
async fn column_types(pool: &DbPool, table: &str) -> DbResult<ColumnTypes> {
    if pool.db_type() != DatabaseType::PostgreSQL {
        return Ok(ColumnTypes::new());
    }
    let types: ColumnTypes = CatalogInspector::columns(pool, table.trim())
        .await?
        .into_iter()
        .map(|c| (c.name, c.data_type))
        .collect();
    debug!(table = %table, columns = types.len(), "Loaded column types for casts");
    Ok(types)
}

/// Insert every row with one statement inside a transaction.
pub async fn insert_rows(
    executor: &StatementExecutor,
    pool: &DbPool,
    req: &InsertRequest,
) -> DbResult<OpOutcome> {
    let types = column_types(pool, &req.table).await?;
    let built = insert_sql(req, pool.db_type(), &types)?;

    let count = executor
        .execute_in_transaction(pool, &built.sql, &built.params)
        .await
        .map_err(|e| e.with_sql(&built.sql))?;

    info!(table = %req.table.trim(), rows = count, "Inserted rows");
    Ok(OpOutcome::succeed(format!("Succeed: Inserted {} Row(s)", count))
        .with_sql(built.sql)
        .with_rows_affected(count))
}

pub async fn update_rows(
    executor: &StatementExecutor,
    pool: &DbPool,
    req: &UpdateRequest,
) -> DbResult<OpOutcome> {
    let types = column_types(pool, &req.table).await?;
    let built = update_sql(req, pool.db_type(), &types)?;

    let count = executor
        .execute(pool, &built.sql, &built.params)
        .await
        .map_err(|e| e.with_sql(&built.sql))?;

    let outcome = if count == 0 {
        OpOutcome::no_match("Succeed: No Matching Rows to Update")
    } else {
        info!(table = %req.table.trim(), rows = count, "Updated rows");
        OpOutcome::succeed(format!("Succeed: Updated {} Row(s)", count))
    };
    Ok(outcome.with_sql(built.sql).with_rows_affected(count))
}

pub async fn delete_rows(
    executor: &StatementExecutor,
    pool: &DbPool,
    req: &DeleteRequest,
) -> DbResult<OpOutcome> {
    let sql = delete_sql(req)?;

    let count = executor
        .execute(pool, &sql, &[])
        .await
        .map_err(|e| e.with_sql(&sql))?;

    let outcome = if count == 0 {
        OpOutcome::no_match("Succeed: No Matching Rows to Delete")
    } else {
        info!(table = %req.table.trim(), rows = count, "Deleted rows");
        OpOutcome::succeed(format!("Succeed: Deleted {} Row(s)", count))
    };
    Ok(outcome.with_sql(sql).with_rows_affected(count))
}
