//! Table DDL: create, drop, alter.

use tracing::info;

use crate::db::{DbPool, ForeignKeyValidator, StatementExecutor};
use crate::error::DbResult;
use crate::models::{AlterTableRequest, CreateTableRequest, DropTableRequest};
use crate::ops::outcome::OpOutcome;
use crate::sql::builder::{alter_table_sql, create_table_sql, drop_table_sql};
use crate::sql::constraints::foreign_key_target;

/// Create a table.
///
/// Every foreign-key target is validated against the catalog first; one
/// rejection aborts the create before any DDL is issued.
pub async fn create_table(
    executor: &StatementExecutor,
    pool: &DbPool,
    req: &CreateTableRequest,
) -> DbResult<OpOutcome> {
    let sql = create_table_sql(req, pool.db_type())?;

    for spec in &req.columns {
        if let Some(target) = foreign_key_target(spec)? {
            ForeignKeyValidator::validate(pool, target.table.trim(), target.column.trim()).await?;
        }
    }

    executor
        .execute(pool, &sql, &[])
        .await
        .map_err(|e| e.with_sql(&sql))?;

    let table = req.table.trim();
    info!(table = %table, "Created table");
    Ok(OpOutcome::succeed(format!("Succeed: Created Table {}", table)).with_sql(sql))
}

pub async fn drop_table(
    executor: &StatementExecutor,
    pool: &DbPool,
    req: &DropTableRequest,
) -> DbResult<OpOutcome> {
    let sql = drop_table_sql(req)?;
    executor
        .execute(pool, &sql, &[])
        .await
        .map_err(|e| e.with_sql(&sql))?;

    let table = req.table.trim();
    info!(table = %table, "Dropped table");
    Ok(OpOutcome::succeed(format!("Succeed: Dropped Table {}", table)).with_sql(sql))
}

pub async fn alter_table(
    executor: &StatementExecutor,
    pool: &DbPool,
    req: &AlterTableRequest,
) -> DbResult<OpOutcome> {
    let sql = alter_table_sql(req, pool.db_type())?;
    executor
        .execute(pool, &sql, &[])
        .await
        .map_err(|e| e.with_sql(&sql))?;

    let table = req.table.trim();
    info!(table = %table, command = req.command.as_str(), "Altered table");
    Ok(OpOutcome::succeed(format!("Succeed: Modified Table {}", table)).with_sql(sql))
}
