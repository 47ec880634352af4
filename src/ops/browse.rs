//! Read-only browsing: database overview and table contents.

use serde::Serialize;
use tracing::debug;

use crate::db::{CatalogInspector, DbPool, StatementExecutor};
use crate::error::{DbError, DbResult};
use crate::models::{ColumnDefinition, DatabaseType, RowSet};

/// Connection status plus the table list.
#[derive(Debug, Clone, Serialize)]
pub struct DatabaseOverview {
    pub connected: bool,
    pub database_type: DatabaseType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_version: Option<String>,
    pub tables: Vec<String>,
}

/// Rows of one table with its declared column types.
#[derive(Debug, Clone, Serialize)]
pub struct TableData {
    pub message: String,
    pub table: String,
    pub columns: Vec<ColumnDefinition>,
    pub rows: RowSet,
}

pub async fn database_overview(pool: &DbPool) -> DbResult<DatabaseOverview> {
    let tables = CatalogInspector::list_tables(pool).await?;
    Ok(DatabaseOverview {
        connected: !pool.is_closed(),
        database_type: pool.db_type(),
        server_version: pool.server_version().await,
        tables,
    })
}

/// `SELECT *` over one table, capped by the executor's row limit.
pub async fn table_data(
    executor: &StatementExecutor,
    pool: &DbPool,
    table: &str,
) -> DbResult<TableData> {
    let table = table.trim();
    if table.is_empty() {
        return Err(DbError::validation("table", "Undefined Table Name"));
    }
    if !CatalogInspector::table_exists(pool, table).await? {
        return Err(DbError::reference(
            table,
            None,
            format!("Table '{}' does not exist", table),
        ));
    }

    let columns = CatalogInspector::columns(pool, table).await?;
    let sql = format!("SELECT * FROM {}", table);
    let rows = executor
        .fetch(pool, &sql, &[])
        .await
        .map_err(|e| e.with_sql(&sql))?;

    debug!(table = %table, rows = rows.row_count(), "Loaded table data");
    Ok(TableData {
        message: format!("Succeed: Loaded Table {}", table),
        table: table.to_string(),
        columns,
        rows,
    })
}
