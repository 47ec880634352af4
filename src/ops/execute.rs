//! Ad-hoc SQL.

use tracing::info;

use crate::db::{DbPool, StatementExecutor};
use crate::error::{DbError, DbResult};
use crate::models::RawExecRequest;
use crate::ops::outcome::OpOutcome;

const SUCCESS_MESSAGE: &str = "Succeed: Query executed successfully";

/// Whether `sql` starts with the SELECT keyword, in any case.
pub fn is_select(sql: &str) -> bool {
    sql.trim_start()
        .get(..6)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("select"))
}

/// Run user-typed SQL: SELECTs return rows, anything else runs in a
/// transaction and reports the affected row count.
pub async fn raw_exec(
    executor: &StatementExecutor,
    pool: &DbPool,
    req: &RawExecRequest,
) -> DbResult<OpOutcome> {
    let sql = req.sql.trim();
    if sql.is_empty() {
        return Err(DbError::validation("sql", "Empty Query"));
    }

    if is_select(sql) {
        let rows = executor
            .fetch(pool, sql, &[])
            .await
            .map_err(|e| e.with_sql(sql))?;
        return Ok(OpOutcome::succeed(SUCCESS_MESSAGE).with_sql(sql).with_rows(rows));
    }

    let count = executor
        .execute_in_transaction(pool, sql, &[])
        .await
        .map_err(|e| e.with_sql(sql))?;
    info!(rows = count, "Executed ad-hoc statement");
    Ok(OpOutcome::succeed(SUCCESS_MESSAGE)
        .with_sql(sql)
        .with_rows_affected(count))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_select() {
        assert!(is_select("SELECT 1"));
        assert!(is_select("  select * from t"));
        assert!(is_select("SeLeCt"));
        assert!(!is_select("INSERT INTO t VALUES (1)"));
        assert!(!is_select("WITH x AS (SELECT 1) SELECT * FROM x"));
        assert!(!is_select("sel"));
    }
}
