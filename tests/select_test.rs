//! Integration tests for join/sort selects and ad-hoc execution.

use db_workbench::db::{DbPool, SessionRegistry, StatementExecutor};
use db_workbench::models::{
    ConnectRequest, ExecutionLimits, JoinClause, JoinSelectRequest, JoinType, RawExecRequest,
    SortDirection, SortKey, SortSelectRequest, Statement,
};
use db_workbench::ops::StatementRunner;
use serde_json::json;
use tempfile::NamedTempFile;

async fn setup_db() -> (SessionRegistry, DbPool) {
    let temp_file = NamedTempFile::new().unwrap();
    let db_path = temp_file
        .into_temp_path()
        .keep()
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();

    let registry = SessionRegistry::new();
    let info = registry
        .connect(ConnectRequest::url(format!("sqlite:{}", db_path)))
        .await
        .unwrap();
    let pool = registry.require(&info.token).await.unwrap();

    let executor = StatementExecutor::default();
    for sql in [
        "CREATE TABLE customers (id INTEGER PRIMARY KEY, name TEXT NOT NULL)",
        "CREATE TABLE orders (id INTEGER PRIMARY KEY, customer_id INTEGER REFERENCES customers(id), total INTEGER)",
        "INSERT INTO customers (id, name) VALUES (1, 'Ann'), (2, 'Bob'), (3, 'Cy')",
        "INSERT INTO orders (id, customer_id, total) VALUES (10, 1, 30), (11, 1, 5), (12, 2, 12)",
    ] {
        executor.execute(&pool, sql, &[]).await.unwrap();
    }

    (registry, pool)
}

fn raw(sql: &str) -> Statement {
    Statement::RawExec(RawExecRequest {
        sql: sql.to_string(),
    })
}

#[tokio::test]
async fn test_join_select() {
    let (_registry, pool) = setup_db().await;
    let runner = StatementRunner::default();

    let req = JoinSelectRequest {
        base_table: "customers".to_string(),
        columns: vec!["customers.name".to_string(), "orders.total".to_string()],
        joins: vec![JoinClause {
            join_type: JoinType::Inner,
            table: "orders".to_string(),
            on: "orders.customer_id = customers.id".to_string(),
        }],
        where_conditions: vec!["orders.total > 10".to_string()],
    };
    let outcome = runner.run(&pool, &Statement::JoinSelect(req)).await.unwrap();
    assert_eq!(outcome.message, "Succeed: Join Table");

    let rows = outcome.rows.unwrap();
    assert_eq!(rows.columns, vec!["name", "total"]);
    assert_eq!(rows.row_count(), 2);
    assert!(rows.rows.contains(&vec![json!("Ann"), json!(30)]));
    assert!(rows.rows.contains(&vec![json!("Bob"), json!(12)]));
}

#[tokio::test]
async fn test_left_join_keeps_unmatched_rows() {
    let (_registry, pool) = setup_db().await;
    let runner = StatementRunner::default();

    let req = JoinSelectRequest {
        base_table: "customers".to_string(),
        columns: vec![],
        joins: vec![JoinClause {
            join_type: JoinType::Left,
            table: "orders".to_string(),
            on: "orders.customer_id = customers.id".to_string(),
        }],
        where_conditions: vec!["orders.id IS NULL".to_string()],
    };
    let rows = runner
        .run(&pool, &Statement::JoinSelect(req))
        .await
        .unwrap()
        .rows
        .unwrap();
    assert_eq!(rows.row_count(), 1);
    assert_eq!(rows.column_values("name"), vec![&json!("Cy")]);
}

#[tokio::test]
async fn test_failed_join_carries_sql() {
    let (_registry, pool) = setup_db().await;
    let runner = StatementRunner::default();

    let req = JoinSelectRequest {
        base_table: "customers".to_string(),
        columns: vec![],
        joins: vec![JoinClause {
            join_type: JoinType::Inner,
            table: "invoices".to_string(),
            on: "invoices.customer_id = customers.id".to_string(),
        }],
        where_conditions: vec![],
    };
    let report = runner.report(&pool, &Statement::JoinSelect(req)).await;
    assert!(report.message.starts_with("Failed: "));
    assert_eq!(
        report.query.as_deref(),
        Some("SELECT * FROM customers INNER JOIN invoices ON invoices.customer_id = customers.id")
    );
}

#[tokio::test]
async fn test_sort_select() {
    let (_registry, pool) = setup_db().await;
    let runner = StatementRunner::default();

    let req = SortSelectRequest {
        table: "orders".to_string(),
        columns: vec!["id".to_string(), "total".to_string()],
        order_by: vec![
            SortKey::new("customer_id", SortDirection::Asc),
            SortKey::new("total", SortDirection::Desc),
        ],
    };
    let outcome = runner.run(&pool, &Statement::SortSelect(req)).await.unwrap();
    assert_eq!(outcome.message, "Succeed: Sorted Table");
    let rows = outcome.rows.unwrap();
    assert_eq!(rows.column_values("id"), vec![&json!(10), &json!(11), &json!(12)]);
}

#[tokio::test]
async fn test_empty_result_keeps_column_names() {
    let (_registry, pool) = setup_db().await;
    let runner = StatementRunner::default();

    let outcome = runner
        .run(&pool, &raw("SELECT id, name FROM customers WHERE id > 100"))
        .await
        .unwrap();
    let rows = outcome.rows.unwrap();
    assert_eq!(rows.columns, vec!["id", "name"]);
    assert!(rows.rows.is_empty());
}

#[tokio::test]
async fn test_row_limit_truncates() {
    let (_registry, pool) = setup_db().await;
    let runner = StatementRunner::new(ExecutionLimits::new(5, 2));

    let report = runner.report(&pool, &raw("select * from orders")).await;
    assert_eq!(report.message, "Succeed: Query executed successfully");
    assert_eq!(report.rows.len(), 2);
    assert!(report.truncated);
}

#[tokio::test]
async fn test_raw_exec_write_and_empty() {
    let (_registry, pool) = setup_db().await;
    let runner = StatementRunner::default();

    let outcome = runner
        .run(&pool, &raw("  UPDATE orders SET total = total + 1 WHERE customer_id = 1  "))
        .await
        .unwrap();
    assert_eq!(outcome.message, "Succeed: Query executed successfully");
    assert_eq!(outcome.rows_affected, Some(2));
    assert_eq!(
        outcome.sql.as_deref(),
        Some("UPDATE orders SET total = total + 1 WHERE customer_id = 1")
    );

    let report = runner.report(&pool, &raw("   ")).await;
    assert_eq!(report.message, "Failed: Empty Query");
    assert_eq!(report.failure, Some("validation"));
}

#[tokio::test]
async fn test_raw_exec_failure_reports_query() {
    let (_registry, pool) = setup_db().await;
    let runner = StatementRunner::default();

    let report = runner.report(&pool, &raw("DELETE FROM ghosts")).await;
    assert!(report.message.starts_with("Failed: "));
    assert!(report.message.contains("ghosts"));
    assert_eq!(report.query.as_deref(), Some("DELETE FROM ghosts"));
    assert_eq!(report.failure, Some("execution"));
}

#[tokio::test]
async fn test_timeout_reports_query() {
    let (_registry, pool) = setup_db().await;
    let runner = StatementRunner::new(ExecutionLimits::new(1, 10));

    let sql = "SELECT COUNT(*) FROM (WITH RECURSIVE seq(x) AS \
               (SELECT 1 UNION ALL SELECT x + 1 FROM seq WHERE x < 2000000000) \
               SELECT x FROM seq)";
    let report = runner.report(&pool, &raw(sql)).await;
    assert_eq!(report.message, "Failed: Timeout: query execution exceeded 1s");
    assert_eq!(report.query.as_deref(), Some(sql));
    assert_eq!(report.failure, Some("execution"));
}
