//! Integration tests for insert, update and delete.
//!
//! Tests verify that:
//! - Multi-row inserts land in one statement with NULLs for empty cells
//! - Update and delete report exact counts
//! - Matching zero rows is a no-match outcome, not a failure
//! - A failing insert leaves the table untouched

use db_workbench::db::{DbPool, SessionRegistry, StatementExecutor};
use db_workbench::models::{
    ColumnValue, ConditionSet, ConnectRequest, DeleteRequest, InsertRequest, Statement,
    UpdateRequest,
};
use db_workbench::ops::{OpStatus, StatementRunner};
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

    StatementExecutor::default()
        .execute(
            &pool,
            "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT NOT NULL, age INTEGER)",
            &[],
        )
        .await
        .unwrap();

    (registry, pool)
}

async fn count_rows(pool: &DbPool, filter: &str) -> i64 {
    let sql = format!("SELECT COUNT(*) AS n FROM users {}", filter);
    let set = StatementExecutor::default().fetch(pool, &sql, &[]).await.unwrap();
    set.rows[0][0].as_i64().unwrap()
}

async fn seed_users(runner: &StatementRunner, pool: &DbPool) {
    let insert = InsertRequest::from_column_values(
        "users",
        vec!["name".to_string(), "age".to_string()],
        &["Ann, Bob, Cy, Dee".to_string(), "17, 25, 30".to_string()],
    );
    runner.run(pool, &Statement::Insert(insert)).await.unwrap();
}

#[tokio::test]
async fn test_insert_rows() {
    let (_registry, pool) = setup_db().await;
    let runner = StatementRunner::default();

    let req = InsertRequest {
        table: "users".to_string(),
        columns: vec!["name".to_string(), "age".to_string()],
        rows: vec![
            json!({"name": "Ann", "age": 31}).as_object().unwrap().clone(),
            json!({"name": "O'Brien", "age": ""}).as_object().unwrap().clone(),
        ],
    };
    let outcome = runner.run(&pool, &Statement::Insert(req)).await.unwrap();
    assert_eq!(outcome.message, "Succeed: Inserted 2 Row(s)");
    assert_eq!(outcome.rows_affected, Some(2));
    assert_eq!(
        outcome.sql.as_deref(),
        Some("INSERT INTO users (name, age) VALUES (?, ?), (?, NULL)")
    );

    assert_eq!(count_rows(&pool, "WHERE name = 'O''Brien' AND age IS NULL").await, 1);
}

#[tokio::test]
async fn test_insert_from_column_values_pads_with_null() {
    let (_registry, pool) = setup_db().await;
    let runner = StatementRunner::default();
    seed_users(&runner, &pool).await;

    assert_eq!(count_rows(&pool, "").await, 4);
    assert_eq!(count_rows(&pool, "WHERE name = 'Dee' AND age IS NULL").await, 1);
    assert_eq!(count_rows(&pool, "WHERE age = 25").await, 1);
}

#[tokio::test]
async fn test_failed_insert_rolls_back() {
    let (_registry, pool) = setup_db().await;
    let runner = StatementRunner::default();
    seed_users(&runner, &pool).await;

    // Second row violates NOT NULL on name
    let req = InsertRequest {
        table: "users".to_string(),
        columns: vec!["name".to_string()],
        rows: vec![
            json!({"name": "Eve"}).as_object().unwrap().clone(),
            json!({"name": null}).as_object().unwrap().clone(),
        ],
    };
    let report = runner.report(&pool, &Statement::Insert(req)).await;
    assert!(report.message.starts_with("Failed: "));
    assert_eq!(report.failure, Some("execution"));
    assert_eq!(count_rows(&pool, "").await, 4);
}

#[tokio::test]
async fn test_update_rows() {
    let (_registry, pool) = setup_db().await;
    let runner = StatementRunner::default();
    seed_users(&runner, &pool).await;

    let req = UpdateRequest {
        table: "users".to_string(),
        set: vec![ColumnValue::new("age", 26)],
        condition: ColumnValue::new("name", "Bob"),
    };
    let outcome = runner.run(&pool, &Statement::Update(req)).await.unwrap();
    assert_eq!(outcome.status, OpStatus::Succeed);
    assert_eq!(outcome.message, "Succeed: Updated 1 Row(s)");
    assert_eq!(count_rows(&pool, "WHERE name = 'Bob' AND age = 26").await, 1);

    let req = UpdateRequest {
        table: "users".to_string(),
        set: vec![ColumnValue::new("age", 40)],
        condition: ColumnValue::new("name", "Nobody"),
    };
    let outcome = runner.run(&pool, &Statement::Update(req)).await.unwrap();
    assert_eq!(outcome.status, OpStatus::NoMatch);
    assert_eq!(outcome.message, "Succeed: No Matching Rows to Update");
    assert_eq!(outcome.rows_affected, Some(0));
}

#[tokio::test]
async fn test_delete_rows() {
    let (_registry, pool) = setup_db().await;
    let runner = StatementRunner::default();
    seed_users(&runner, &pool).await;

    let req = DeleteRequest {
        table: "users".to_string(),
        conditions: ConditionSet::single("age", "between", "18 and 30").or("age", "IS NULL", ""),
    };
    let outcome = runner.run(&pool, &Statement::Delete(req)).await.unwrap();
    assert_eq!(
        outcome.sql.as_deref(),
        Some("DELETE FROM users WHERE age BETWEEN 18 AND 30 OR age IS NULL")
    );
    assert_eq!(outcome.message, "Succeed: Deleted 3 Row(s)");
    assert_eq!(count_rows(&pool, "").await, 1);
}

#[tokio::test]
async fn test_delete_matching_nothing_is_no_match() {
    let (_registry, pool) = setup_db().await;
    let runner = StatementRunner::default();
    seed_users(&runner, &pool).await;

    let req = DeleteRequest {
        table: "users".to_string(),
        conditions: ConditionSet::single("name", "IN", "'Zed', 'Yan'"),
    };
    let report = runner.report(&pool, &Statement::Delete(req)).await;
    assert_eq!(report.message, "Succeed: No Matching Rows to Delete");
    assert!(!report.is_failure());
    assert_eq!(count_rows(&pool, "").await, 4);
}

#[tokio::test]
async fn test_delete_rejects_malformed_conditions() {
    let (_registry, pool) = setup_db().await;
    let runner = StatementRunner::default();
    seed_users(&runner, &pool).await;

    let req = DeleteRequest {
        table: "users".to_string(),
        conditions: ConditionSet {
            columns: vec!["age".to_string(), "name".to_string()],
            operators: vec![">".to_string(), "=".to_string()],
            values: vec!["1".to_string(), "'Ann'".to_string()],
            logical_operators: vec![],
        },
    };
    let err = runner.run(&pool, &Statement::Delete(req)).await.unwrap_err();
    assert_eq!(err.category(), "validation");
    assert_eq!(count_rows(&pool, "").await, 4);
}
