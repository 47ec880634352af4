//! Integration tests for the session registry.
//!
//! Tests verify that:
//! - Connecting registers exactly one pool under a fresh token
//! - Dispose closes the pool and a second dispose fails
//! - Blank inputs are rejected before any connection attempt
//! - Reconnecting under a token swaps the pool

use db_workbench::db::{CatalogInspector, DbPool, SessionRegistry, StatementExecutor};
use db_workbench::error::DbError;
use db_workbench::models::{ConnectRequest, DatabaseType};
use tempfile::NamedTempFile;

fn temp_db_url() -> String {
    let temp_file = NamedTempFile::new().unwrap();
    // Keep the file alive after the handle is dropped
    let db_path = temp_file
        .into_temp_path()
        .keep()
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    format!("sqlite:{}", db_path)
}

#[tokio::test]
async fn test_connect_and_dispose() {
    let registry = SessionRegistry::new();
    let info = registry
        .connect(ConnectRequest::url(temp_db_url()))
        .await
        .unwrap();

    assert_eq!(info.token.len(), 128);
    assert_eq!(info.database_type, DatabaseType::SQLite);
    assert!(info.server_version.is_some());
    assert_eq!(registry.session_count().await, 1);
    assert!(registry.resolve(&info.token).await.is_some());

    let pool = registry.require(&info.token).await.unwrap();
    registry.dispose(&info.token).await.unwrap();
    assert!(pool.is_closed());
    assert!(registry.resolve(&info.token).await.is_none());

    let err = registry.dispose(&info.token).await.unwrap_err();
    assert!(matches!(err, DbError::NoActiveConnection));
    assert_eq!(err.to_string(), "No Active DB Connection");
}

#[tokio::test]
async fn test_tokens_are_unique_per_session() {
    let registry = SessionRegistry::new();
    let url = temp_db_url();
    let a = registry.connect(ConnectRequest::url(url.clone())).await.unwrap();
    let b = registry.connect(ConnectRequest::url(url)).await.unwrap();

    assert_ne!(a.token, b.token);
    assert_eq!(registry.session_count().await, 2);

    registry.dispose_all().await;
    assert_eq!(registry.session_count().await, 0);
}

#[tokio::test]
async fn test_blank_inputs_rejected() {
    let registry = SessionRegistry::new();

    let err = registry.connect(ConnectRequest::url("   ")).await.unwrap_err();
    assert_eq!(err.to_string(), "Required DB URL");

    let err = registry
        .connect(ConnectRequest::Fields {
            username: "admin".to_string(),
            password: String::new(),
            host: "localhost".to_string(),
            port: Some(3306),
            database: "shop".to_string(),
            db_type: DatabaseType::MySQL,
        })
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Required custom connection details");
    assert_eq!(registry.session_count().await, 0);
}

#[tokio::test]
async fn test_unreachable_database_registers_nothing() {
    let registry = SessionRegistry::new();
    let result = registry
        .connect(ConnectRequest::url(
            "sqlite:/nonexistent-dir-for-workbench-tests/db.sqlite",
        ))
        .await;
    assert!(result.is_err());
    assert_eq!(registry.session_count().await, 0);
}

#[tokio::test]
async fn test_replace_swaps_pool() {
    let registry = SessionRegistry::new();
    let info = registry
        .connect(ConnectRequest::url(temp_db_url()))
        .await
        .unwrap();
    let first = registry.require(&info.token).await.unwrap();
    create_marker(&first).await;

    let replaced = registry
        .replace(&info.token, ConnectRequest::url(temp_db_url()))
        .await
        .unwrap();
    assert_eq!(replaced.token, info.token);
    assert!(first.is_closed());
    assert_eq!(registry.session_count().await, 1);

    // The new database does not have the marker table
    let second = registry.require(&info.token).await.unwrap();
    assert!(!CatalogInspector::table_exists(&second, "marker").await.unwrap());

    let err = registry
        .replace("unknown-token", ConnectRequest::url(temp_db_url()))
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::NoActiveConnection));
}

async fn create_marker(pool: &DbPool) {
    StatementExecutor::default()
        .execute(pool, "CREATE TABLE marker (id INTEGER PRIMARY KEY)", &[])
        .await
        .unwrap();
}
