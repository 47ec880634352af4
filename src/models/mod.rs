//! Data models for the workbench engine.
//!
//! This module re-exports all model types used throughout the crate.

pub mod connection;
pub mod query;
pub mod schema;
pub mod statement;

// Re-export commonly used types
pub use connection::{
    ConnectRequest, DatabaseType, SessionInfo, mask_connection_url, normalize_scheme,
};
pub use query::{
    DEFAULT_QUERY_TIMEOUT_SECS, DEFAULT_ROW_LIMIT, ExecutionLimits, MAX_QUERY_TIMEOUT_SECS,
    MAX_ROW_LIMIT, QueryParam, RowSet,
};
pub use schema::{ColumnDefinition, ForeignKey, IndexInfo, TableSchema};
pub use statement::{
    AlterCommand, AlterTableRequest, ColumnSpec, ColumnValue, ConditionSet, ConstraintKind,
    CreateTableRequest, DeleteRequest, DropTableRequest, ForeignKeyTarget, InsertRequest,
    JoinClause, JoinSelectRequest, JoinType, RawExecRequest, SortDirection, SortKey,
    SortSelectRequest, Statement, UpdateRequest,
};
