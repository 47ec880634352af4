//! DB Workbench Library
//!
//! Schema-aware statement construction and validation for database
//! administration tools (SQLite, PostgreSQL, MySQL): session registry,
//! catalog inspection, foreign-key target validation, DDL/DML builders and
//! ERD generation.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod ops;
pub mod sql;

pub use config::Config;
pub use db::{CatalogInspector, ForeignKeyValidator, SessionRegistry};
pub use error::{DbError, DbResult};
pub use ops::{ErdGenerator, OpOutcome, OpReport, StatementRunner};
