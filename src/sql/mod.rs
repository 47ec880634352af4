//! SQL text construction.
//!
//! Renders statements from structured requests without touching a
//! connection. Execution lives in [`crate::ops`].

pub mod builder;
pub mod conditions;
pub mod constraints;
pub mod dialect;

pub use builder::{BuiltStatement, ColumnTypes};
pub use conditions::assemble_conditions;
pub use constraints::column_definition;
