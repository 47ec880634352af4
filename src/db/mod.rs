//! Database access layer.
//!
//! - Connection pools and the session registry
//! - Catalog inspection and foreign-key target validation
//! - Statement execution within limits
//! - Row decoding

pub mod catalog;
pub mod executor;
pub mod fk_validator;
pub mod params;
pub mod pool;
pub mod session;
pub mod types;

pub use catalog::CatalogInspector;
pub use executor::StatementExecutor;
pub use fk_validator::{ForeignKeyValidator, check_reference_target};
pub use pool::{DbPool, create_pool};
pub use session::SessionRegistry;
