//! Operations against a live connection.
//!
//! Each operation renders its SQL with [`crate::sql`], consults the catalog
//! where needed, executes exactly one statement and returns an [`OpOutcome`].

pub mod browse;
pub mod data;
pub mod erd;
pub mod execute;
pub mod format;
pub mod outcome;
pub mod select;
pub mod table;

pub use browse::{DatabaseOverview, TableData, database_overview, table_data};
pub use erd::{ErdDiagram, ErdGenerator, Relationship, SchemaGraph};
pub use format::OutputFormat;
pub use outcome::{OpOutcome, OpReport, OpStatus};

use tracing::debug;

use crate::db::{DbPool, StatementExecutor};
use crate::error::DbResult;
use crate::models::{ExecutionLimits, Statement};

/// Dispatches tagged statements to their operations.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatementRunner {
    executor: StatementExecutor,
}

impl StatementRunner {
    pub fn new(limits: ExecutionLimits) -> Self {
        Self {
            executor: StatementExecutor::new(limits),
        }
    }

    pub fn executor(&self) -> &StatementExecutor {
        &self.executor
    }

    pub async fn run(&self, pool: &DbPool, statement: &Statement) -> DbResult<OpOutcome> {
        debug!(op = statement.kind(), "Running statement");
        let executor = &self.executor;
        match statement {
            Statement::CreateTable(req) => table::create_table(executor, pool, req).await,
            Statement::DropTable(req) => table::drop_table(executor, pool, req).await,
            Statement::AlterTable(req) => table::alter_table(executor, pool, req).await,
            Statement::Insert(req) => data::insert_rows(executor, pool, req).await,
            Statement::Update(req) => data::update_rows(executor, pool, req).await,
            Statement::Delete(req) => data::delete_rows(executor, pool, req).await,
            Statement::JoinSelect(req) => select::join_select(executor, pool, req).await,
            Statement::SortSelect(req) => select::sort_select(executor, pool, req).await,
            Statement::RawExec(req) => execute::raw_exec(executor, pool, req).await,
        }
    }

    /// Run and fold the result into a user-facing report.
    pub async fn report(&self, pool: &DbPool, statement: &Statement) -> OpReport {
        OpReport::from_result(self.run(pool, statement).await)
    }

    pub async fn table_data(&self, pool: &DbPool, table: &str) -> DbResult<TableData> {
        browse::table_data(&self.executor, pool, table).await
    }
}
