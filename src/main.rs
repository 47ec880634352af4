//! DB Workbench - command line entry point.
//!
//! Connects once, runs one subcommand against the session and prints a JSON
//! report (or the ERD text), then disposes the session.

use db_workbench::config::{Command, Config};
use db_workbench::db::{CatalogInspector, DbPool, ForeignKeyValidator, SessionRegistry};
use db_workbench::error::{DbError, DbResult};
use db_workbench::models::{RawExecRequest, RowSet, Statement};
use db_workbench::ops::format::format_as_table;
use db_workbench::ops::{ErdGenerator, OpReport, OutputFormat, StatementRunner, database_overview};
use serde::Serialize;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the tracing subscriber for logging.
fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

fn to_json<T: Serialize>(value: &T) -> DbResult<String> {
    serde_json::to_string_pretty(value).map_err(|e| DbError::internal(e.to_string()))
}

fn render_report(report: &OpReport, format: OutputFormat) -> DbResult<String> {
    match format {
        OutputFormat::Json => to_json(report),
        OutputFormat::Table => {
            let mut out = report.message.clone();
            if let Some(query) = &report.query {
                out.push_str(&format!("\n{}", query));
            }
            if !report.columns.is_empty() {
                let set = RowSet {
                    columns: report.columns.clone(),
                    rows: report.rows.clone(),
                    truncated: report.truncated,
                };
                out.push('\n');
                out.push_str(&format_as_table(&set));
            }
            Ok(out)
        }
    }
}

/// Run one subcommand; `Ok(false)` means the operation itself failed and
/// its report has been printed.
async fn run_command(config: &Config, pool: &DbPool) -> DbResult<bool> {
    let runner = StatementRunner::new(config.limits());

    let statement = match &config.command {
        Command::Tables => {
            println!("{}", to_json(&database_overview(pool).await?)?);
            return Ok(true);
        }
        Command::Describe { table } => {
            let schema = CatalogInspector::describe_table(pool, table.trim()).await?;
            println!("{}", to_json(&schema)?);
            return Ok(true);
        }
        Command::Browse { table } => {
            let data = runner.table_data(pool, table).await?;
            match config.format {
                OutputFormat::Json => println!("{}", to_json(&data)?),
                OutputFormat::Table => {
                    println!("{}\n{}", data.message, format_as_table(&data.rows))
                }
            }
            return Ok(true);
        }
        Command::Erd { table } => {
            let diagram = ErdGenerator::generate(pool, table).await?;
            println!("{}", diagram.text);
            return Ok(true);
        }
        Command::CheckFk { table, column } => {
            ForeignKeyValidator::validate(pool, table.trim(), column.trim()).await?;
            let verdict = serde_json::json!({
                "message": format!("Succeed: {}.{} is a valid foreign key target", table.trim(), column.trim()),
                "table": table.trim(),
                "column": column.trim(),
            });
            println!("{}", to_json(&verdict)?);
            return Ok(true);
        }
        Command::Exec { sql } => Statement::RawExec(RawExecRequest { sql: sql.clone() }),
        Command::Run { statement } => serde_json::from_str::<Statement>(statement).map_err(|e| {
            DbError::validation("statement", format!("Invalid statement JSON: {}", e))
        })?,
    };

    let report = runner.report(pool, &statement).await;
    println!("{}", render_report(&report, config.format)?);
    Ok(!report.is_failure())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse configuration from command line and environment
    let config = Config::parse_args();

    // Initialize logging
    init_tracing(&config);

    let pool_options = config.pool_options();
    pool_options.validate()?;

    info!("Starting DB Workbench v{}", env!("CARGO_PKG_VERSION"));

    let registry = SessionRegistry::with_pool_options(pool_options);
    let session = match registry.connect(config.connect_request()).await {
        Ok(session) => session,
        Err(e) => {
            error!(error = %e, "Connection failed");
            println!("{}", to_json(&OpReport::from(e))?);
            std::process::exit(1);
        }
    };

    let outcome = match registry.require(&session.token).await {
        Ok(pool) => run_command(&config, &pool).await,
        Err(e) => Err(e),
    };

    registry.dispose_all().await;

    match outcome {
        Ok(true) => Ok(()),
        Ok(false) => std::process::exit(1),
        Err(e) => {
            error!(error = %e, "Command failed");
            println!("{}", to_json(&OpReport::from(e))?);
            std::process::exit(1);
        }
    }
}
