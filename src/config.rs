//! Configuration handling for the workbench.
//!
//! Pool options and execution limits are plain serializable structs used by
//! the library; [`Config`] is the CLI surface that fills them from arguments
//! and environment variables.

use crate::models::{
    ConnectRequest, DEFAULT_QUERY_TIMEOUT_SECS, DEFAULT_ROW_LIMIT, DatabaseType, ExecutionLimits,
};
use crate::ops::OutputFormat;
use clap::{Parser, Subcommand, ValueEnum};

// Pool configuration defaults
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;
pub const DEFAULT_MAX_CONNECTIONS_SQLITE: u32 = 1;
pub const DEFAULT_MIN_CONNECTIONS: u32 = 1;
pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 600;
pub const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 30;

/// Connection pool configuration options.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct PoolOptions {
    /// Maximum connections in pool (default: 5 for MySQL/PostgreSQL, 1 for SQLite)
    pub max_connections: Option<u32>,
    /// Minimum connections in pool (default: 1)
    pub min_connections: Option<u32>,
    /// Idle timeout in seconds (default: 600)
    pub idle_timeout_secs: Option<u64>,
    /// Connection acquire timeout in seconds (default: 30)
    pub acquire_timeout_secs: Option<u64>,
    /// Whether to test connections before use (default: true)
    pub test_before_acquire: Option<bool>,
}

impl PoolOptions {
    /// Get max_connections with default value based on database type.
    pub fn max_connections_or_default(&self, is_sqlite: bool) -> u32 {
        self.max_connections.unwrap_or(if is_sqlite {
            DEFAULT_MAX_CONNECTIONS_SQLITE
        } else {
            DEFAULT_MAX_CONNECTIONS
        })
    }

    /// Get min_connections with default value.
    pub fn min_connections_or_default(&self) -> u32 {
        self.min_connections.unwrap_or(DEFAULT_MIN_CONNECTIONS)
    }

    /// Get idle_timeout with default value.
    pub fn idle_timeout_or_default(&self) -> u64 {
        self.idle_timeout_secs.unwrap_or(DEFAULT_IDLE_TIMEOUT_SECS)
    }

    /// Get acquire_timeout with default value.
    pub fn acquire_timeout_or_default(&self) -> u64 {
        self.acquire_timeout_secs
            .unwrap_or(DEFAULT_ACQUIRE_TIMEOUT_SECS)
    }

    /// Get test_before_acquire with default value.
    pub fn test_before_acquire_or_default(&self) -> bool {
        self.test_before_acquire.unwrap_or(true)
    }

    /// Validate pool options and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_connections == Some(0) {
            return Err("max_connections must be greater than 0".to_string());
        }
        if let Some(min) = self.min_connections {
            if min == 0 {
                return Err("min_connections must be greater than 0".to_string());
            }
            if let Some(max) = self.max_connections {
                if min > max {
                    return Err(format!(
                        "min_connections ({}) cannot exceed max_connections ({})",
                        min, max
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Dialect for discrete connection fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Dialect {
    #[default]
    Mysql,
    Postgres,
}

impl From<Dialect> for DatabaseType {
    fn from(value: Dialect) -> Self {
        match value {
            Dialect::Mysql => DatabaseType::MySQL,
            Dialect::Postgres => DatabaseType::PostgreSQL,
        }
    }
}

/// What to do once connected.
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// List base tables
    Tables,
    /// Show columns, keys and indexes of a table
    Describe { table: String },
    /// Show the rows of a table
    Browse { table: String },
    /// Render the entity-relationship diagram around a table
    Erd { table: String },
    /// Check whether table.column is a legal foreign-key target
    CheckFk { table: String, column: String },
    /// Execute raw SQL
    Exec { sql: String },
    /// Run a JSON-encoded statement, e.g. '{"op":"drop_table","table":"t"}'
    Run { statement: String },
}

/// Configuration for the workbench CLI.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "db-workbench",
    about = "Inspect schemas, build DDL/DML and render ERDs for a relational database",
    version,
    author
)]
pub struct Config {
    /// Connection URL (mysql://, mysql+pymysql://, postgres://, sqlite:...)
    #[arg(short = 'd', long = "database", value_name = "URL", env = "DBW_DATABASE")]
    pub database_url: Option<String>,

    /// User name (discrete connection fields)
    #[arg(long, env = "DBW_USER", conflicts_with = "database_url")]
    pub user: Option<String>,

    /// Password (discrete connection fields)
    #[arg(long, env = "DBW_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Server host (discrete connection fields)
    #[arg(long, env = "DBW_HOST")]
    pub host: Option<String>,

    /// Server port (discrete connection fields)
    #[arg(long, env = "DBW_PORT")]
    pub port: Option<u16>,

    /// Database name (discrete connection fields)
    #[arg(long = "name", env = "DBW_NAME")]
    pub database_name: Option<String>,

    /// Dialect for discrete connection fields
    #[arg(long, value_enum, default_value = "mysql", env = "DBW_DIALECT")]
    pub dialect: Dialect,

    /// Query timeout in seconds
    #[arg(long, default_value_t = DEFAULT_QUERY_TIMEOUT_SECS, env = "DBW_QUERY_TIMEOUT")]
    pub query_timeout: u64,

    /// Maximum rows returned by read statements
    #[arg(long, default_value_t = DEFAULT_ROW_LIMIT, env = "DBW_MAX_ROWS")]
    pub max_rows: u32,

    /// Maximum pooled connections
    #[arg(long, env = "DBW_MAX_CONNECTIONS")]
    pub max_connections: Option<u32>,

    /// Pool acquire timeout in seconds
    #[arg(long, env = "DBW_ACQUIRE_TIMEOUT")]
    pub acquire_timeout: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn", env = "DBW_LOG_LEVEL")]
    pub log_level: String,

    /// Enable JSON logging format
    #[arg(long, env = "DBW_JSON_LOGS")]
    pub json_logs: bool,

    /// Output format for row results
    #[arg(long, value_enum, default_value = "json", env = "DBW_FORMAT")]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Command,
}

impl Config {
    /// Parse configuration from command line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Create a default configuration (useful for testing).
    pub fn default_config() -> Self {
        Self {
            database_url: None,
            user: None,
            password: None,
            host: None,
            port: None,
            database_name: None,
            dialect: Dialect::Mysql,
            query_timeout: DEFAULT_QUERY_TIMEOUT_SECS,
            max_rows: DEFAULT_ROW_LIMIT,
            max_connections: None,
            acquire_timeout: None,
            log_level: "warn".to_string(),
            json_logs: false,
            format: OutputFormat::Json,
            command: Command::Tables,
        }
    }

    /// Build the connect request from either the URL or the discrete fields.
    pub fn connect_request(&self) -> ConnectRequest {
        match &self.database_url {
            Some(url) => ConnectRequest::url(url.clone()),
            None => ConnectRequest::Fields {
                username: self.user.clone().unwrap_or_default(),
                password: self.password.clone().unwrap_or_default(),
                host: self.host.clone().unwrap_or_default(),
                port: self
                    .port
                    .or_else(|| DatabaseType::from(self.dialect).default_port()),
                database: self.database_name.clone().unwrap_or_default(),
                db_type: self.dialect.into(),
            },
        }
    }

    pub fn pool_options(&self) -> PoolOptions {
        PoolOptions {
            max_connections: self.max_connections,
            acquire_timeout_secs: self.acquire_timeout,
            ..PoolOptions::default()
        }
    }

    pub fn limits(&self) -> ExecutionLimits {
        ExecutionLimits::new(self.query_timeout, self.max_rows)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.dialect, Dialect::Mysql);
        assert_eq!(config.limits(), ExecutionLimits::default());
    }

    #[test]
    fn test_parse_url_and_subcommand() {
        let config = Config::try_parse_from([
            "db-workbench",
            "--database",
            "sqlite:shop.db",
            "--max-rows",
            "50",
            "erd",
            "orders",
        ])
        .unwrap();
        assert!(matches!(config.command, Command::Erd { ref table } if table == "orders"));
        assert_eq!(config.limits().row_limit, 50);
        assert!(
            matches!(config.connect_request(), ConnectRequest::Url { ref url } if url == "sqlite:shop.db")
        );
    }

    #[test]
    fn test_parse_format() {
        let config = Config::try_parse_from([
            "db-workbench",
            "-d",
            "sqlite::memory:",
            "--format",
            "table",
            "exec",
            "SELECT 1",
        ])
        .unwrap();
        assert_eq!(config.format, OutputFormat::Table);
        assert_eq!(Config::default().format, OutputFormat::Json);
    }

    #[test]
    fn test_discrete_fields_use_dialect_port() {
        let config = Config {
            user: Some("admin".to_string()),
            password: Some("secret".to_string()),
            host: Some("localhost".to_string()),
            database_name: Some("shop".to_string()),
            dialect: Dialect::Postgres,
            ..Config::default()
        };
        match config.connect_request() {
            ConnectRequest::Fields { port, db_type, .. } => {
                assert_eq!(port, Some(5432));
                assert_eq!(db_type, DatabaseType::PostgreSQL);
            }
            other => panic!("unexpected request: {:?}", other),
        }
    }

    #[test]
    fn test_pool_options_defaults() {
        let opts = PoolOptions::default();
        assert_eq!(opts.max_connections_or_default(false), DEFAULT_MAX_CONNECTIONS);
        assert_eq!(opts.max_connections_or_default(true), DEFAULT_MAX_CONNECTIONS_SQLITE);
        assert_eq!(opts.min_connections_or_default(), DEFAULT_MIN_CONNECTIONS);
        assert_eq!(opts.acquire_timeout_or_default(), DEFAULT_ACQUIRE_TIMEOUT_SECS);
        assert!(opts.test_before_acquire_or_default());
    }

    #[test]
    fn test_pool_options_validation() {
        let opts = PoolOptions {
            max_connections: Some(0),
            ..Default::default()
        };
        assert!(opts.validate().is_err());

        let opts = PoolOptions {
            min_connections: Some(5),
            max_connections: Some(2),
            ..Default::default()
        };
        assert!(opts.validate().unwrap_err().contains("cannot exceed"));

        assert!(PoolOptions::default().validate().is_ok());
    }
}
