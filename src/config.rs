//! Configuration handling for the MySQL MCP Server.
//!
//! This module provides configuration management via CLI arguments and environment
//! variables. Connection parameters and capability flags use the plain `DB_*` and
//! `ALLOW_*` names; server settings use the `MCP_*` prefix.

use crate::error::{DbError, DbResult};
use crate::policy::{CapabilityPolicy, DEFAULT_MAX_ROWS};
use clap::{ArgAction, Parser, ValueEnum};
use std::fmt;
use std::time::Duration;

pub const DEFAULT_HTTP_HOST: &str = "127.0.0.1";
pub const DEFAULT_HTTP_PORT: u16 = 8080;
pub const DEFAULT_MCP_ENDPOINT: &str = "/";
pub const DEFAULT_DB_PORT: u16 = 3306;
pub const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

// Pool configuration defaults
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;
pub const DEFAULT_MIN_CONNECTIONS: u32 = 1;
pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 600;

/// Transport mode for the MCP server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum TransportMode {
    /// Standard input/output (for CLI integration)
    #[default]
    Stdio,
    /// Streamable HTTP (for web clients)
    Http,
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stdio => write!(f, "stdio"),
            Self::Http => write!(f, "http"),
        }
    }
}

/// Parse a capability flag. Only `true` (any case) enables it.
fn parse_flag(value: &str) -> Result<bool, String> {
    Ok(value.trim().eq_ignore_ascii_case("true"))
}

/// Validated MySQL connection parameters.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionSettings {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
}

// Manual impl so the password never reaches logs.
impl fmt::Debug for ConnectionSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"***")
            .field("database", &self.database)
            .finish()
    }
}

/// Connection pool options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolOptions {
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: Duration,
    pub idle_timeout: Duration,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            max_connections: DEFAULT_MAX_CONNECTIONS,
            min_connections: DEFAULT_MIN_CONNECTIONS,
            acquire_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            idle_timeout: Duration::from_secs(DEFAULT_IDLE_TIMEOUT_SECS),
        }
    }
}

/// Configuration for the MySQL MCP Server.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "mysql-mcp-server",
    about = "MCP server exposing policy-guarded MySQL tools to AI assistants",
    version,
    author
)]
pub struct Config {
    /// MySQL host
    #[arg(long, env = "DB_HOST")]
    pub db_host: Option<String>,

    /// MySQL port
    #[arg(long, default_value_t = DEFAULT_DB_PORT, env = "DB_PORT")]
    pub db_port: u16,

    /// MySQL user
    #[arg(long, env = "DB_USER")]
    pub db_user: Option<String>,

    /// MySQL password (may be empty)
    #[arg(long, env = "DB_PASSWORD", hide_env_values = true)]
    pub db_password: Option<String>,

    /// Database (schema) name
    #[arg(long, env = "DB_NAME")]
    pub db_name: Option<String>,

    /// DDL intent marker. Informational only: DROP, CREATE, ALTER and TRUNCATE
    /// each still need their own ALLOW_* flag
    #[arg(long, env = "ALLOW_DDL", default_value = "false", value_parser = parse_flag, action = ArgAction::Set)]
    pub allow_ddl: bool,

    /// DML intent marker. Informational only: INSERT, UPDATE and DELETE each still
    /// need their own ALLOW_* flag
    #[arg(long, env = "ALLOW_DML", default_value = "false", value_parser = parse_flag, action = ArgAction::Set)]
    pub allow_dml: bool,

    /// Allow DROP statements
    #[arg(long, env = "ALLOW_DROP", default_value = "false", value_parser = parse_flag, action = ArgAction::Set)]
    pub allow_drop: bool,

    /// Allow CREATE statements
    #[arg(long, env = "ALLOW_CREATE", default_value = "false", value_parser = parse_flag, action = ArgAction::Set)]
    pub allow_create: bool,

    /// Allow ALTER statements
    #[arg(long, env = "ALLOW_ALTER", default_value = "false", value_parser = parse_flag, action = ArgAction::Set)]
    pub allow_alter: bool,

    /// Allow INSERT statements
    #[arg(long, env = "ALLOW_INSERT", default_value = "false", value_parser = parse_flag, action = ArgAction::Set)]
    pub allow_insert: bool,

    /// Allow UPDATE statements (a WHERE clause is always required)
    #[arg(long, env = "ALLOW_UPDATE", default_value = "false", value_parser = parse_flag, action = ArgAction::Set)]
    pub allow_update: bool,

    /// Allow DELETE statements
    #[arg(long, env = "ALLOW_DELETE", default_value = "false", value_parser = parse_flag, action = ArgAction::Set)]
    pub allow_delete: bool,

    /// Allow TRUNCATE statements
    #[arg(long, env = "ALLOW_TRUNCATE", default_value = "false", value_parser = parse_flag, action = ArgAction::Set)]
    pub allow_truncate: bool,

    /// Maximum rows a SELECT may request through its LIMIT clause
    #[arg(
        long,
        default_value_t = DEFAULT_MAX_ROWS,
        env = "MAX_ROWS",
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub max_rows: u32,

    /// Maximum connections in the pool
    #[arg(
        long,
        default_value_t = DEFAULT_MAX_CONNECTIONS,
        env = "DB_POOL_SIZE",
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub pool_size: u32,

    /// Transport mode (stdio or http)
    #[arg(
        short,
        long,
        value_enum,
        default_value = "stdio",
        env = "MCP_TRANSPORT"
    )]
    pub transport: TransportMode,

    /// HTTP host to bind to (only used with http transport)
    #[arg(
        long,
        default_value = DEFAULT_HTTP_HOST,
        env = "MCP_HTTP_HOST"
    )]
    pub http_host: String,

    /// HTTP port to bind to (only used with http transport)
    #[arg(
        long,
        default_value_t = DEFAULT_HTTP_PORT,
        env = "MCP_HTTP_PORT"
    )]
    pub http_port: u16,

    /// MCP endpoint path (only used with http transport)
    #[arg(
        long,
        default_value = DEFAULT_MCP_ENDPOINT,
        env = "MCP_ENDPOINT"
    )]
    pub mcp_endpoint: String,

    /// Per-statement timeout in seconds
    #[arg(
        long,
        default_value_t = DEFAULT_QUERY_TIMEOUT_SECS,
        env = "MCP_QUERY_TIMEOUT"
    )]
    pub query_timeout: u64,

    /// Connection (and pool acquire) timeout in seconds
    #[arg(
        long,
        default_value_t = DEFAULT_CONNECT_TIMEOUT_SECS,
        env = "MCP_CONNECT_TIMEOUT"
    )]
    pub connect_timeout: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "MCP_LOG_LEVEL")]
    pub log_level: String,

    /// Enable JSON logging format
    #[arg(long, env = "MCP_JSON_LOGS")]
    pub json_logs: bool,
}

impl Config {
    /// Create a default configuration (useful for testing).
    pub fn default_config() -> Self {
        Self {
            db_host: None,
            db_port: DEFAULT_DB_PORT,
            db_user: None,
            db_password: None,
            db_name: None,
            allow_ddl: false,
            allow_dml: false,
            allow_drop: false,
            allow_create: false,
            allow_alter: false,
            allow_insert: false,
            allow_update: false,
            allow_delete: false,
            allow_truncate: false,
            max_rows: DEFAULT_MAX_ROWS,
            pool_size: DEFAULT_MAX_CONNECTIONS,
            transport: TransportMode::Stdio,
            http_host: DEFAULT_HTTP_HOST.to_string(),
            http_port: DEFAULT_HTTP_PORT,
            mcp_endpoint: DEFAULT_MCP_ENDPOINT.to_string(),
            query_timeout: DEFAULT_QUERY_TIMEOUT_SECS,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT_SECS,
            log_level: "info".to_string(),
            json_logs: false,
        }
    }

    /// Build the immutable capability policy.
    pub fn capability_policy(&self) -> CapabilityPolicy {
        CapabilityPolicy {
            allow_ddl: self.allow_ddl,
            allow_dml: self.allow_dml,
            allow_drop: self.allow_drop,
            allow_create: self.allow_create,
            allow_alter: self.allow_alter,
            allow_insert: self.allow_insert,
            allow_update: self.allow_update,
            allow_delete: self.allow_delete,
            allow_truncate: self.allow_truncate,
            max_rows: self.max_rows.max(1),
        }
    }

    /// Validate and collect the connection parameters.
    ///
    /// Host, user and database name are required; a missing password is treated
    /// as empty. Blank values count as missing.
    pub fn connection_settings(&self) -> DbResult<ConnectionSettings> {
        fn present(value: &Option<String>) -> Option<&str> {
            value.as_deref().map(str::trim).filter(|v| !v.is_empty())
        }

        let host = present(&self.db_host);
        let user = present(&self.db_user);
        let database = present(&self.db_name);

        let missing: Vec<&str> = [("DB_HOST", host), ("DB_USER", user), ("DB_NAME", database)]
            .into_iter()
            .filter(|(_, value)| value.is_none())
            .map(|(key, _)| key)
            .collect();

        match (host, user, database) {
            (Some(host), Some(user), Some(database)) => Ok(ConnectionSettings {
                host: host.to_string(),
                port: self.db_port,
                user: user.to_string(),
                password: self.db_password.clone().unwrap_or_default(),
                database: database.to_string(),
            }),
            _ => Err(DbError::configuration(format!(
                "missing connection parameters: {}",
                missing.join(", ")
            ))),
        }
    }

    /// Pool options derived from the server settings.
    pub fn pool_options(&self) -> PoolOptions {
        PoolOptions {
            max_connections: self.pool_size.max(1),
            min_connections: DEFAULT_MIN_CONNECTIONS.min(self.pool_size.max(1)),
            acquire_timeout: self.connect_timeout_duration(),
            ..PoolOptions::default()
        }
    }

    /// Get the HTTP bind address.
    pub fn http_bind_addr(&self) -> String {
        format!("{}:{}", self.http_host, self.http_port)
    }

    /// Get the query timeout as a Duration.
    pub fn query_timeout_duration(&self) -> Duration {
        Duration::from_secs(self.query_timeout)
    }

    /// Get the connection timeout as a Duration.
    pub fn connect_timeout_duration(&self) -> Duration {
        Duration::from_secs(self.connect_timeout)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}
