//! Connection pool lifecycle.
//!
//! Startup is best-effort: missing connection parameters or an unreachable server
//! leave the process in demo mode (no backend) instead of exiting.

use crate::config::{Config, ConnectionSettings, PoolOptions};
use crate::db::executor::MySqlBackend;
use crate::error::{DbError, DbResult};
use sqlx::MySqlPool;
use sqlx::mysql::{MySqlConnectOptions, MySqlPoolOptions};
use tracing::{debug, error, info, warn};

/// Open a MySQL pool and verify that a connection can be acquired.
pub async fn connect(settings: &ConnectionSettings, options: &PoolOptions) -> DbResult<MySqlPool> {
    info!(
        host = %settings.host,
        port = settings.port,
        database = %settings.database,
        max_connections = options.max_connections,
        "Connecting to MySQL"
    );

    let connect_options = MySqlConnectOptions::new()
        .host(&settings.host)
        .port(settings.port)
        .username(&settings.user)
        .password(&settings.password)
        .database(&settings.database)
        .charset("utf8mb4");

    MySqlPoolOptions::new()
        .min_connections(options.min_connections)
        .max_connections(options.max_connections)
        .acquire_timeout(options.acquire_timeout)
        .idle_timeout(Some(options.idle_timeout))
        .test_before_acquire(true)
        .connect_with(connect_options)
        .await
        .map_err(|e| {
            DbError::connection(
                format!("Failed to connect: {}", e),
                connection_suggestion(&e),
            )
        })
}

/// Get the server version, if the server reports one.
pub async fn server_version(pool: &MySqlPool) -> Option<String> {
    match sqlx::query_scalar::<_, String>("SELECT version()")
        .fetch_one(pool)
        .await
    {
        Ok(version) => {
            debug!(version = %version, "Got server version");
            Some(version)
        }
        Err(e) => {
            warn!(error = %e, "Failed to get server version");
            None
        }
    }
}

/// Build the backend from configuration, or `None` to run in demo mode.
pub async fn connect_or_degrade(config: &Config) -> Option<MySqlBackend> {
    let settings = match config.connection_settings() {
        Ok(settings) => settings,
        Err(e) => {
            warn!(error = %e, "Running in demo mode: every tool call will report the missing configuration");
            return None;
        }
    };

    match connect(&settings, &config.pool_options()).await {
        Ok(pool) => {
            let version = server_version(&pool).await;
            info!(
                server_version = version.as_deref().unwrap_or("unknown"),
                "Connected to MySQL"
            );
            Some(MySqlBackend::new(pool, config.query_timeout_duration()))
        }
        Err(e) => {
            error!(
                error = %e,
                suggestion = e.suggestion().unwrap_or(""),
                "Database connection failed, running in demo mode"
            );
            None
        }
    }
}

/// Generate a helpful suggestion for connection errors.
fn connection_suggestion(error: &sqlx::Error) -> &'static str {
    let error_str = error.to_string().to_lowercase();

    if error_str.contains("connection refused") {
        return "Check that the MySQL server is running and reachable at DB_HOST:DB_PORT";
    }

    if error_str.contains("access denied")
        || error_str.contains("authentication")
        || error_str.contains("password")
    {
        return "Verify DB_USER and DB_PASSWORD";
    }

    if error_str.contains("unknown database") {
        return "Check that DB_NAME names an existing database";
    }

    if error_str.contains("tls") || error_str.contains("ssl") {
        return "Check TLS/SSL configuration on the server";
    }

    "Verify DB_HOST, DB_PORT, DB_USER, DB_PASSWORD and DB_NAME"
}
