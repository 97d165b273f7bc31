//! MySQL MCP Server - Main entry point.
//!
//! Exposes policy-guarded MySQL tools to AI assistants over stdio or
//! streamable HTTP.

use clap::Parser;
use mysql_mcp_server::config::{Config, TransportMode};
use mysql_mcp_server::db;
use mysql_mcp_server::mcp::ToolDispatcher;
use mysql_mcp_server::transport::{HttpTransport, StdioTransport, Transport};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the tracing subscriber for logging.
///
/// Output goes to stderr; stdout carries the stdio protocol.
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

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::parse();

    init_tracing(&config);

    info!(
        transport = %config.transport,
        "Starting MySQL MCP Server v{}",
        env!("CARGO_PKG_VERSION")
    );

    let policy = config.capability_policy();
    info!(
        allow_ddl = policy.allow_ddl,
        allow_dml = policy.allow_dml,
        allow_drop = policy.allow_drop,
        allow_create = policy.allow_create,
        allow_alter = policy.allow_alter,
        allow_insert = policy.allow_insert,
        allow_update = policy.allow_update,
        allow_delete = policy.allow_delete,
        allow_truncate = policy.allow_truncate,
        max_rows = policy.max_rows,
        "Query policy loaded"
    );

    let backend = db::connect_or_degrade(&config).await;
    let dispatcher = Arc::new(ToolDispatcher::new(backend, policy));

    let result = match config.transport {
        TransportMode::Stdio => {
            let transport = StdioTransport::new(dispatcher);
            info!(transport = transport.name(), "Using stdio transport");
            transport.run().await
        }
        TransportMode::Http => {
            info!(
                host = %config.http_host,
                port = config.http_port,
                endpoint = %config.mcp_endpoint,
                "Using HTTP transport"
            );
            let transport = HttpTransport::new(
                dispatcher,
                &config.http_host,
                config.http_port,
                &config.mcp_endpoint,
            );
            transport.run().await
        }
    };

    if let Err(e) = result {
        error!(error = %e, "Server error");
        return Err(e.into());
    }

    info!("Server shutdown complete");
    Ok(())
}
