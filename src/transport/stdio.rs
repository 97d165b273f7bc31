//! Stdio transport for the MCP server.
//!
//! This transport uses standard input/output for communication,
//! which is the standard mode for CLI-based MCP integrations.
//! Logs go to stderr so they never interleave with protocol frames.

use crate::db::MySqlBackend;
use crate::error::{DbError, DbResult};
use crate::mcp::{MySqlService, ToolDispatcher};
use crate::transport::{Transport, wait_for_signal};
use rmcp::{ServiceExt, transport::stdio};
use std::sync::Arc;
use tracing::{info, warn};

/// Stdio transport implementation.
pub struct StdioTransport {
    dispatcher: Arc<ToolDispatcher<MySqlBackend>>,
}

impl StdioTransport {
    pub fn new(dispatcher: Arc<ToolDispatcher<MySqlBackend>>) -> Self {
        Self { dispatcher }
    }
}

impl Transport for StdioTransport {
    async fn run(&self) -> DbResult<()> {
        info!("Starting MCP server with stdio transport");

        let service = MySqlService::new(self.dispatcher.clone());
        let running_service = service
            .serve(stdio())
            .await
            .map_err(|e| DbError::internal(format!("Failed to start stdio transport: {}", e)))?;

        let shutdown_requested = tokio::select! {
            result = running_service.waiting() => {
                if let Err(e) = result {
                    warn!(error = %e, "Stdio transport error");
                    self.dispatcher.shutdown().await;
                    return Err(DbError::internal(format!("Stdio transport error: {}", e)));
                }
                info!("Client closed the session");
                false
            }
            _ = wait_for_signal() => {
                info!("Shutdown signal received (send again to force exit)");
                true
            }
        };

        if shutdown_requested {
            tokio::spawn(async {
                wait_for_signal().await;
                warn!("Received second signal, forcing immediate exit");
                std::process::exit(1);
            });
        }

        info!("Closing database connections");
        self.dispatcher.shutdown().await;

        if shutdown_requested {
            // A blocking stdin read cannot be interrupted by select!.
            info!("Exiting process");
            std::process::exit(0);
        }

        Ok(())
    }

    fn name(&self) -> &'static str {
        "stdio"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::CapabilityPolicy;

    #[test]
    fn test_stdio_transport_creation() {
        let dispatcher = Arc::new(ToolDispatcher::new(None, CapabilityPolicy::default()));
        let transport = StdioTransport::new(dispatcher);
        assert_eq!(transport.name(), "stdio");
    }
}
