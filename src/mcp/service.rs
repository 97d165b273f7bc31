//! MCP service implementation using rmcp.
//!
//! This module defines [`MySqlService`], which exposes the tool catalog over the
//! MCP protocol. The `ServerHandler` is implemented by hand rather than with the
//! router macros so that unknown tool names and demo mode are answered as tool
//! results instead of protocol errors.

use crate::db::{MySqlBackend, SqlBackend};
use crate::mcp::dispatcher::ToolDispatcher;
use rmcp::{
    ErrorData as McpError, RoleServer, ServerHandler,
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult,
        PaginatedRequestParam, ProtocolVersion, ServerCapabilities, ServerInfo,
    },
    service::RequestContext,
};
use std::future::Future;
use std::sync::Arc;
use tracing::debug;

pub struct MySqlService<B = MySqlBackend> {
    /// Shared dispatcher; one per process, cloned into every session
    dispatcher: Arc<ToolDispatcher<B>>,
}

impl<B> Clone for MySqlService<B> {
    fn clone(&self) -> Self {
        Self {
            dispatcher: self.dispatcher.clone(),
        }
    }
}

impl<B: SqlBackend> MySqlService<B> {
    /// Create a new service over a shared dispatcher.
    pub fn new(dispatcher: Arc<ToolDispatcher<B>>) -> Self {
        Self { dispatcher }
    }

    pub fn dispatcher(&self) -> &Arc<ToolDispatcher<B>> {
        &self.dispatcher
    }

    fn instructions(&self) -> String {
        let policy = self.dispatcher.enforcer().policy();
        let mut text = String::from(
            "MySQL tools guarded by a query policy.\n\
            \n\
            ## Tools\n\
            - `mysql_list_tables`: list tables in the connected database\n\
            - `mysql_describe_table`: column definitions for `table` or `schema.table`\n\
            - `mysql_query`: run SQL; bind values with `params` and `?` placeholders\n\
            - `mysql_explain`: execution plan for a statement\n\
            \n\
            ## Rules\n",
        );
        text.push_str(&format!(
            "- SELECT statements must include `LIMIT n` with n <= {}\n",
            policy.max_rows
        ));
        text.push_str("- UPDATE statements require a WHERE clause\n");
        text.push_str("- GRANT, REVOKE and server commands (SHUTDOWN, KILL) are always rejected\n");
        text.push_str("- One statement per call; `EXPLAIN ANALYZE` is rejected\n");
        text.push_str("- Rejected statements return text starting with `Security Error:`");
        if self.dispatcher.is_demo_mode() {
            text.push_str(
                "\n\nNo database is configured: every tool returns a configuration message.",
            );
        }
        text
    }
}

impl<B: SqlBackend> ServerHandler for MySqlService<B> {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_03_26,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "mysql-mcp-server".to_owned(),
                title: Some("MySQL MCP Server".to_owned()),
                version: env!("CARGO_PKG_VERSION").to_owned(),
                icons: None,
                website_url: None,
            },
            instructions: Some(self.instructions()),
        }
    }

    fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> impl Future<Output = Result<ListToolsResult, McpError>> + Send + '_ {
        async move { Ok(ListToolsResult::with_all_items(ToolDispatcher::<B>::catalog())) }
    }

    fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> impl Future<Output = Result<CallToolResult, McpError>> + Send + '_ {
        async move {
            debug!(tool = %request.name, "Tool call received");
            Ok(self
                .dispatcher
                .dispatch(&request.name, request.arguments)
                .await)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::CapabilityPolicy;

    fn demo_service() -> MySqlService {
        MySqlService::new(Arc::new(ToolDispatcher::new(
            None,
            CapabilityPolicy::default(),
        )))
    }

    #[test]
    fn test_server_info() {
        let info = demo_service().get_info();
        assert_eq!(info.server_info.name, "mysql-mcp-server");
        assert!(info.capabilities.tools.is_some());
    }

    #[test]
    fn test_instructions_mention_row_limit_and_demo_mode() {
        let instructions = demo_service().get_info().instructions.unwrap_or_default();
        assert!(instructions.contains("n <= 1000"));
        assert!(instructions.contains("No database is configured"));
    }

    #[test]
    fn test_clone_shares_dispatcher() {
        let service = demo_service();
        let cloned = service.clone();
        assert!(Arc::ptr_eq(service.dispatcher(), cloned.dispatcher()));
    }
}
