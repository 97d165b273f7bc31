//! Tool dispatch.
//!
//! [`ToolDispatcher`] maps a tool name to its handler and turns every outcome,
//! including failures, into a single-text-block [`CallToolResult`]. Dispatch never
//! returns an error to the transport.
//!
//! Without a backend the dispatcher is in demo mode: every call, whatever the tool
//! name, answers with the fixed configuration message and nothing is executed.

use crate::db::SqlBackend;
use crate::error::{DbError, DbResult};
use crate::policy::{CapabilityPolicy, PolicyEnforcer};
use crate::tools::explain::{ExplainInput, ExplainToolHandler};
use crate::tools::format::{
    self, QUERY_PLAN_LABEL, QUERY_RESULTS_LABEL, STATEMENT_EXECUTED_LABEL, TABLE_STRUCTURE_LABEL,
    TABLES_LABEL,
};
use crate::tools::query::{QueryInput, QueryOutcome, QueryToolHandler};
use crate::tools::schema::{DescribeTableInput, ListTablesInput, SchemaToolHandler};
use rmcp::model::{CallToolResult, JsonObject, Tool};
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use std::sync::Arc;
use tracing::{debug, warn};

pub const TOOL_QUERY: &str = "mysql_query";
pub const TOOL_DESCRIBE_TABLE: &str = "mysql_describe_table";
pub const TOOL_LIST_TABLES: &str = "mysql_list_tables";
pub const TOOL_EXPLAIN: &str = "mysql_explain";

/// Routes tool calls to handlers, applying the policy enforcer first.
pub struct ToolDispatcher<B> {
    backend: Option<Arc<B>>,
    enforcer: Arc<PolicyEnforcer>,
}

impl<B: SqlBackend> ToolDispatcher<B> {
    /// Create a dispatcher. Pass `None` as the backend to run in demo mode.
    pub fn new(backend: Option<B>, policy: CapabilityPolicy) -> Self {
        Self {
            backend: backend.map(Arc::new),
            enforcer: Arc::new(PolicyEnforcer::new(policy)),
        }
    }

    /// Whether the dispatcher runs without a database.
    pub fn is_demo_mode(&self) -> bool {
        self.backend.is_none()
    }

    pub fn enforcer(&self) -> &PolicyEnforcer {
        &self.enforcer
    }

    /// The advertised tool catalog.
    pub fn catalog() -> Vec<Tool> {
        vec![
            Tool::new(
                TOOL_QUERY,
                "Execute a SQL statement against the MySQL database.\n\
                 SELECT statements must include a LIMIT no larger than the configured maximum.\n\
                 Write and DDL statements run only when the matching ALLOW_* flag is enabled; \
                 UPDATE always requires a WHERE clause.\n\
                 Use `params` to bind values to `?` placeholders.",
                input_schema::<QueryInput>(),
            ),
            Tool::new(
                TOOL_DESCRIBE_TABLE,
                "Describe the columns of a table (Field, Type, Null, Key, Default, Extra).\n\
                 Accepts `table` or `schema.table`.",
                input_schema::<DescribeTableInput>(),
            ),
            Tool::new(
                TOOL_LIST_TABLES,
                "List all tables in the connected database.",
                input_schema::<ListTablesInput>(),
            ),
            Tool::new(
                TOOL_EXPLAIN,
                "Show the MySQL execution plan for a statement.\n\
                 Statements blocked by the server's policy cannot be explained either, \
                 and EXPLAIN ANALYZE is not available.",
                input_schema::<ExplainInput>(),
            ),
        ]
    }

    /// Run one tool call and render its outcome.
    pub async fn dispatch(&self, name: &str, arguments: Option<JsonObject>) -> CallToolResult {
        let Some(backend) = &self.backend else {
            debug!(tool = %name, "Tool call in demo mode");
            return format::failure(&DbError::NotConfigured);
        };

        match self.route(backend, name, arguments).await {
            Ok(result) => result,
            Err(e) => {
                match &e {
                    DbError::PolicyViolation { operation, reason } => {
                        warn!(
                            tool = %name,
                            operation = %operation,
                            reason = %reason,
                            "Statement rejected by policy"
                        );
                    }
                    _ => warn!(tool = %name, error = %e, "Tool call failed"),
                }
                format::failure(&e)
            }
        }
    }

    async fn route(
        &self,
        backend: &Arc<B>,
        name: &str,
        arguments: Option<JsonObject>,
    ) -> DbResult<CallToolResult> {
        match name {
            TOOL_QUERY => {
                let input: QueryInput = parse_arguments(arguments)?;
                let handler = QueryToolHandler::new(backend.clone(), self.enforcer.clone());
                Ok(match handler.query(input).await? {
                    QueryOutcome::Rows(output) => format::success(QUERY_RESULTS_LABEL, &output),
                    QueryOutcome::Executed(output) => {
                        format::success(STATEMENT_EXECUTED_LABEL, &output)
                    }
                })
            }
            TOOL_DESCRIBE_TABLE => {
                let input: DescribeTableInput = parse_arguments(arguments)?;
                let output = SchemaToolHandler::new(backend.clone())
                    .describe_table(input)
                    .await?;
                Ok(format::success(TABLE_STRUCTURE_LABEL, &output))
            }
            TOOL_LIST_TABLES => {
                let input: ListTablesInput = parse_arguments(arguments)?;
                let output = SchemaToolHandler::new(backend.clone())
                    .list_tables(input)
                    .await?;
                Ok(format::success(TABLES_LABEL, &output))
            }
            TOOL_EXPLAIN => {
                let input: ExplainInput = parse_arguments(arguments)?;
                let output = ExplainToolHandler::new(backend.clone(), self.enforcer.clone())
                    .explain(input)
                    .await?;
                Ok(format::success(QUERY_PLAN_LABEL, &output))
            }
            other => Err(DbError::unknown_tool(other)),
        }
    }

    /// Close the backend's connections, if any.
    pub async fn shutdown(&self) {
        if let Some(backend) = &self.backend {
            backend.close().await;
        }
    }
}

/// Deserialize tool arguments. A missing argument object is treated as empty.
fn parse_arguments<T: DeserializeOwned>(arguments: Option<JsonObject>) -> DbResult<T> {
    serde_json::from_value(JsonValue::Object(arguments.unwrap_or_default()))
        .map_err(|e| DbError::invalid_input(e.to_string()))
}

/// JSON Schema for a tool's input type.
fn input_schema<T: JsonSchema>() -> Arc<JsonObject> {
    match serde_json::to_value(schemars::schema_for!(T)) {
        Ok(JsonValue::Object(map)) => Arc::new(map),
        _ => Arc::new(JsonObject::new()),
    }
}
