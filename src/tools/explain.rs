//! Query execution plan tool.
//!
//! This module implements the `mysql_explain` MCP tool. The wrapped statement is
//! screened with the same danger rules as `mysql_query`, and `EXPLAIN ANALYZE`
//! is refused. The LIMIT rule is not applied: a plain plan returns no table data.

use crate::db::SqlBackend;
use crate::error::{DbError, DbResult};
use crate::models::QueryRequest;
use crate::policy::PolicyEnforcer;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Input for the explain tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ExplainInput {
    /// SQL statement to explain
    pub query: String,
}

/// Output from the explain tool.
#[derive(Debug, Clone, Serialize)]
pub struct ExplainOutput {
    /// EXPLAIN result rows
    pub plan: Vec<serde_json::Map<String, serde_json::Value>>,
    pub execution_time_ms: u64,
}

/// Wrap a statement in MySQL's explain prefix.
pub fn explain_sql(query: &str) -> String {
    format!("EXPLAIN {}", query.trim())
}

/// Handler for the explain tool.
pub struct ExplainToolHandler<B> {
    backend: Arc<B>,
    enforcer: Arc<PolicyEnforcer>,
}

impl<B: SqlBackend> ExplainToolHandler<B> {
    pub fn new(backend: Arc<B>, enforcer: Arc<PolicyEnforcer>) -> Self {
        Self { backend, enforcer }
    }

    /// Handle the explain tool call.
    pub async fn explain(&self, input: ExplainInput) -> DbResult<ExplainOutput> {
        if input.query.trim().is_empty() {
            return Err(DbError::invalid_input("query must not be empty"));
        }

        let verdict = self.enforcer.check_explain(&input.query);
        if let Some(reason) = verdict.reason {
            return Err(DbError::policy_violation(
                verdict.operation_kind.keyword(),
                reason,
            ));
        }

        debug!(operation = %verdict.operation_kind, "Explaining statement");
        let result = self
            .backend
            .fetch(&QueryRequest::new(explain_sql(&input.query)))
            .await?;

        Ok(ExplainOutput {
            plan: result.rows,
            execution_time_ms: result.execution_time_ms,
        })
    }
}
