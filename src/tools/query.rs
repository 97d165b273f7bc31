//! Query execution tool.
//!
//! This module implements the `mysql_query` MCP tool. Every statement passes the
//! policy enforcer before it reaches the backend; row-returning statements are
//! fetched under the configured row cap, everything else runs on the execute path.

use crate::db::SqlBackend;
use crate::error::{DbError, DbResult};
use crate::models::{ColumnMetadata, ExecuteResult, QueryRequest, QueryResult};
use crate::policy::{OperationKind, PolicyEnforcer};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use tracing::info;

/// Input for the query tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct QueryInput {
    /// SQL statement to execute. SELECT statements must include a LIMIT clause.
    pub query: String,
    /// Positional parameters bound to `?` placeholders, in order
    #[serde(default)]
    pub params: Option<Vec<String>>,
}

/// Rows returned by a SELECT (or other row-returning statement).
#[derive(Debug, Clone, Serialize)]
pub struct QueryOutput {
    pub columns: Vec<ColumnMetadata>,
    pub rows: Vec<serde_json::Map<String, JsonValue>>,
    pub row_count: usize,
    /// True if more rows existed than the configured maximum
    pub truncated: bool,
    pub execution_time_ms: u64,
}

impl From<QueryResult> for QueryOutput {
    fn from(result: QueryResult) -> Self {
        Self {
            row_count: result.rows.len(),
            columns: result.columns,
            rows: result.rows,
            truncated: result.truncated,
            execution_time_ms: result.execution_time_ms,
        }
    }
}

/// Outcome of a statement that returns no rows.
#[derive(Debug, Clone, Serialize)]
pub struct ExecuteOutput {
    /// Statement class, e.g. "INSERT"
    pub operation: OperationKind,
    pub rows_affected: u64,
    pub last_insert_id: u64,
    pub execution_time_ms: u64,
}

impl ExecuteOutput {
    fn new(operation: OperationKind, result: ExecuteResult) -> Self {
        Self {
            operation,
            rows_affected: result.rows_affected,
            last_insert_id: result.last_insert_id,
            execution_time_ms: result.execution_time_ms,
        }
    }
}

/// What a permitted statement produced.
#[derive(Debug, Clone)]
pub enum QueryOutcome {
    Rows(QueryOutput),
    Executed(ExecuteOutput),
}

/// Handler for query execution.
pub struct QueryToolHandler<B> {
    backend: Arc<B>,
    enforcer: Arc<PolicyEnforcer>,
}

impl<B: SqlBackend> QueryToolHandler<B> {
    pub fn new(backend: Arc<B>, enforcer: Arc<PolicyEnforcer>) -> Self {
        Self { backend, enforcer }
    }

    /// Check the statement against the policy, then run it.
    pub async fn query(&self, input: QueryInput) -> DbResult<QueryOutcome> {
        if input.query.trim().is_empty() {
            return Err(DbError::invalid_input("query must not be empty"));
        }

        let operation = self.enforcer.evaluate(&input.query)?;
        let max_rows = self.enforcer.policy().max_rows;
        let params = input.params.unwrap_or_default();

        info!(
            operation = %operation,
            params = params.len(),
            "Executing permitted statement"
        );

        let request = QueryRequest::new(input.query).with_params(params);

        if operation.returns_rows() {
            let result = self.backend.fetch(&request.with_limit(max_rows)).await?;
            Ok(QueryOutcome::Rows(result.into()))
        } else {
            let result = self.backend.execute(&request).await?;
            Ok(QueryOutcome::Executed(ExecuteOutput::new(operation, result)))
        }
    }
}
