//! Shared helpers for integration tests.
//!
//! `RecordingBackend` stands in for MySQL: it records every request it receives
//! and answers with canned results.

#![allow(dead_code)]

use mysql_mcp_server::db::SqlBackend;
use mysql_mcp_server::error::{DbError, DbResult};
use mysql_mcp_server::mcp::ToolDispatcher;
use mysql_mcp_server::models::{ColumnMetadata, ExecuteResult, QueryRequest, QueryResult};
use mysql_mcp_server::policy::CapabilityPolicy;
use rmcp::model::{CallToolResult, JsonObject};
use serde_json::{Value as JsonValue, json};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Fetch(QueryRequest),
    Execute(QueryRequest),
    Close,
}

/// Canned failure, rebuilt for every call since `DbError` is not `Clone`.
#[derive(Debug, Clone, Copy)]
pub enum Failure {
    Timeout,
    UnknownTable,
    /// The server refusing to prepare a `;`-stacked batch.
    StackedStatement,
}

impl Failure {
    fn to_error(self) -> DbError {
        match self {
            Failure::Timeout => DbError::timeout("query execution", 30),
            Failure::UnknownTable => DbError::database(
                "Table 'shop.nope' doesn't exist",
                Some("42S02".to_string()),
                "Check the SQL syntax and referenced objects",
            ),
            Failure::StackedStatement => DbError::database(
                "You have an error in your SQL syntax; check the manual that corresponds \
                 to your MySQL server version for the right syntax to use near \
                 '; DROP TABLE users' at line 1",
                Some("42000".to_string()),
                "Check the SQL syntax and referenced objects",
            ),
        }
    }
}

#[derive(Default)]
pub struct RecordingBackend {
    calls: Arc<Mutex<Vec<Call>>>,
    rows: Vec<serde_json::Map<String, JsonValue>>,
    failure: Option<Failure>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every fetch with these rows (the row cap still applies).
    pub fn with_rows(mut self, rows: Vec<JsonValue>) -> Self {
        self.rows = rows
            .into_iter()
            .filter_map(|row| row.as_object().cloned())
            .collect();
        self
    }

    pub fn failing(mut self, failure: Failure) -> Self {
        self.failure = Some(failure);
        self
    }

    /// Handle to the call log that stays valid after the backend moves.
    pub fn calls(&self) -> Arc<Mutex<Vec<Call>>> {
        self.calls.clone()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

impl SqlBackend for RecordingBackend {
    async fn fetch(&self, request: &QueryRequest) -> DbResult<QueryResult> {
        self.record(Call::Fetch(request.clone()));
        if let Some(failure) = self.failure {
            return Err(failure.to_error());
        }

        let cap = request.limit.map(|l| l as usize).unwrap_or(usize::MAX);
        let columns = self
            .rows
            .first()
            .map(|row| {
                row.keys()
                    .map(|k| ColumnMetadata::new(k.as_str(), "VARCHAR", true))
                    .collect()
            })
            .unwrap_or_default();

        Ok(QueryResult {
            columns,
            rows: self.rows.iter().take(cap).cloned().collect(),
            truncated: self.rows.len() > cap,
            execution_time_ms: 1,
        })
    }

    async fn execute(&self, request: &QueryRequest) -> DbResult<ExecuteResult> {
        self.record(Call::Execute(request.clone()));
        if let Some(failure) = self.failure {
            return Err(failure.to_error());
        }
        Ok(ExecuteResult {
            rows_affected: 1,
            last_insert_id: 0,
            execution_time_ms: 1,
        })
    }

    async fn close(&self) {
        self.record(Call::Close);
    }
}

/// Dispatcher over a recording backend, plus its call log.
pub fn dispatcher(
    backend: RecordingBackend,
    policy: CapabilityPolicy,
) -> (ToolDispatcher<RecordingBackend>, Arc<Mutex<Vec<Call>>>) {
    let calls = backend.calls();
    (ToolDispatcher::new(Some(backend), policy), calls)
}

pub fn query_args(sql: &str) -> Option<JsonObject> {
    json!({ "query": sql }).as_object().cloned()
}

pub fn args(value: JsonValue) -> Option<JsonObject> {
    value.as_object().cloned()
}

/// The single text block of a tool result.
pub fn text_of(result: &CallToolResult) -> String {
    assert_eq!(result.content.len(), 1, "expected exactly one content block");
    result.content[0]
        .as_text()
        .map(|t| t.text.clone())
        .expect("content block should be text")
}

/// Parse the JSON that follows the label line of a success response.
pub fn json_body(text: &str) -> JsonValue {
    let (_, body) = text.split_once('\n').expect("label line followed by JSON");
    serde_json::from_str(body).expect("valid JSON body")
}
