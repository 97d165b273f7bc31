//! Query-related data models.
//!
//! This module defines the requests handed to the SQL backend and the results it
//! returns.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// A statement that has already passed the policy enforcer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRequest {
    pub sql: String,
    /// Bound positionally to `?` placeholders.
    #[serde(default)]
    pub params: Vec<String>,
    /// Row cap applied while fetching. `None` fetches everything.
    #[serde(default)]
    pub limit: Option<u32>,
}

impl QueryRequest {
    /// Create a new request without parameters or row cap.
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
            limit: None,
        }
    }

    /// Add a positional parameter.
    pub fn with_param(mut self, param: impl Into<String>) -> Self {
        self.params.push(param.into());
        self
    }

    /// Replace all positional parameters.
    pub fn with_params(mut self, params: Vec<String>) -> Self {
        self.params = params;
        self
    }

    /// Set the row cap.
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMetadata {
    pub name: String,
    /// MySQL type name as reported by the driver (e.g. "VARCHAR", "BIGINT")
    pub type_name: String,
    pub nullable: bool,
}

impl ColumnMetadata {
    /// Create new column metadata.
    pub fn new(name: impl Into<String>, type_name: impl Into<String>, nullable: bool) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            nullable,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub columns: Vec<ColumnMetadata>,
    pub rows: Vec<serde_json::Map<String, JsonValue>>,
    /// More rows were available than the row cap allowed.
    pub truncated: bool,
    pub execution_time_ms: u64,
}

impl QueryResult {
    /// Create an empty result.
    pub fn empty(execution_time_ms: u64) -> Self {
        Self {
            columns: Vec::new(),
            rows: Vec::new(),
            truncated: false,
            execution_time_ms,
        }
    }

    /// Get the number of rows in the result.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Outcome of a statement that returns no rows (INSERT, UPDATE, DELETE, DDL).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecuteResult {
    pub rows_affected: u64,
    pub last_insert_id: u64,
    pub execution_time_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_request_builder() {
        let req = QueryRequest::new("SELECT * FROM users WHERE id = ? LIMIT 1")
            .with_param("7")
            .with_limit(100);
        assert_eq!(req.params, vec!["7".to_string()]);
        assert_eq!(req.limit, Some(100));
    }

    #[test]
    fn test_query_request_defaults_from_json() {
        let req: QueryRequest = serde_json::from_str(r#"{"sql": "SHOW TABLES"}"#).unwrap();
        assert!(req.params.is_empty());
        assert_eq!(req.limit, None);
    }

    #[test]
    fn test_query_result_empty() {
        let result = QueryResult::empty(10);
        assert!(result.is_empty());
        assert_eq!(result.row_count(), 0);
        assert!(!result.truncated);
    }

    #[test]
    fn test_execute_result_serializes_counts() {
        let result = ExecuteResult {
            rows_affected: 3,
            last_insert_id: 0,
            execution_time_ms: 4,
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["rows_affected"], 3);
        assert_eq!(json["last_insert_id"], 0);
    }
}
