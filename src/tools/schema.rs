//! Schema introspection tools.
//!
//! This module implements `mysql_describe_table` and `mysql_list_tables`. Neither
//! tool accepts caller SQL: the statements are fixed, and table identifiers are
//! bound as parameters rather than concatenated.

use crate::db::SqlBackend;
use crate::error::{DbError, DbResult};
use crate::models::QueryRequest;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use tracing::debug;

/// Fixed table-listing statement.
pub const LIST_TABLES_SQL: &str = "SHOW TABLES";

const DESCRIBE_COLUMNS: &str = "SELECT COLUMN_NAME AS `Field`, COLUMN_TYPE AS `Type`, \
     IS_NULLABLE AS `Null`, COLUMN_KEY AS `Key`, COLUMN_DEFAULT AS `Default`, EXTRA AS `Extra` \
     FROM information_schema.COLUMNS";

/// Input for the describe_table tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct DescribeTableInput {
    /// Table name, optionally qualified as `schema.table`
    pub table: String,
}

/// Input for the list_tables tool.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct ListTablesInput {}

/// Output from the describe_table tool.
#[derive(Debug, Clone, Serialize)]
pub struct DescribeTableOutput {
    pub table: String,
    /// One entry per column: Field, Type, Null, Key, Default, Extra
    pub columns: Vec<serde_json::Map<String, JsonValue>>,
}

/// Output from the list_tables tool.
#[derive(Debug, Clone, Serialize)]
pub struct ListTablesOutput {
    pub tables: Vec<String>,
    pub count: usize,
}

/// Split an optionally qualified table name into `(schema, table)`.
///
/// Surrounding backticks on either part are stripped.
pub fn split_table_name(name: &str) -> DbResult<(Option<String>, String)> {
    fn unquote(part: &str) -> &str {
        let part = part.trim();
        part.strip_prefix('`')
            .and_then(|p| p.strip_suffix('`'))
            .unwrap_or(part)
    }

    let (schema, table) = match name.trim().split_once('.') {
        Some((schema, table)) => (Some(unquote(schema)), unquote(table)),
        None => (None, unquote(name)),
    };

    if table.is_empty() || schema.is_some_and(str::is_empty) {
        return Err(DbError::invalid_input(format!(
            "invalid table name '{}'",
            name
        )));
    }

    Ok((schema.map(str::to_string), table.to_string()))
}

/// Build the parameterized describe statement for a table.
pub fn describe_request(schema: Option<&str>, table: &str) -> QueryRequest {
    match schema {
        Some(schema) => QueryRequest::new(format!(
            "{} WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ? ORDER BY ORDINAL_POSITION",
            DESCRIBE_COLUMNS
        ))
        .with_param(schema)
        .with_param(table),
        None => QueryRequest::new(format!(
            "{} WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ? ORDER BY ORDINAL_POSITION",
            DESCRIBE_COLUMNS
        ))
        .with_param(table),
    }
}

/// Handler for schema introspection.
pub struct SchemaToolHandler<B> {
    backend: Arc<B>,
}

impl<B: SqlBackend> SchemaToolHandler<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self { backend }
    }

    /// Describe the columns of one table.
    pub async fn describe_table(&self, input: DescribeTableInput) -> DbResult<DescribeTableOutput> {
        let (schema, table) = split_table_name(&input.table)?;
        debug!(schema = ?schema, table = %table, "Describing table");

        let result = self
            .backend
            .fetch(&describe_request(schema.as_deref(), &table))
            .await?;

        if result.is_empty() {
            return Err(DbError::schema("Table not found", input.table.trim()));
        }

        Ok(DescribeTableOutput {
            table: input.table.trim().to_string(),
            columns: result.rows,
        })
    }

    /// List the tables of the connected database.
    pub async fn list_tables(&self, _input: ListTablesInput) -> DbResult<ListTablesOutput> {
        let result = self.backend.fetch(&QueryRequest::new(LIST_TABLES_SQL)).await?;

        // SHOW TABLES yields one column named `Tables_in_<db>`.
        let tables: Vec<String> = result
            .rows
            .iter()
            .filter_map(|row| row.values().next())
            .map(|value| match value {
                JsonValue::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect();

        Ok(ListTablesOutput {
            count: tables.len(),
            tables,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_plain_table() {
        assert_eq!(
            split_table_name("users").unwrap(),
            (None, "users".to_string())
        );
    }

    #[test]
    fn test_split_qualified_table() {
        assert_eq!(
            split_table_name(" shop.orders ").unwrap(),
            (Some("shop".to_string()), "orders".to_string())
        );
    }

    #[test]
    fn test_split_strips_backticks() {
        assert_eq!(
            split_table_name("`shop`.`order items`").unwrap(),
            (Some("shop".to_string()), "order items".to_string())
        );
    }

    #[test]
    fn test_split_rejects_empty_parts() {
        assert!(split_table_name("").is_err());
        assert!(split_table_name("   ").is_err());
        assert!(split_table_name(".users").is_err());
        assert!(split_table_name("shop.").is_err());
    }

    #[test]
    fn test_describe_binds_identifiers() {
        let hostile = "users'; DROP TABLE users; --";
        let request = describe_request(None, hostile);
        assert!(!request.sql.contains(hostile));
        assert_eq!(request.params, vec![hostile.to_string()]);
        assert!(request.sql.contains("DATABASE()"));
    }

    #[test]
    fn test_describe_with_schema() {
        let request = describe_request(Some("shop"), "orders");
        assert_eq!(request.params, vec!["shop".to_string(), "orders".to_string()]);
        assert!(request.sql.contains("TABLE_SCHEMA = ?"));
        assert!(request.sql.ends_with("ORDER BY ORDINAL_POSITION"));
    }
}
