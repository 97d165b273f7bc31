//! Response envelope for MCP tools.
//!
//! Every tool call produces exactly one text block. Successes carry a short label
//! followed by pretty-printed JSON; failures are plain text.

use crate::error::DbError;
use rmcp::model::{CallToolResult, Content};
use serde::Serialize;

pub const QUERY_RESULTS_LABEL: &str = "Query results:";
pub const STATEMENT_EXECUTED_LABEL: &str = "Statement executed:";
pub const TABLE_STRUCTURE_LABEL: &str = "Table structure:";
pub const TABLES_LABEL: &str = "Tables:";
pub const QUERY_PLAN_LABEL: &str = "Query plan:";

/// Prefix on every policy rejection.
pub const SECURITY_ERROR_PREFIX: &str = "Security Error: ";

/// Render a successful result as `label` followed by pretty JSON.
pub fn success<T: Serialize>(label: &str, value: &T) -> CallToolResult {
    match serde_json::to_string_pretty(value) {
        Ok(json) => CallToolResult::success(vec![Content::text(format!("{}\n{}", label, json))]),
        Err(e) => failure(&DbError::internal(format!(
            "Failed to serialize result: {}",
            e
        ))),
    }
}

/// Render an error as a failed tool result.
pub fn failure(err: &DbError) -> CallToolResult {
    CallToolResult::error(vec![Content::text(failure_text(err))])
}

/// Caller-facing text for an error.
pub fn failure_text(err: &DbError) -> String {
    match err {
        DbError::PolicyViolation { reason, .. } => format!("{}{}", SECURITY_ERROR_PREFIX, reason),
        DbError::NotConfigured | DbError::UnknownTool { .. } => err.to_string(),
        _ => {
            let mut text = format!("Error: {}", err);
            if err.is_retryable() {
                text.push_str(" (retryable)");
            }
            if let Some(hint) = err.suggestion() {
                text.push_str("\nHint: ");
                text.push_str(hint);
            }
            text
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NOT_CONFIGURED_MESSAGE;
    use serde_json::json;

    fn text_of(result: &CallToolResult) -> String {
        result.content[0]
            .as_text()
            .map(|t| t.text.clone())
            .unwrap_or_default()
    }

    #[test]
    fn test_success_has_label_and_pretty_json() {
        let result = success(TABLES_LABEL, &json!(["orders", "users"]));
        assert_eq!(result.is_error, Some(false));
        assert_eq!(result.content.len(), 1);
        assert_eq!(
            text_of(&result),
            "Tables:\n[\n  \"orders\",\n  \"users\"\n]"
        );
    }

    #[test]
    fn test_policy_violation_text() {
        let err = DbError::policy_violation("DROP", "DROP operations are not allowed (ALLOW_DROP=false)");
        assert_eq!(
            failure_text(&err),
            "Security Error: DROP operations are not allowed (ALLOW_DROP=false)"
        );
        assert_eq!(failure(&err).is_error, Some(true));
    }

    #[test]
    fn test_not_configured_text_is_exact() {
        assert_eq!(failure_text(&DbError::NotConfigured), NOT_CONFIGURED_MESSAGE);
    }

    #[test]
    fn test_unknown_tool_text() {
        assert_eq!(
            failure_text(&DbError::unknown_tool("nope")),
            "Unknown tool: nope"
        );
    }

    #[test]
    fn test_retryable_errors_are_flagged() {
        let text = failure_text(&DbError::timeout("query execution", 30));
        assert!(text.starts_with("Error: Timeout"));
        assert!(text.contains("(retryable)"));
    }

    #[test]
    fn test_database_error_carries_hint() {
        let err = DbError::database("Table 'shop.nope' doesn't exist", Some("42S02".into()), "Check the table name");
        let text = failure_text(&err);
        assert!(text.starts_with("Error: Database error: Table 'shop.nope' doesn't exist"));
        assert!(text.ends_with("Hint: Check the table name"));
        assert!(!text.contains("retryable"));
    }
}
