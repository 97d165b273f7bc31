//! Lexical statement classifier.
//!
//! Labels a raw SQL string with its operation kind using prefix matching on the
//! trimmed, uppercased text, and detects embedded system commands by substring
//! search anywhere in the statement.
//!
//! This is a heuristic layer, not a parser. Comments, unusual whitespace or
//! multi-statement batches can produce shapes it does not recognize, and those
//! classify as [`OperationKind::Other`].

use serde::Serialize;
use std::fmt;

/// Operation class of a SQL statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OperationKind {
    Select,
    Insert,
    Update,
    Delete,
    Drop,
    Create,
    Alter,
    Truncate,
    Grant,
    Revoke,
    /// No known prefix, but a system command was found in the text
    System,
    /// Unrecognized statement shape (SHOW, SET, WITH, CALL, ...)
    Other,
}

impl OperationKind {
    /// Keyword used in policy messages.
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Select => "SELECT",
            Self::Insert => "INSERT",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
            Self::Drop => "DROP",
            Self::Create => "CREATE",
            Self::Alter => "ALTER",
            Self::Truncate => "TRUNCATE",
            Self::Grant => "GRANT",
            Self::Revoke => "REVOKE",
            Self::System => "SYSTEM",
            Self::Other => "OTHER",
        }
    }

    /// Whether the statement class changes schema objects.
    pub fn is_ddl(&self) -> bool {
        matches!(self, Self::Drop | Self::Create | Self::Alter | Self::Truncate)
    }

    /// Whether statements of this class produce a result set worth fetching.
    ///
    /// Unrecognized shapes are fetched too, since SHOW/DESCRIBE/WITH return rows.
    pub fn returns_rows(&self) -> bool {
        matches!(self, Self::Select | Self::Other | Self::System)
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// Statement-type prefixes, checked with `starts_with` on the normalized text.
const PREFIXES: &[(&str, OperationKind)] = &[
    ("DROP", OperationKind::Drop),
    ("CREATE", OperationKind::Create),
    ("ALTER", OperationKind::Alter),
    ("TRUNCATE", OperationKind::Truncate),
    ("INSERT", OperationKind::Insert),
    ("DELETE", OperationKind::Delete),
    ("UPDATE", OperationKind::Update),
    ("GRANT", OperationKind::Grant),
    ("REVOKE", OperationKind::Revoke),
    ("SELECT", OperationKind::Select),
];

/// System commands, checked with `contains` so they are caught mid-statement.
pub const SYSTEM_COMMANDS: &[&str] = &["SHUTDOWN", "KILL ", "STOP SLAVE", "RESET MASTER"];

/// Classification of one SQL string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub kind: OperationKind,
    /// Trimmed, uppercased text used for matching. Never executed.
    pub normalized: String,
    /// First system command found anywhere in the text.
    pub system_command: Option<&'static str>,
}

impl Classification {
    /// Whether the normalized text contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.normalized.contains(needle)
    }
}

/// Normalize SQL for matching: trim surrounding whitespace and uppercase.
pub fn normalize(sql: &str) -> String {
    sql.trim().to_uppercase()
}

/// Classify a raw SQL string.
///
/// # Examples
///
/// ```
/// use mysql_mcp_server::policy::classifier::{classify, OperationKind};
///
/// let c = classify("  drop table users");
/// assert_eq!(c.kind, OperationKind::Drop);
///
/// let c = classify("SELECT 1; SHUTDOWN");
/// assert_eq!(c.kind, OperationKind::Select);
/// assert_eq!(c.system_command, Some("SHUTDOWN"));
/// ```
pub fn classify(sql: &str) -> Classification {
    let normalized = normalize(sql);

    let system_command = SYSTEM_COMMANDS
        .iter()
        .copied()
        .find(|cmd| normalized.contains(cmd));

    let kind = PREFIXES
        .iter()
        .find(|(prefix, _)| normalized.starts_with(prefix))
        .map(|(_, kind)| *kind)
        .unwrap_or(if system_command.is_some() {
            OperationKind::System
        } else {
            OperationKind::Other
        });

    Classification {
        kind,
        normalized,
        system_command,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_kinds() {
        let cases = [
            ("DROP TABLE users", OperationKind::Drop),
            ("CREATE TABLE t (id INT)", OperationKind::Create),
            ("ALTER TABLE t ADD c INT", OperationKind::Alter),
            ("TRUNCATE users", OperationKind::Truncate),
            ("INSERT INTO t VALUES (1)", OperationKind::Insert),
            ("DELETE FROM t WHERE id = 1", OperationKind::Delete),
            ("UPDATE t SET a = 1", OperationKind::Update),
            ("GRANT ALL ON *.* TO 'x'", OperationKind::Grant),
            ("REVOKE ALL ON *.* FROM 'x'", OperationKind::Revoke),
            ("SELECT * FROM t LIMIT 1", OperationKind::Select),
        ];
        for (sql, expected) in cases {
            assert_eq!(classify(sql).kind, expected, "sql: {}", sql);
        }
    }

    #[test]
    fn test_case_and_whitespace_insensitive() {
        assert_eq!(classify("\n\t  dRoP table x").kind, OperationKind::Drop);
        assert_eq!(classify("   select 1 limit 1  ").kind, OperationKind::Select);
    }

    #[test]
    fn test_normalized_preserves_inner_text() {
        let c = classify("  select name from users where name = 'Bob'  ");
        assert_eq!(c.normalized, "SELECT NAME FROM USERS WHERE NAME = 'BOB'");
    }

    #[test]
    fn test_unrecognized_shapes_are_other() {
        assert_eq!(classify("SHOW TABLES").kind, OperationKind::Other);
        assert_eq!(
            classify("WITH x AS (SELECT 1) SELECT * FROM x").kind,
            OperationKind::Other
        );
        assert_eq!(classify("").kind, OperationKind::Other);
    }

    #[test]
    fn test_system_command_found_mid_statement() {
        let c = classify("SELECT 1 LIMIT 1; KILL 42");
        assert_eq!(c.kind, OperationKind::Select);
        assert_eq!(c.system_command, Some("KILL "));
    }

    #[test]
    fn test_system_command_without_prefix() {
        let c = classify("stop slave");
        assert_eq!(c.kind, OperationKind::System);
        assert_eq!(c.system_command, Some("STOP SLAVE"));
    }

    #[test]
    fn test_kill_requires_trailing_space() {
        assert_eq!(classify("SELECT killed FROM t LIMIT 1").system_command, None);
        assert_eq!(classify("KILLALL").system_command, None);
        // Substring matching has no word boundaries.
        assert_eq!(
            classify("SELECT skill FROM t LIMIT 1").system_command,
            Some("KILL ")
        );
    }

    #[test]
    fn test_returns_rows() {
        assert!(OperationKind::Select.returns_rows());
        assert!(OperationKind::Other.returns_rows());
        assert!(!OperationKind::Insert.returns_rows());
        assert!(!OperationKind::Drop.returns_rows());
    }

    #[test]
    fn test_classification_is_pure() {
        let sql = "UPDATE users SET a = 1 WHERE id = 2";
        assert_eq!(classify(sql), classify(sql));
    }
}
