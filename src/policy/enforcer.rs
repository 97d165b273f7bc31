//! Policy enforcer.
//!
//! Turns a [`Classification`] plus the [`CapabilityPolicy`] into an allow/deny
//! decision. Two independent checks exist and both must pass before a statement
//! may run:
//!
//! - the dangerous-operation rules ([`PolicyEnforcer::check_statement`])
//! - the row-limit rule ([`PolicyEnforcer::check_limit`])
//!
//! `EXPLAIN` wrappers use [`PolicyEnforcer::check_explain`] instead: the danger
//! rules plus a ban on `ANALYZE`.
//!
//! The enforcer is stateless apart from its immutable policy and is safe to
//! share across tasks.

use crate::error::{DbError, DbResult};
use crate::policy::capability::CapabilityPolicy;
use crate::policy::classifier::{Classification, OperationKind, classify};
use serde::Serialize;

const UPDATE_WITHOUT_WHERE: &str = "UPDATE without WHERE clause is not allowed";
const PRIVILEGE_OPERATION: &str = "GRANT/REVOKE operations are not allowed";
const MISSING_LIMIT: &str = "SELECT queries must include a LIMIT clause";
const EXPLAIN_ANALYZE: &str =
    "EXPLAIN ANALYZE is not allowed (it runs the full statement without a row limit)";

/// Outcome of the dangerous-operation rules for one statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatementVerdict {
    pub operation_kind: OperationKind,
    pub is_dangerous: bool,
    /// Why the statement was rejected. `None` when it is safe.
    pub reason: Option<String>,
}

impl StatementVerdict {
    fn safe(operation_kind: OperationKind) -> Self {
        Self {
            operation_kind,
            is_dangerous: false,
            reason: None,
        }
    }

    fn dangerous(operation_kind: OperationKind, reason: impl Into<String>) -> Self {
        Self {
            operation_kind,
            is_dangerous: true,
            reason: Some(reason.into()),
        }
    }
}

/// Outcome of the row-limit rule for one statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LimitVerdict {
    pub is_valid: bool,
    pub reason: Option<String>,
}

impl LimitVerdict {
    fn valid() -> Self {
        Self {
            is_valid: true,
            reason: None,
        }
    }

    fn invalid(reason: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            reason: Some(reason.into()),
        }
    }
}

/// Applies a [`CapabilityPolicy`] to SQL statements.
#[derive(Debug, Clone, Default)]
pub struct PolicyEnforcer {
    policy: CapabilityPolicy,
}

impl PolicyEnforcer {
    pub fn new(policy: CapabilityPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &CapabilityPolicy {
        &self.policy
    }

    /// Run the dangerous-operation rules. The first failing rule wins.
    ///
    /// # Examples
    ///
    /// ```
    /// use mysql_mcp_server::policy::{CapabilityPolicy, PolicyEnforcer};
    ///
    /// let enforcer = PolicyEnforcer::new(CapabilityPolicy::default());
    /// let verdict = enforcer.check_statement("DELETE FROM users WHERE id=1");
    /// assert!(verdict.is_dangerous);
    /// assert_eq!(
    ///     verdict.reason.as_deref(),
    ///     Some("DELETE operations are not allowed (ALLOW_DELETE=false)")
    /// );
    /// ```
    pub fn check_statement(&self, sql: &str) -> StatementVerdict {
        self.check_classified(&classify(sql))
    }

    /// Rules for a statement that will be wrapped in `EXPLAIN`.
    ///
    /// The danger rules apply unchanged. An `ANALYZE` modifier is rejected as
    /// well, since `EXPLAIN ANALYZE` executes the statement uncapped.
    pub fn check_explain(&self, sql: &str) -> StatementVerdict {
        let classification = classify(sql);
        let verdict = self.check_classified(&classification);
        if verdict.is_dangerous {
            return verdict;
        }

        // `ANALYZE` may only be preceded by a `FORMAT=...` option.
        let analyze = classification
            .normalized
            .split_whitespace()
            .take(2)
            .any(|word| word == "ANALYZE");
        if analyze {
            return StatementVerdict::dangerous(verdict.operation_kind, EXPLAIN_ANALYZE);
        }

        verdict
    }

    fn check_classified(&self, c: &Classification) -> StatementVerdict {
        let kind = c.kind;

        // Flag-gated classes: DDL first, then INSERT, DELETE, UPDATE.
        match kind {
            OperationKind::Drop
            | OperationKind::Create
            | OperationKind::Alter
            | OperationKind::Truncate
            | OperationKind::Insert
            | OperationKind::Delete
                if !self.policy.allows(kind) =>
            {
                return StatementVerdict::dangerous(kind, flag_denied_reason(kind));
            }
            OperationKind::Update => {
                if !self.policy.allows(kind) {
                    return StatementVerdict::dangerous(kind, flag_denied_reason(kind));
                }
                // Safety floor regardless of flags.
                if !c.contains("WHERE ") {
                    return StatementVerdict::dangerous(kind, UPDATE_WITHOUT_WHERE);
                }
            }
            _ => {}
        }

        if let Some(cmd) = c.system_command {
            return StatementVerdict::dangerous(
                kind,
                format!("System command '{}' is not allowed", cmd.trim_end()),
            );
        }

        if matches!(kind, OperationKind::Grant | OperationKind::Revoke) {
            return StatementVerdict::dangerous(kind, PRIVILEGE_OPERATION);
        }

        StatementVerdict::safe(kind)
    }

    /// Run the row-limit rule.
    ///
    /// Any statement containing `SELECT ` must carry a `LIMIT ` clause, and every
    /// literal row count must not exceed `max_rows`. Placeholder counts such as
    /// `LIMIT ?` cannot be checked here; the executor caps those results instead.
    pub fn check_limit(&self, sql: &str) -> LimitVerdict {
        self.check_limit_classified(&classify(sql))
    }

    fn check_limit_classified(&self, c: &Classification) -> LimitVerdict {
        if !c.contains("SELECT ") {
            return LimitVerdict::valid();
        }

        let mut found = false;
        for (pos, clause) in c.normalized.match_indices("LIMIT ") {
            found = true;
            let rest = &c.normalized[pos + clause.len()..];
            if let Some(count) = parse_limit_count(rest) {
                if count > u64::from(self.policy.max_rows) {
                    return LimitVerdict::invalid(format!(
                        "LIMIT {} exceeds the maximum allowed rows ({})",
                        count, self.policy.max_rows
                    ));
                }
            }
        }

        if found {
            LimitVerdict::valid()
        } else {
            LimitVerdict::invalid(format!(
                "{} (maximum {} rows)",
                MISSING_LIMIT, self.policy.max_rows
            ))
        }
    }

    /// Run both checks, dangerous-operation rules first.
    ///
    /// Returns the operation kind on acceptance, or a
    /// [`DbError::PolicyViolation`] carrying the first failing reason.
    pub fn evaluate(&self, sql: &str) -> DbResult<OperationKind> {
        let classification = classify(sql);

        let verdict = self.check_classified(&classification);
        if let Some(reason) = verdict.reason {
            return Err(DbError::policy_violation(verdict.operation_kind.keyword(), reason));
        }

        let limit = self.check_limit_classified(&classification);
        if let Some(reason) = limit.reason {
            return Err(DbError::policy_violation("LIMIT", reason));
        }

        Ok(verdict.operation_kind)
    }
}

fn flag_denied_reason(kind: OperationKind) -> String {
    match CapabilityPolicy::flag_name(kind) {
        Some(flag) => format!("{} operations are not allowed ({}=false)", kind, flag),
        None => format!("{} operations are not allowed", kind),
    }
}

/// Parse the row count following a `LIMIT ` keyword.
///
/// Handles `LIMIT n`, `LIMIT n OFFSET m` and MySQL's `LIMIT offset, n`.
/// Returns `None` when no literal count is present (e.g. `LIMIT ?`).
/// Counts too large for `u64` saturate so they are still rejected.
fn parse_limit_count(rest: &str) -> Option<u64> {
    let (first, rest) = take_number(rest.trim_start())?;
    let rest = rest.trim_start();
    match rest.strip_prefix(',') {
        Some(after_comma) => take_number(after_comma.trim_start()).map(|(count, _)| count),
        None => Some(first),
    }
}

fn take_number(s: &str) -> Option<(u64, &str)> {
    let end = s
        .find(|ch: char| !ch.is_ascii_digit())
        .unwrap_or(s.len());
    if end == 0 {
        return None;
    }
    let value = s[..end].parse::<u64>().unwrap_or(u64::MAX);
    Some((value, &s[end..]))
}
