//! Capability policy for SQL operation classes.
//!
//! The policy is built once at startup from [`Config`](crate::config::Config) and
//! shared read-only for the rest of the process lifetime.

use crate::policy::classifier::OperationKind;
use serde::Serialize;

/// Default maximum number of rows a SELECT may request.
pub const DEFAULT_MAX_ROWS: u32 = 1000;

/// Capability flags and limits governing which statements may run.
///
/// Each gated class is permitted only by its own flag: a DELETE needs
/// `allow_delete`, a DROP needs `allow_drop`, and so on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CapabilityPolicy {
    /// Informational only. Never enables DROP/CREATE/ALTER/TRUNCATE.
    pub allow_ddl: bool,
    /// Informational only. Never enables INSERT/UPDATE/DELETE.
    pub allow_dml: bool,
    pub allow_drop: bool,
    pub allow_create: bool,
    pub allow_alter: bool,
    pub allow_insert: bool,
    pub allow_update: bool,
    pub allow_delete: bool,
    pub allow_truncate: bool,
    /// Upper bound for any `LIMIT n` clause. Always at least 1.
    pub max_rows: u32,
}

impl Default for CapabilityPolicy {
    fn default() -> Self {
        Self {
            allow_ddl: false,
            allow_dml: false,
            allow_drop: false,
            allow_create: false,
            allow_alter: false,
            allow_insert: false,
            allow_update: false,
            allow_delete: false,
            allow_truncate: false,
            max_rows: DEFAULT_MAX_ROWS,
        }
    }
}

impl CapabilityPolicy {
    /// Whether the flags permit the given operation class.
    ///
    /// Only the flag-gated classes consult the flags. Privilege and system
    /// operations are never permitted; every other class is permitted here and
    /// left to the remaining enforcer rules.
    pub fn allows(&self, kind: OperationKind) -> bool {
        match kind {
            OperationKind::Drop => self.allow_drop,
            OperationKind::Create => self.allow_create,
            OperationKind::Alter => self.allow_alter,
            OperationKind::Truncate => self.allow_truncate,
            OperationKind::Insert => self.allow_insert,
            OperationKind::Update => self.allow_update,
            OperationKind::Delete => self.allow_delete,
            OperationKind::Grant | OperationKind::Revoke | OperationKind::System => false,
            OperationKind::Select | OperationKind::Other => true,
        }
    }

    /// Name of the configuration key that enables the given operation class.
    pub fn flag_name(kind: OperationKind) -> Option<&'static str> {
        match kind {
            OperationKind::Drop => Some("ALLOW_DROP"),
            OperationKind::Create => Some("ALLOW_CREATE"),
            OperationKind::Alter => Some("ALLOW_ALTER"),
            OperationKind::Truncate => Some("ALLOW_TRUNCATE"),
            OperationKind::Insert => Some("ALLOW_INSERT"),
            OperationKind::Update => Some("ALLOW_UPDATE"),
            OperationKind::Delete => Some("ALLOW_DELETE"),
            _ => None,
        }
    }
}
