//! Query policy engine.
//!
//! - `capability`: immutable capability flags and row limit
//! - `classifier`: lexical statement classification
//! - `enforcer`: allow/deny decisions for statements and LIMIT clauses

pub mod capability;
pub mod classifier;
pub mod enforcer;

pub use capability::{CapabilityPolicy, DEFAULT_MAX_ROWS};
pub use classifier::{Classification, OperationKind, classify};
pub use enforcer::{LimitVerdict, PolicyEnforcer, StatementVerdict};
