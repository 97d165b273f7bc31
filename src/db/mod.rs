//! Database access layer.
//!
//! - `executor`: the `SqlBackend` seam and its MySQL implementation
//! - `pool`: connection pool creation and demo-mode degradation
//! - `types`: MySQL row to JSON conversion

pub mod executor;
pub mod pool;
pub mod types;

pub use executor::{MySqlBackend, SqlBackend};
pub use pool::connect_or_degrade;
