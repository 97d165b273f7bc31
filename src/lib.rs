//! MySQL MCP Server Library
//!
//! This library provides MCP (Model Context Protocol) tools that let AI assistants
//! query a MySQL database through a configurable query policy. Every statement is
//! classified and checked against the capability flags before it reaches the
//! database.

pub mod config;
pub mod db;
pub mod error;
pub mod mcp;
pub mod models;
pub mod policy;
pub mod tools;
pub mod transport;

pub use config::Config;
pub use error::{DbError, DbResult};
pub use mcp::{MySqlService, ToolDispatcher};
pub use policy::{CapabilityPolicy, PolicyEnforcer};
