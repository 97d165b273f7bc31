//! MCP server integration module.
//!
//! - `dispatcher`: tool name routing, policy enforcement and the response envelope
//! - `service`: the rmcp `ServerHandler` exposing the dispatcher

pub mod dispatcher;
pub mod service;

pub use dispatcher::ToolDispatcher;
pub use service::MySqlService;
