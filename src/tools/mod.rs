//! MCP tool implementations.
//!
//! This module contains all database tool handlers:
//! - `query`: Execute policy-checked SQL (`mysql_query`)
//! - `schema`: Describe a table and list tables (`mysql_describe_table`, `mysql_list_tables`)
//! - `explain`: Show a query execution plan (`mysql_explain`)
//! - `format`: Response envelope shared by all tools

pub mod explain;
pub mod format;
pub mod query;
pub mod schema;

pub use explain::{ExplainInput, ExplainOutput, ExplainToolHandler};
pub use query::{ExecuteOutput, QueryInput, QueryOutcome, QueryOutput, QueryToolHandler};
pub use schema::{
    DescribeTableInput, DescribeTableOutput, ListTablesInput, ListTablesOutput, SchemaToolHandler,
};
