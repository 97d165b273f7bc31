//! Statement execution.
//!
//! [`SqlBackend`] is the seam between tool handlers and the database. Handlers
//! only ever see statements that already passed the policy enforcer; the backend
//! runs them with positional parameters, a per-statement timeout and a row cap.
//!
//! [`MySqlBackend`] is the production implementation over a `sqlx` pool:
//! - Prepared statements only (`?` placeholders bound in order), never the
//!   multi-statement text protocol
//! - Row caps enforced while streaming, so only `limit + 1` rows are fetched
//! - Timeouts reported as retryable errors

use crate::db::types::RowToJson;
use crate::error::{DbError, DbResult};
use crate::models::{ExecuteResult, QueryRequest, QueryResult};
use futures_util::StreamExt;
use sqlx::MySqlPool;
use sqlx::mysql::MySqlArguments;
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{debug, warn};

/// Executes policy-checked statements.
pub trait SqlBackend: Send + Sync + 'static {
    /// Run a row-returning statement and collect up to `request.limit` rows.
    fn fetch(&self, request: &QueryRequest) -> impl Future<Output = DbResult<QueryResult>> + Send;

    /// Run a statement that returns no rows.
    fn execute(
        &self,
        request: &QueryRequest,
    ) -> impl Future<Output = DbResult<ExecuteResult>> + Send;

    /// Release all connections. Further calls fail with a connection error.
    fn close(&self) -> impl Future<Output = ()> + Send;
}

/// `SqlBackend` over a MySQL connection pool.
#[derive(Debug, Clone)]
pub struct MySqlBackend {
    pool: MySqlPool,
    query_timeout: Duration,
}

impl MySqlBackend {
    pub fn new(pool: MySqlPool, query_timeout: Duration) -> Self {
        Self {
            pool,
            query_timeout,
        }
    }

    /// Get the underlying pool.
    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }

    /// Build a prepared statement, even when there is nothing to bind.
    ///
    /// The binary protocol accepts exactly one statement, so a `;`-stacked batch
    /// is refused by the server instead of running every part.
    fn build_query<'q>(
        sql: &'q str,
        params: &'q [String],
    ) -> sqlx::query::Query<'q, sqlx::MySql, MySqlArguments> {
        params
            .iter()
            .fold(sqlx::query(sql), |query, param| query.bind(param.as_str()))
    }
}

impl SqlBackend for MySqlBackend {
    async fn fetch(&self, request: &QueryRequest) -> DbResult<QueryResult> {
        let start = Instant::now();
        let fetch_limit = request
            .limit
            .map(|l| l as usize + 1)
            .unwrap_or(usize::MAX);

        debug!(
            params = request.params.len(),
            limit = ?request.limit,
            timeout_secs = self.query_timeout.as_secs(),
            "Fetching rows"
        );

        let rows_future = Self::build_query(&request.sql, &request.params)
            .fetch(&self.pool)
            .take(fetch_limit)
            .collect::<Vec<_>>();

        let rows = match timeout(self.query_timeout, rows_future).await {
            Ok(results) => collect_rows(results)?,
            Err(_) => return Err(timeout_error("query execution", self.query_timeout)),
        };

        Ok(process_rows(rows, request.limit, start))
    }

    async fn execute(&self, request: &QueryRequest) -> DbResult<ExecuteResult> {
        let start = Instant::now();

        debug!(
            params = request.params.len(),
            timeout_secs = self.query_timeout.as_secs(),
            "Executing statement"
        );

        let query = Self::build_query(&request.sql, &request.params);
        let result = timeout(self.query_timeout, query.execute(&self.pool)).await;

        match result {
            Ok(Ok(r)) => Ok(ExecuteResult {
                rows_affected: r.rows_affected(),
                last_insert_id: r.last_insert_id(),
                execution_time_ms: start.elapsed().as_millis() as u64,
            }),
            Ok(Err(e)) => Err(DbError::from(e)),
            Err(_) => Err(timeout_error("statement execution", self.query_timeout)),
        }
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

/// Convert fetched rows into a `QueryResult`, trimming to the row cap.
///
/// The caller fetches one row past the cap so truncation can be detected.
fn process_rows<R: RowToJson>(rows: Vec<R>, limit: Option<u32>, start: Instant) -> QueryResult {
    let execution_time_ms = start.elapsed().as_millis() as u64;

    let Some(first) = rows.first() else {
        return QueryResult::empty(execution_time_ms);
    };

    let columns = first.column_metadata();
    let total_rows = rows.len();
    let cap = limit.map(|l| l as usize).unwrap_or(total_rows);
    let truncated = total_rows > cap;

    if truncated {
        warn!(limit = cap, "Query result truncated to row cap");
    }

    QueryResult {
        columns,
        rows: rows.iter().take(cap).map(RowToJson::to_json_map).collect(),
        truncated,
        execution_time_ms,
    }
}

fn collect_rows<R>(results: Vec<Result<R, sqlx::Error>>) -> DbResult<Vec<R>> {
    results
        .into_iter()
        .map(|r| r.map_err(DbError::from))
        .collect()
}

fn timeout_error(operation: &str, timeout: Duration) -> DbError {
    DbError::timeout(operation, timeout.as_secs())
}
