//! Query Execution Module
//!
//! Runs SQL against an asynchronous query service (Athena) and returns
//! normalized rows:
//! - Submission with per-call namespace overrides
//! - Status polling on a fixed interval, bounded by a [`PollPolicy`]
//! - Cooperative cancellation via [`CancelHandle`]
//! - One results fetch, header row turned into column keys

mod athena;
mod client;
pub mod scripted;
mod timeout;
mod types;

use std::time::Duration;

use async_trait::async_trait;

pub use athena::AthenaQueryService;
pub use client::QueryClient;
pub use scripted::ScriptedQueryService;
pub use timeout::{BudgetExceeded, CancelHandle, PollBudget, PollPolicy};
pub use types::{
    normalize_rows, ExecutionHandle, ExecutionState, QueryOptions, QueryRequest, QueryTarget,
    RawRows, ResultRow, StatusReport,
};

/// Failure talking to the query service itself
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    /// The service call returned an error
    #[error("{operation} failed: {message}")]
    Service {
        operation: &'static str,
        message: String,
    },

    /// The service answered without a field we depend on
    #[error("{operation} response is missing {field}")]
    MissingField {
        operation: &'static str,
        field: &'static str,
    },
}

/// Query execution error types
#[derive(Debug, Clone, thiserror::Error)]
pub enum QueryError {
    /// Blank query text, nothing was submitted
    #[error("Query text is empty")]
    EmptyQuery,

    /// The service reported FAILED or CANCELLED
    #[error("Query {state}: {reason}")]
    ExecutionFailed {
        state: ExecutionState,
        reason: String,
    },

    /// The poll policy ran out before a terminal state was seen
    #[error("Query {execution_id} still not finished after {attempts} polls ({elapsed:?})")]
    TimedOut {
        execution_id: String,
        attempts: u32,
        elapsed: Duration,
    },

    /// The caller cancelled the execution
    #[error("Query {execution_id} cancelled by caller")]
    Cancelled { execution_id: String },

    /// Submission, polling or fetching failed at the transport level
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Result type for query operations
pub type QueryResult<T> = Result<T, QueryError>;

/// The operations the client needs from an asynchronous query service
#[async_trait]
pub trait QueryService: Send + Sync {
    /// Start an execution and return its handle
    async fn submit_query(&self, request: &QueryRequest) -> Result<ExecutionHandle, TransportError>;

    /// Current state of an execution
    async fn query_status(&self, handle: &ExecutionHandle) -> Result<StatusReport, TransportError>;

    /// Full result grid of a succeeded execution, header row first
    async fn fetch_results(&self, handle: &ExecutionHandle) -> Result<RawRows, TransportError>;

    /// Ask the service to stop a running execution
    async fn stop_query(&self, handle: &ExecutionHandle) -> Result<(), TransportError>;
}
