use std::sync::Arc;

use tracing::{debug, info, warn};

use super::timeout::{BudgetExceeded, CancelHandle, PollBudget, PollPolicy};
use super::types::{
    normalize_rows, ExecutionHandle, ExecutionState, QueryOptions, QueryRequest, QueryTarget,
    ResultRow,
};
use super::{QueryError, QueryResult, QueryService};
use crate::config::Config;

/// Submit → poll → fetch driver over a [`QueryService`].
///
/// Holds two default namespaces: the general one used by [`run_query`] and
/// the SAP reporting one used by [`run_sap_query`].
///
/// [`run_query`]: QueryClient::run_query
/// [`run_sap_query`]: QueryClient::run_sap_query
#[derive(Clone)]
pub struct QueryClient {
    service: Arc<dyn QueryService>,
    defaults: QueryTarget,
    sap: QueryTarget,
    policy: PollPolicy,
}

impl QueryClient {
    pub fn new(service: Arc<dyn QueryService>, defaults: QueryTarget, sap: QueryTarget) -> Self {
        QueryClient {
            service,
            defaults,
            sap,
            policy: PollPolicy::default(),
        }
    }

    /// Namespaces and poll policy taken from `[athena]` and `[sap]`
    pub fn from_config(service: Arc<dyn QueryService>, config: &Config) -> Self {
        QueryClient::new(service, config.athena.target(), config.sap.target())
            .with_poll_policy(config.athena.poll_policy())
    }

    pub fn with_poll_policy(mut self, policy: PollPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn poll_policy(&self) -> PollPolicy {
        self.policy
    }

    /// Run a query in the default namespace and return its rows.
    pub async fn run_query(
        &self,
        query_text: &str,
        options: &QueryOptions,
    ) -> QueryResult<Vec<ResultRow>> {
        self.execute(query_text, options, &self.defaults, CancelHandle::new())
            .await
    }

    /// Same as [`run_query`](Self::run_query), stoppable through `cancel`.
    pub async fn run_query_with_cancel(
        &self,
        query_text: &str,
        options: &QueryOptions,
        cancel: &CancelHandle,
    ) -> QueryResult<Vec<ResultRow>> {
        self.execute(query_text, options, &self.defaults, cancel.clone())
            .await
    }

    /// Run a query in the SAP reporting namespace.
    pub async fn run_sap_query(
        &self,
        query_text: &str,
        options: &QueryOptions,
    ) -> QueryResult<Vec<ResultRow>> {
        self.execute(query_text, options, &self.sap, CancelHandle::new())
            .await
    }

    async fn execute(
        &self,
        query_text: &str,
        options: &QueryOptions,
        defaults: &QueryTarget,
        cancel: CancelHandle,
    ) -> QueryResult<Vec<ResultRow>> {
        if query_text.trim().is_empty() {
            return Err(QueryError::EmptyQuery);
        }

        let request = QueryRequest {
            query_text: query_text.to_string(),
            target: options.resolve(defaults),
        };
        let handle = self.service.submit_query(&request).await?;
        info!(
            execution_id = %handle,
            database = %request.target.database,
            workgroup = %request.target.workgroup,
            "query_submitted"
        );

        self.wait_for_success(&handle, cancel).await?;

        let raw = self.service.fetch_results(&handle).await?;
        let rows = normalize_rows(raw);
        info!(execution_id = %handle, rows = rows.len(), "query_results_fetched");
        Ok(rows)
    }

    async fn wait_for_success(
        &self,
        handle: &ExecutionHandle,
        cancel: CancelHandle,
    ) -> QueryResult<()> {
        let mut budget = PollBudget::new(self.policy, cancel);
        loop {
            if let Err(exceeded) = budget.begin_attempt() {
                self.stop_quietly(handle).await;
                let execution_id = handle.to_string();
                return Err(match exceeded {
                    BudgetExceeded::Exhausted { attempts, elapsed } => {
                        warn!(execution_id = %handle, attempts, ?elapsed, "query_poll_timeout");
                        QueryError::TimedOut {
                            execution_id,
                            attempts,
                            elapsed,
                        }
                    }
                    BudgetExceeded::Cancelled => {
                        info!(execution_id = %handle, "query_cancelled_by_caller");
                        QueryError::Cancelled { execution_id }
                    }
                });
            }

            let report = self.service.query_status(handle).await?;
            match report.state {
                ExecutionState::Succeeded => {
                    debug!(execution_id = %handle, attempts = budget.attempts(), "query_succeeded");
                    return Ok(());
                }
                ExecutionState::Failed | ExecutionState::Cancelled => {
                    let reason = report.reason.unwrap_or_default();
                    warn!(execution_id = %handle, state = %report.state, reason = %reason, "query_failed");
                    return Err(QueryError::ExecutionFailed {
                        state: report.state,
                        reason,
                    });
                }
                ExecutionState::Queued | ExecutionState::Running => {
                    debug!(execution_id = %handle, state = %report.state, "query_pending");
                    tokio::time::sleep(budget.interval()).await;
                }
            }
        }
    }

    async fn stop_quietly(&self, handle: &ExecutionHandle) {
        if let Err(e) = self.service.stop_query(handle).await {
            warn!(execution_id = %handle, error = %e, "query_stop_failed");
        }
    }
}
