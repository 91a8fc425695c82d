//! Athena backend for the query client.

use async_trait::async_trait;
use aws_sdk_athena::error::DisplayErrorContext;
use aws_sdk_athena::types::{QueryExecutionContext, QueryExecutionState, ResultConfiguration};
use aws_sdk_athena::Client;
use tracing::debug;

use super::types::{ExecutionHandle, ExecutionState, QueryRequest, RawRows, StatusReport};
use super::{QueryService, TransportError};

/// [`QueryService`] over the Athena API
#[derive(Clone)]
pub struct AthenaQueryService {
    client: Client,
}

impl AthenaQueryService {
    pub fn new(client: Client) -> Self {
        AthenaQueryService { client }
    }

    /// Build a client for `region` from the default credential chain
    pub async fn from_region(region: &str) -> Self {
        let sdk_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(region.to_string()))
            .load()
            .await;
        AthenaQueryService::new(Client::new(&sdk_config))
    }
}

fn service_error(operation: &'static str, error: impl std::error::Error) -> TransportError {
    TransportError::Service {
        operation,
        message: DisplayErrorContext(error).to_string(),
    }
}

fn map_state(state: &QueryExecutionState) -> ExecutionState {
    match state {
        QueryExecutionState::Queued => ExecutionState::Queued,
        QueryExecutionState::Running => ExecutionState::Running,
        QueryExecutionState::Succeeded => ExecutionState::Succeeded,
        QueryExecutionState::Failed => ExecutionState::Failed,
        QueryExecutionState::Cancelled => ExecutionState::Cancelled,
        // States added to the API later are treated as still in progress
        _ => ExecutionState::Running,
    }
}

#[async_trait]
impl QueryService for AthenaQueryService {
    async fn submit_query(&self, request: &QueryRequest) -> Result<ExecutionHandle, TransportError> {
        const OP: &str = "StartQueryExecution";
        let output = self
            .client
            .start_query_execution()
            .query_string(&request.query_text)
            .query_execution_context(
                QueryExecutionContext::builder()
                    .database(&request.target.database)
                    .build(),
            )
            .work_group(&request.target.workgroup)
            .result_configuration(
                ResultConfiguration::builder()
                    .output_location(&request.target.output_location)
                    .build(),
            )
            .send()
            .await
            .map_err(|e| service_error(OP, e))?;

        output
            .query_execution_id()
            .map(ExecutionHandle::new)
            .ok_or(TransportError::MissingField {
                operation: OP,
                field: "QueryExecutionId",
            })
    }

    async fn query_status(&self, handle: &ExecutionHandle) -> Result<StatusReport, TransportError> {
        const OP: &str = "GetQueryExecution";
        let output = self
            .client
            .get_query_execution()
            .query_execution_id(handle.as_str())
            .send()
            .await
            .map_err(|e| service_error(OP, e))?;

        let status = output
            .query_execution()
            .and_then(|execution| execution.status())
            .ok_or(TransportError::MissingField {
                operation: OP,
                field: "Status",
            })?;
        let state = status.state().ok_or(TransportError::MissingField {
            operation: OP,
            field: "State",
        })?;

        Ok(StatusReport {
            state: map_state(state),
            reason: status.state_change_reason().map(str::to_string),
        })
    }

    async fn fetch_results(&self, handle: &ExecutionHandle) -> Result<RawRows, TransportError> {
        const OP: &str = "GetQueryResults";
        let mut rows = RawRows::new();
        let mut next_token: Option<String> = None;

        loop {
            let output = self
                .client
                .get_query_results()
                .query_execution_id(handle.as_str())
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(|e| service_error(OP, e))?;

            if let Some(result_set) = output.result_set() {
                rows.extend(result_set.rows().iter().map(|row| {
                    row.data()
                        .iter()
                        .map(|datum| datum.var_char_value().map(str::to_string))
                        .collect::<Vec<_>>()
                }));
            }

            match output.next_token() {
                Some(token) => {
                    debug!(execution_id = %handle, fetched = rows.len(), "query_results_next_page");
                    next_token = Some(token.to_string());
                }
                None => break,
            }
        }

        Ok(rows)
    }

    async fn stop_query(&self, handle: &ExecutionHandle) -> Result<(), TransportError> {
        self.client
            .stop_query_execution()
            .query_execution_id(handle.as_str())
            .send()
            .await
            .map_err(|e| service_error("StopQueryExecution", e))?;
        Ok(())
    }
}
