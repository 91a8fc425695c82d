//! In-memory [`QueryService`] that replays a script.
//!
//! Status polls walk through the scripted reports in order and keep
//! repeating the last one. Every call is recorded, including the tokio
//! instant of each status poll, so callers can assert on pacing.

use std::collections::VecDeque;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::Instant;

use super::types::{ExecutionHandle, ExecutionState, QueryRequest, RawRows, StatusReport};
use super::{QueryService, TransportError};

#[derive(Default)]
struct Script {
    statuses: VecDeque<StatusReport>,
    last_status: Option<StatusReport>,
    results: RawRows,
    submit_error: Option<TransportError>,
    status_error: Option<TransportError>,
    fetch_error: Option<TransportError>,
}

#[derive(Default)]
struct Calls {
    submitted: Vec<QueryRequest>,
    status_at: Vec<Instant>,
    fetches: usize,
    stops: usize,
}

/// Scripted query service
#[derive(Default)]
pub struct ScriptedQueryService {
    script: Mutex<Script>,
    calls: Mutex<Calls>,
}

impl ScriptedQueryService {
    pub fn new() -> Self {
        ScriptedQueryService::default()
    }

    /// Reports returned by successive status polls
    pub fn with_statuses(self, statuses: Vec<StatusReport>) -> Self {
        self.script.lock().statuses = statuses.into();
        self
    }

    /// Grid returned by the results fetch, header row first
    pub fn with_results(self, results: RawRows) -> Self {
        self.script.lock().results = results;
        self
    }

    /// Convenience for all-present string cells
    pub fn with_text_results(self, rows: &[&[&str]]) -> Self {
        let raw = rows
            .iter()
            .map(|row| row.iter().map(|cell| Some((*cell).to_string())).collect())
            .collect();
        self.with_results(raw)
    }

    pub fn fail_submit(self, error: TransportError) -> Self {
        self.script.lock().submit_error = Some(error);
        self
    }

    pub fn fail_status(self, error: TransportError) -> Self {
        self.script.lock().status_error = Some(error);
        self
    }

    pub fn fail_fetch(self, error: TransportError) -> Self {
        self.script.lock().fetch_error = Some(error);
        self
    }

    /// Requests received by `submit_query`
    pub fn submitted(&self) -> Vec<QueryRequest> {
        self.calls.lock().submitted.clone()
    }

    pub fn status_calls(&self) -> usize {
        self.calls.lock().status_at.len()
    }

    /// When each status poll happened
    pub fn status_instants(&self) -> Vec<Instant> {
        self.calls.lock().status_at.clone()
    }

    pub fn fetch_calls(&self) -> usize {
        self.calls.lock().fetches
    }

    pub fn stop_calls(&self) -> usize {
        self.calls.lock().stops
    }
}

#[async_trait]
impl QueryService for ScriptedQueryService {
    async fn submit_query(&self, request: &QueryRequest) -> Result<ExecutionHandle, TransportError> {
        if let Some(error) = self.script.lock().submit_error.clone() {
            return Err(error);
        }
        let mut calls = self.calls.lock();
        calls.submitted.push(request.clone());
        Ok(ExecutionHandle::new(format!("scripted-{}", calls.submitted.len())))
    }

    async fn query_status(&self, _handle: &ExecutionHandle) -> Result<StatusReport, TransportError> {
        self.calls.lock().status_at.push(Instant::now());

        let mut script = self.script.lock();
        if let Some(error) = script.status_error.clone() {
            return Err(error);
        }
        let report = match script.statuses.pop_front() {
            Some(report) => report,
            None => script
                .last_status
                .clone()
                .unwrap_or_else(|| StatusReport::new(ExecutionState::Succeeded)),
        };
        script.last_status = Some(report.clone());
        Ok(report)
    }

    async fn fetch_results(&self, _handle: &ExecutionHandle) -> Result<RawRows, TransportError> {
        self.calls.lock().fetches += 1;
        let script = self.script.lock();
        if let Some(error) = script.fetch_error.clone() {
            return Err(error);
        }
        Ok(script.results.clone())
    }

    async fn stop_query(&self, _handle: &ExecutionHandle) -> Result<(), TransportError> {
        self.calls.lock().stops += 1;
        Ok(())
    }
}
