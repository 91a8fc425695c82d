//! Query request, status and result types.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// One normalized result row: column name → cell text, in header order.
pub type ResultRow = IndexMap<String, String>;

/// Raw result grid as returned by the service, header row first.
/// `None` marks a cell the service reported without a value.
pub type RawRows = Vec<Vec<Option<String>>>;

/// Database / workgroup / output location triple a query runs against
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryTarget {
    pub database: String,
    pub workgroup: String,
    pub output_location: String,
}

/// Per-call overrides; unset fields fall back to the client's target
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryOptions {
    pub database: Option<String>,
    pub workgroup: Option<String>,
    pub output_location: Option<String>,
}

impl QueryOptions {
    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    pub fn workgroup(mut self, workgroup: impl Into<String>) -> Self {
        self.workgroup = Some(workgroup.into());
        self
    }

    pub fn output_location(mut self, output_location: impl Into<String>) -> Self {
        self.output_location = Some(output_location.into());
        self
    }

    /// Resolve against a default target. Explicit options win.
    pub fn resolve(&self, defaults: &QueryTarget) -> QueryTarget {
        QueryTarget {
            database: self
                .database
                .clone()
                .unwrap_or_else(|| defaults.database.clone()),
            workgroup: self
                .workgroup
                .clone()
                .unwrap_or_else(|| defaults.workgroup.clone()),
            output_location: self
                .output_location
                .clone()
                .unwrap_or_else(|| defaults.output_location.clone()),
        }
    }
}

/// A fully resolved submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRequest {
    pub query_text: String,
    pub target: QueryTarget,
}

/// Opaque execution id handed out by the query service
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExecutionHandle(String);

impl ExecutionHandle {
    pub fn new(id: impl Into<String>) -> Self {
        ExecutionHandle(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExecutionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Execution state as reported by the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ExecutionState {
    Queued,
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

impl ExecutionState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ExecutionState::Succeeded | ExecutionState::Failed | ExecutionState::Cancelled
        )
    }
}

impl fmt::Display for ExecutionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExecutionState::Queued => "QUEUED",
            ExecutionState::Running => "RUNNING",
            ExecutionState::Succeeded => "SUCCEEDED",
            ExecutionState::Failed => "FAILED",
            ExecutionState::Cancelled => "CANCELLED",
        };
        f.write_str(name)
    }
}

/// Result of one status poll
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    pub state: ExecutionState,
    /// Service-provided state change reason, usually only set on failure
    pub reason: Option<String>,
}

impl StatusReport {
    pub fn new(state: ExecutionState) -> Self {
        StatusReport {
            state,
            reason: None,
        }
    }

    pub fn with_reason(state: ExecutionState, reason: impl Into<String>) -> Self {
        StatusReport {
            state,
            reason: Some(reason.into()),
        }
    }
}

/// Turn a raw grid into row objects.
///
/// The first row supplies the keys and is not emitted. Missing cells become
/// empty strings; cells past the last header are dropped.
pub fn normalize_rows(raw: RawRows) -> Vec<ResultRow> {
    let mut rows = raw.into_iter();
    let Some(header) = rows.next() else {
        return Vec::new();
    };
    let columns: Vec<String> = header.into_iter().map(Option::unwrap_or_default).collect();

    rows.map(|cells| {
        let mut cells = cells.into_iter();
        columns
            .iter()
            .map(|column| {
                let value = cells.next().flatten().unwrap_or_default();
                (column.clone(), value)
            })
            .collect()
    })
    .collect()
}
