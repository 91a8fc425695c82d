//! REST API Data Transfer Objects
//!
//! Request/response types that are not domain types themselves. Reference
//! lists and tasks are served as bare JSON arrays/objects, the shape the
//! dashboard reads.

use serde::{Deserialize, Serialize};

/// JSON response: { success, data? }
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
        }
    }
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthDto {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
}

/// Query string of `GET /sap/sids`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SidListQuery {
    #[serde(default)]
    pub client_name: Option<String>,
}

/// Query string of `GET /api/agenda/tasks`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskListQuery {
    #[serde(default)]
    pub year_month: Option<String>,
    #[serde(default)]
    pub nome_cliente: Option<String>,
}
