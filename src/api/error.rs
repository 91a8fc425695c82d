//! REST API Error Types
//!
//! Provides error types and conversions for the REST API.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::agenda::TaskError;
use crate::query::QueryError;

/// API error response
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// REST API error that can be returned from handlers
#[derive(Debug)]
pub struct RestError {
    pub status: StatusCode,
    pub error: ApiError,
}

impl RestError {
    pub fn new(status: StatusCode, code: &str, message: impl Into<String>) -> Self {
        Self {
            status,
            error: ApiError::new(code, message),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "NOT_FOUND", message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "BAD_REQUEST", message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", message)
    }
}

impl IntoResponse for RestError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({
            "success": false,
            "error": self.error
        }));
        (self.status, body).into_response()
    }
}

// Conversions from domain errors
impl From<QueryError> for RestError {
    fn from(err: QueryError) -> Self {
        let message = err.to_string();
        match err {
            QueryError::EmptyQuery => RestError::bad_request(message),
            // The raw service reason is what the dashboard shows
            QueryError::ExecutionFailed { reason, .. } => {
                RestError::new(StatusCode::BAD_GATEWAY, "QUERY_FAILED", reason)
            }
            QueryError::TimedOut { .. } => {
                RestError::new(StatusCode::GATEWAY_TIMEOUT, "QUERY_TIMEOUT", message)
            }
            QueryError::Cancelled { .. } => {
                RestError::new(StatusCode::SERVICE_UNAVAILABLE, "QUERY_CANCELLED", message)
            }
            QueryError::Transport(_) => {
                RestError::new(StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR", message)
            }
        }
    }
}

impl From<TaskError> for RestError {
    fn from(err: TaskError) -> Self {
        let message = err.to_string();
        match err {
            TaskError::NotFound(_) => RestError::not_found(message),
            TaskError::Invalid(_) => RestError::bad_request(message),
            TaskError::Backend(_) => RestError::internal(message),
        }
    }
}
