use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;

use crate::repository::RepoError;

/// HTTP-facing error types
#[derive(Debug)]
pub enum AppError {
    /// Malformed request parameter or body
    InvalidInput(String),
    /// Requested record does not exist
    NotFound(String),
    /// Relational store failure
    StoreFailure(String),
    /// Request cancelled before the store answered
    Cancelled(String),
    /// Request ran past its deadline
    Timeout(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            Self::NotFound(msg) => write!(f, "Not found: {}", msg),
            Self::StoreFailure(msg) => write!(f, "Store failure: {}", msg),
            Self::Cancelled(msg) => write!(f, "Cancelled: {}", msg),
            Self::Timeout(msg) => write!(f, "Timeout: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::StoreFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Cancelled(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            Self::InvalidInput(msg)
            | Self::NotFound(msg)
            | Self::StoreFailure(msg)
            | Self::Cancelled(msg)
            | Self::Timeout(msg) => msg.clone(),
        };

        let body = Json(json!({
            "error": {
                "message": message,
                "type": error_type_name(&self),
            }
        }));

        (status, body).into_response()
    }
}

fn error_type_name(error: &AppError) -> &'static str {
    match error {
        AppError::InvalidInput(_) => "invalid_input",
        AppError::NotFound(_) => "not_found",
        AppError::StoreFailure(_) => "store_failure",
        AppError::Cancelled(_) => "cancelled",
        AppError::Timeout(_) => "timeout",
    }
}

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound { .. } => Self::NotFound("log entry not found".to_string()),
            RepoError::StoreFailure { .. } => {
                tracing::error!(error = %err, "Repository store failure");
                Self::StoreFailure("failed to access log entries".to_string())
            }
            RepoError::Cancelled { .. } => Self::Cancelled(err.to_string()),
            RepoError::DeadlineExceeded { .. } => Self::Timeout(err.to_string()),
        }
    }
}
