//! API Error Types
//!
//! Defines error types for the API layer and implements conversion
//! to HTTP responses with appropriate status codes.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::panel::PanelError;
use crate::query::ValidationErrors;

/// API error types
#[derive(Error, Debug)]
pub enum ApiError {
    /// Request validation failed
    #[error("Validation error: {0}")]
    Validation(String),

    /// Panel planning or execution failed
    #[error(transparent)]
    Panel(#[from] PanelError),

    /// Panel did not finish within the request timeout
    #[error("Panel query timed out after {0}s")]
    Timeout(u64),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
    pub request_id: String,
}

/// Error details
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    /// Index of the target that failed the panel
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<usize>,
    /// Per-field configuration errors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<ValidationErrors>,
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            ApiError::Panel(e) => match e {
                PanelError::InvalidTimeRange(_) => (StatusCode::BAD_REQUEST, "INVALID_TIME_RANGE"),
                PanelError::InvalidBudget => (StatusCode::BAD_REQUEST, "INVALID_BUDGET"),
                PanelError::InvalidTarget { .. } => (StatusCode::BAD_REQUEST, "INVALID_TARGET"),
                PanelError::Query { .. } => (StatusCode::BAD_REQUEST, "QUERY_ERROR"),
                PanelError::Engine { source, .. } if source.is_unreachable() => {
                    (StatusCode::BAD_GATEWAY, "ENGINE_UNAVAILABLE")
                }
                PanelError::Engine { .. } => (StatusCode::BAD_GATEWAY, "ENGINE_ERROR"),
                PanelError::Shape { .. } => (StatusCode::BAD_GATEWAY, "SHAPE_ERROR"),
            },
            ApiError::Timeout(_) => (StatusCode::GATEWAY_TIMEOUT, "TIMEOUT"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            ApiError::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "IO_ERROR"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let request_id = uuid::Uuid::new_v4().to_string();

        if status.is_server_error() {
            tracing::error!(
                request_id = %request_id,
                error_code = %code,
                error_message = %self,
                "API error occurred"
            );
        } else {
            tracing::warn!(
                request_id = %request_id,
                error_code = %code,
                error_message = %self,
                "Rejected request"
            );
        }

        let (target, fields) = match &self {
            ApiError::Panel(PanelError::InvalidTarget { index, errors }) => {
                (Some(*index), Some(errors.clone()))
            }
            ApiError::Panel(e) => (e.target_index(), None),
            _ => (None, None),
        };

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message: self.to_string(),
                target,
                fields,
            },
            request_id,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type for API operations
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineError;

    #[test]
    fn test_status_mapping() {
        let err = ApiError::from(PanelError::InvalidBudget);
        assert_eq!(err.status_and_code().0, StatusCode::BAD_REQUEST);

        let err = ApiError::from(PanelError::Engine {
            index: 0,
            source: EngineError::Timeout,
        });
        assert_eq!(
            err.status_and_code(),
            (StatusCode::BAD_GATEWAY, "ENGINE_UNAVAILABLE")
        );

        let err = ApiError::from(PanelError::Engine {
            index: 0,
            source: EngineError::Api {
                status: 500,
                message: "boom".to_string(),
            },
        });
        assert_eq!(err.status_and_code(), (StatusCode::BAD_GATEWAY, "ENGINE_ERROR"));

        assert_eq!(ApiError::Timeout(5).status_and_code().0, StatusCode::GATEWAY_TIMEOUT);
    }
}
