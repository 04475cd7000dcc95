//! Error taxonomy for folkmart-api
//!
//! Every variant maps to one HTTP status and a `{ success: false, message,
//! error }` body. Storage failures are logged and collapsed to a generic
//! internal error so SQL and file details never reach the caller.

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::models::UnknownVariant;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Referenced entity absent (404)
    #[error("{0}")]
    NotFound(String),

    /// Missing or invalid credentials (401)
    #[error("{0}")]
    Unauthorized(String),

    /// Caller lacks permission for this record (403)
    #[error("{0}")]
    Forbidden(String),

    /// Malformed input, e.g. out-of-range score (400)
    #[error("{0}")]
    InvalidArgument(String),

    /// Operation not valid for the record's current state (400)
    #[error("{0}")]
    InvalidState(String),

    /// Scheduling overlap or duplicate resource (400)
    #[error("{0}")]
    Conflict(String),

    /// Unexpected failure (500)
    #[error("Internal error: {0}")]
    Internal(String),

    /// Storage / configuration error from folkmart-common (500)
    #[error("Common error: {0}")]
    Common(#[from] folkmart_common::Error),
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        ApiError::Common(folkmart_common::Error::Database(err))
    }
}

impl From<UnknownVariant> for ApiError {
    fn from(err: UnknownVariant) -> Self {
        ApiError::InvalidArgument(err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::InvalidArgument(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::InvalidArgument(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::InvalidArgument(rejection.body_text())
    }
}

impl ApiError {
    /// Stable machine-readable kind
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::InvalidArgument(_) => "INVALID_ARGUMENT",
            ApiError::InvalidState(_) => "INVALID_STATE",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::Internal(_) | ApiError::Common(_) => "INTERNAL",
        }
    }

    /// HTTP status for this kind
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::InvalidArgument(_) | ApiError::InvalidState(_) | ApiError::Conflict(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Internal(_) | ApiError::Common(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// True when a retry may succeed (SQLite lock contention)
    pub fn is_database_locked(&self) -> bool {
        matches!(self, ApiError::Common(err) if err.is_database_locked())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();

        let message = match &self {
            ApiError::Internal(_) | ApiError::Common(_) => {
                error!(error = %self, "Request failed with internal error");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        let body = Json(json!({
            "success": false,
            "message": message,
            "error": code,
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers and the booking workflow
pub type ApiResult<T> = Result<T, ApiError>;
