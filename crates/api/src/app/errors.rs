use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

use catalog_core::DomainError;
use catalog_infra::StoreError;

pub type ApiResult<T> = Result<T, ApiError>;

/// Failure returned by a handler, rendered as `{ success: false, message, errors? }`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    /// Field-level validation failures.
    #[error("Validation error")]
    Validation(Vec<String>),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    /// Anything unexpected; the detail is logged, never sent to the client.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn invalid_id() -> Self {
        Self::BadRequest("invalid id".to_string())
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) | Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            Self::Validation(errors) => (
                status,
                axum::Json(json!({
                    "success": false,
                    "message": "Validation error",
                    "errors": errors,
                })),
            )
                .into_response(),
            Self::Internal(detail) => {
                tracing::error!(error = %detail, "request failed");
                json_error(status, "Internal server error")
            }
            Self::BadRequest(msg) | Self::NotFound(msg) | Self::Conflict(msg) => {
                json_error(status, msg)
            }
        }
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(messages) => Self::Validation(messages),
            DomainError::InvariantViolation(msg) => Self::BadRequest(msg),
            DomainError::InvalidId(_) => Self::invalid_id(),
            DomainError::NotFound => Self::not_found("Resource not found"),
            DomainError::Conflict(msg) => Self::Conflict(msg),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => Self::not_found("Resource not found"),
            StoreError::Conflict(msg) => Self::Conflict(msg),
            StoreError::InvalidReference(msg) => Self::BadRequest(msg),
            StoreError::Backend(msg) => Self::Internal(msg),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

pub fn json_error(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        axum::Json(json!({
            "success": false,
            "message": message.into(),
        })),
    )
        .into_response()
}
