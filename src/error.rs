use axum::{
    Json,
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Result alias returned by every handler.
pub type ApiResult<T> = Result<T, ApiError>;

/// ApiError
///
/// The single error type crossing the handler boundary. Every variant renders as
/// `{"error": "<message>"}` with the matching status code. Server-side failures are
/// logged here and replaced by a generic message so driver details never leak.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or malformed input (400).
    #[error("{0}")]
    Validation(String),

    /// No usable credentials (401).
    #[error("{0}")]
    Unauthorized(String),

    /// Authenticated but not allowed (403).
    #[error("{0}")]
    Forbidden(String),

    /// Absent, or hidden from the caller (404).
    #[error("{0}")]
    NotFound(String),

    /// Uniqueness clash such as a duplicate email (409).
    #[error("{0}")]
    Conflict(String),

    /// Any other database failure (500).
    #[error("database error: {0}")]
    Persistence(#[source] sqlx::Error),

    /// Upload could not be written (500).
    #[error("storage error: {0}")]
    Storage(String),

    /// Anything else that is our fault (500).
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Persistence(_) | ApiError::Storage(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message shown to the client.
    fn public_message(&self) -> String {
        match self {
            ApiError::Persistence(_) | ApiError::Internal(_) => {
                "Internal server error".to_string()
            }
            ApiError::Storage(_) => "Could not store the uploaded file".to_string(),
            other => other.to_string(),
        }
    }
}

/// Constraint violations are the client's problem; everything else is ours.
impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                return ApiError::Conflict("Resource already exists".to_string());
            }
            if db_err.is_foreign_key_violation() {
                return ApiError::Validation("Referenced record does not exist".to_string());
            }
        }
        ApiError::Persistence(err)
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

/// Unparseable or mistyped bodies are reported like any other bad input.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(format!("Invalid request body: {}", rejection.body_text()))
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(rejection: MultipartRejection) -> Self {
        ApiError::Validation(format!("Invalid upload: {}", rejection.body_text()))
    }
}

/// Includes bodies cut off by the request size limit.
impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        ApiError::Validation(format!("Invalid upload: {}", err.body_text()))
    }
}

impl From<PathRejection> for ApiError {
    fn from(_: PathRejection) -> Self {
        ApiError::NotFound("Not found".to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        (status, Json(json!({ "error": self.public_message() }))).into_response()
    }
}
