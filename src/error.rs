// src/error.rs

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// Global Application Error Enum.
/// Centralizes error handling for the store, the LLM collaborators and the quiz
/// state machine, and maps each failure to an HTTP response.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// An LLM collaborator call failed or returned unparseable output.
    #[error("Generation failed: {0}")]
    GenerationFailed(String),

    /// The bank holds fewer questions for a topic than were requested.
    #[error("Only {available} questions available for '{topic}', {requested} requested")]
    InsufficientBank {
        topic: String,
        requested: usize,
        available: usize,
    },

    #[error("Not found: {0}")]
    NotFound(String),

    /// Structured data did not match the expected shape.
    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    /// The quiz state machine refused a transition.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Schema migration failed while opening the store. Fatal at start-up.
    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Internal error: {0}")]
    InternalServerError(String),
}

impl AppError {
    /// Whether the caller may simply retry the same operation.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::GenerationFailed(_))
    }
}

/// Implements `IntoResponse` for `AppError`.
/// Converts the error into a JSON response with appropriate HTTP status code.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::GenerationFailed(msg) => {
                tracing::warn!("Collaborator call failed: {}", msg);
                StatusCode::BAD_GATEWAY
            }
            AppError::InsufficientBank { .. } | AppError::InvalidState(_) => StatusCode::CONFLICT,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::ValidationFailed(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Migration(msg) | AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let error_message = match self {
            AppError::Migration(_) | AppError::InternalServerError(_) => {
                "Internal Server Error".to_string()
            }
            other => other.to_string(),
        };
        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// Converts `sqlx::Error` into `AppError::InternalServerError`.
/// Allows using `?` operator on database queries.
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => AppError::NotFound("Record not found".to_string()),
            other => AppError::InternalServerError(other.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for AppError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        AppError::Migration(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::ValidationFailed(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::ValidationFailed(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_taxonomy_to_status_codes() {
        let cases = [
            (AppError::GenerationFailed("x".into()), StatusCode::BAD_GATEWAY),
            (
                AppError::InsufficientBank {
                    topic: "SOP Logistik".into(),
                    requested: 5,
                    available: 2,
                },
                StatusCode::CONFLICT,
            ),
            (AppError::NotFound("q".into()), StatusCode::NOT_FOUND),
            (
                AppError::ValidationFailed("bad".into()),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                AppError::Migration("boom".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }

    #[test]
    fn only_generation_failures_are_retryable() {
        assert!(AppError::GenerationFailed("timeout".into()).is_retryable());
        assert!(!AppError::NotFound("q".into()).is_retryable());
    }
}
