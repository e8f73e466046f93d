use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::store::StoreError;
use crate::utils::response::error as error_response;

#[derive(Debug, Error)]
pub enum AppError {
    /// A single validation failure, e.g. a malformed path parameter.
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Field-level validation failures, collected exhaustively so the client
    /// can show every problem at once.
    #[error("Validation failed")]
    Validation(Vec<String>),

    #[error("Authentication error: {0}")]
    AuthError(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Database error")]
    DatabaseError(String),

    #[error("Internal server error")]
    InternalServerError(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::AuthError(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) | AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::AuthError(_) => "AUTH_ERROR",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::DatabaseError(_) => "DATABASE_ERROR",
            AppError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
        }
    }

    fn log(&self) {
        match self {
            AppError::ValidationError(msg)
            | AppError::AuthError(msg)
            | AppError::Forbidden(msg)
            | AppError::NotFound(msg)
            | AppError::InternalServerError(msg) => {
                error!(error = ?self, message = %msg, "Application error");
            }
            AppError::Validation(messages) => {
                error!(errors = ?messages, "Validation failed");
            }
            AppError::DatabaseError(detail) => {
                error!(error = %detail, "Database error");
            }
        }
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::EventNotFound => AppError::NotFound("Event not found".to_string()),
            StoreError::VolunteerNotFound => {
                AppError::NotFound("Volunteer not found".to_string())
            }
            StoreError::MatchNotFound => AppError::NotFound("Match not found".to_string()),
            StoreError::NotificationNotFound => {
                AppError::NotFound("Notification not found".to_string())
            }
            StoreError::LocationNotResolved => AppError::ValidationError(
                "No matching location found for the provided venue".to_string(),
            ),
            StoreError::DuplicateMatch => AppError::ValidationError(
                "Volunteer is already matched to this event".to_string(),
            ),
            StoreError::EventFull => AppError::ValidationError(
                "Event has reached its volunteer capacity".to_string(),
            ),
            StoreError::Backend(detail) => AppError::DatabaseError(detail),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();

        // Log internal details
        self.log();

        // Only expose high-level messages to the client
        let (public_message, details) = match &self {
            AppError::ValidationError(msg)
            | AppError::AuthError(msg)
            | AppError::Forbidden(msg)
            | AppError::NotFound(msg)
            | AppError::InternalServerError(msg) => (msg.clone(), None),
            AppError::Validation(messages) => {
                ("Validation failed".to_string(), Some(json!(messages)))
            }
            AppError::DatabaseError(_) => ("A database error occurred".to_string(), None),
        };

        error_response(code, public_message, details, status)
    }
}
