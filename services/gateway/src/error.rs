use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use types::errors::{PartyError, QueueError, SessionError, StoreError};

/// Central error type for the gateway application
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Internal server error")]
    InternalError(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message, code) = match self {
            AppError::Unauthorized(msg) => (StatusCode::FORBIDDEN, msg, "UNAUTHORIZED"),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, "BAD_REQUEST"),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg, "CONFLICT"),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg, "NOT_FOUND"),
            AppError::ServiceUnavailable(msg) => {
                (StatusCode::SERVICE_UNAVAILABLE, msg, "SERVICE_UNAVAILABLE")
            }
            AppError::InternalError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
                "INTERNAL_ERROR",
            ),
        };

        let body = Json(json!({
            "error": code,
            "message": error_message
        }));

        (status, body).into_response()
    }
}

// Validation errors surface as explicit rejection reasons; the variants
// map onto HTTP statuses here and nowhere else.

impl From<PartyError> for AppError {
    fn from(err: PartyError) -> Self {
        match err {
            PartyError::PartyNotFound { .. } => AppError::NotFound(err.to_string()),
            PartyError::PartyFull { .. } | PartyError::AlreadyMember { .. } => {
                AppError::Conflict(err.to_string())
            }
            PartyError::NotAMember { .. }
            | PartyError::NotLeader { .. }
            | PartyError::Unauthorized { .. } => AppError::Unauthorized(err.to_string()),
        }
    }
}

impl From<QueueError> for AppError {
    fn from(err: QueueError) -> Self {
        match err {
            QueueError::AlreadyQueued { .. } | QueueError::IncompleteSelection { .. } => {
                AppError::Conflict(err.to_string())
            }
            QueueError::PartyNotFound { .. } => AppError::NotFound(err.to_string()),
            QueueError::RatingUnavailable(_) => AppError::ServiceUnavailable(err.to_string()),
        }
    }
}

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::MatchNotFound { .. } => AppError::NotFound(err.to_string()),
            SessionError::NotInSession { .. } => AppError::Unauthorized(err.to_string()),
            SessionError::InvalidTransition { .. } | SessionError::NotEnoughReady => {
                AppError::Conflict(err.to_string())
            }
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::ServiceUnavailable(err.to_string())
    }
}
