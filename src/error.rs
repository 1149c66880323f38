use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use thiserror::Error;
use validator::ValidationErrors;

use crate::{
    dao::storage::StorageError, state::match_progress::ProgressError,
    tournament::fixture::FixtureError,
};

/// Errors that can occur in service layer operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Storage backend is unavailable.
    #[error("storage unavailable")]
    Unavailable(#[source] StorageError),
    /// Application is running in degraded mode without storage.
    #[error("storage unavailable (degraded mode)")]
    Degraded,
    /// No target could be produced for a round; the caller may retry.
    #[error("location unavailable: {0}")]
    LocationUnavailable(String),
    /// The round already has a recorded guess.
    #[error("round {round} was already played")]
    DuplicateGuess { round: u8 },
    /// A round was submitted before the previous one.
    #[error("round {requested} cannot be played before round {expected}")]
    OutOfOrder { requested: u8, expected: u8 },
    /// The roster cannot be scheduled.
    #[error("invalid fixture input: {0}")]
    InvalidFixtureInput(#[from] FixtureError),
    /// Unauthorized access attempt.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    /// Invalid input provided by the client.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Operation cannot be performed in the current state.
    #[error("invalid state: {0}")]
    InvalidState(String),
    /// Requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Rejected { message } => ServiceError::InvalidState(message),
            other => ServiceError::Unavailable(other),
        }
    }
}

impl From<ProgressError> for ServiceError {
    fn from(err: ProgressError) -> Self {
        match err {
            ProgressError::NotAParticipant => {
                ServiceError::Unauthorized("not a participant of this match".into())
            }
            ProgressError::DuplicateGuess { round } => ServiceError::DuplicateGuess { round },
            ProgressError::OutOfOrder {
                requested,
                expected,
            } => ServiceError::OutOfOrder {
                requested,
                expected,
            },
            ProgressError::MatchClosed => ServiceError::InvalidState(err.to_string()),
            ProgressError::RoundOutOfRange { .. } => ServiceError::InvalidInput(err.to_string()),
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(err: ValidationErrors) -> Self {
        AppError::BadRequest(format!("validation failed: {}", err))
    }
}

/// Application-level errors that are converted to HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    /// Bad request with invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),
    /// Unauthorized access attempt.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    /// Requested resource not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// Conflict with current state.
    #[error("conflict: {0}")]
    Conflict(String),
    /// Service unavailable or degraded.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Unavailable(source) => AppError::ServiceUnavailable(source.to_string()),
            ServiceError::Degraded => AppError::ServiceUnavailable("degraded mode".into()),
            ServiceError::LocationUnavailable(message) => AppError::ServiceUnavailable(message),
            err @ (ServiceError::DuplicateGuess { .. } | ServiceError::OutOfOrder { .. }) => {
                AppError::Conflict(err.to_string())
            }
            ServiceError::InvalidFixtureInput(source) => AppError::BadRequest(source.to_string()),
            ServiceError::Unauthorized(message) => AppError::Unauthorized(message),
            ServiceError::InvalidInput(message) => AppError::BadRequest(message),
            ServiceError::InvalidState(message) => AppError::Conflict(message),
            ServiceError::NotFound(message) => AppError::NotFound(message),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        };

        let payload = Json(ErrorBody {
            message: self.to_string(),
        });

        (status, payload).into_response()
    }
}
