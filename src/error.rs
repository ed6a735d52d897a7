//! Error types and their HTTP mapping

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::timer::{TimerAction, TimerStatus};

/// Failures raised by the timer core
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TimerError {
    #[error("invalid timer state transition: cannot {action} while {state}")]
    InvalidTransition {
        action: TimerAction,
        state: TimerStatus,
    },

    #[error("invalid duration: {0} hours (must be a positive number)")]
    InvalidDuration(f64),

    /// Running timer without a last-updated stamp. Elapsed time is treated as
    /// zero, so `frozen_seconds` is the value a reader should fall back to.
    #[error("timer state corrupted: running timer has no last-updated timestamp")]
    StateCorrupted { frozen_seconds: u64 },
}

/// Application-level error returned by handlers and the store
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Timer(#[from] TimerError),

    #[error("scope {0} not found")]
    NotFound(u64),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("persistence error: {0}")]
    Persistence(String),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            AppError::Timer(TimerError::InvalidTransition { .. }) => {
                (StatusCode::CONFLICT, "INVALID_TRANSITION")
            }
            AppError::Timer(TimerError::InvalidDuration(_)) => {
                (StatusCode::BAD_REQUEST, "INVALID_DURATION")
            }
            AppError::Timer(TimerError::StateCorrupted { .. }) => {
                tracing::error!(error = %self, "Timer state corrupted");
                (StatusCode::INTERNAL_SERVER_ERROR, "TIMER_STATE_CORRUPTED")
            }
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            AppError::Persistence(_) | AppError::Internal(_) => {
                tracing::error!(error = %self, "Internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
            }
        };

        let body = json!({
            "error": self.to_string(),
            "code": code,
        });

        (status, Json(body)).into_response()
    }
}
