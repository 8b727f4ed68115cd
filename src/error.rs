use crate::domain::DecimalOverflow;
use crate::orchestration::{EnrollmentError, LedgerError, SyncError};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Internal server error: {0}")]
    Internal(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Upstream error: {0}")]
    Upstream(String),
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err.as_database_error() {
            Some(db) if db.is_unique_violation() => AppError::Conflict(db.message().to_string()),
            _ => AppError::Internal(err.to_string()),
        }
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::Invalid(msg) => AppError::BadRequest(msg),
            LedgerError::NotFound(_) => AppError::NotFound(err.to_string()),
            LedgerError::Overflow(e) => e.into(),
            LedgerError::Db(e) => e.into(),
        }
    }
}

/// Stored amounts that cannot be split or totalled are a server-side fault.
impl From<DecimalOverflow> for AppError {
    fn from(err: DecimalOverflow) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<EnrollmentError> for AppError {
    fn from(err: EnrollmentError) -> Self {
        match err {
            EnrollmentError::UnknownUser(_) => AppError::NotFound(err.to_string()),
            EnrollmentError::NoActivePlan(_) => AppError::BadRequest(err.to_string()),
            EnrollmentError::AccountLimit { .. } => AppError::Conflict(err.to_string()),
            EnrollmentError::Db(e) => e.into(),
        }
    }
}

impl From<SyncError> for AppError {
    fn from(err: SyncError) -> Self {
        match err {
            SyncError::Source(e) => AppError::Upstream(e.to_string()),
            SyncError::Db(e) => e.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::Upstream(msg) => (StatusCode::BAD_GATEWAY, msg),
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}
