//! HTTP error mapping.

use crate::errors::Error;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sea_orm::{DbErr, SqlErr};
use thiserror::Error as ThisError;
use tracing::error;

/// Error returned by every handler.
#[derive(Debug, ThisError)]
pub enum ApiError {
    /// Row missing, hidden, or the write affected no rows
    #[error("{0}")]
    NotFound(String),

    /// Caller is not allowed to use the endpoint at all
    #[error("{0}")]
    Forbidden(String),

    /// Malformed request outside the core validation rules
    #[error("{0}")]
    BadRequest(String),

    /// Error from the core or a service client
    #[error(transparent)]
    Core(#[from] Error),
}

impl ApiError {
    /// Turns "no rows affected" into a 404 for `what`.
    pub fn not_found(what: &str) -> Self {
        Self::NotFound(format!("No matching {what}"))
    }
}

// Constraint violations come from a reachable database; anything else is treated
// as the backend being unavailable.
fn database_status(err: &DbErr) -> StatusCode {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => StatusCode::CONFLICT,
        Some(SqlErr::ForeignKeyConstraintViolation(_)) => StatusCode::UNPROCESSABLE_ENTITY,
        _ => StatusCode::SERVICE_UNAVAILABLE,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Core(e) => match e {
                Error::Validation { .. } | Error::InvalidAmount { .. } => StatusCode::BAD_REQUEST,
                Error::ProductNotFound { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                Error::Database(db) => database_status(db),
                Error::Http(_) | Error::Storage { .. } => StatusCode::BAD_GATEWAY,
                Error::Config { .. } | Error::Io(_) | Error::EnvVar(_) | Error::Json(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        };

        if status.is_server_error() {
            error!("{status}: {self}");
        }
        (status, self.to_string()).into_response()
    }
}

/// Result type for handlers.
pub type ApiResult<T> = std::result::Result<T, ApiError>;
