use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::utils::{error_codes, error_to_api_response};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Nicht angemeldet")]
    Unauthorized,
    #[error("{0}")]
    InvalidCredentials(String),
    #[error("Keine Berechtigung für diese Aktion")]
    Forbidden,
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    AlreadyExists(String),
    #[error("{0}")]
    Conflict(String),
    #[error("Nur {available} freie Plätze verfügbar.")]
    InsufficientSeats { requested: i64, available: i64 },
    #[error("Keine Daten zum Exportieren")]
    NoData,
    #[error("{0}")]
    IdentityProvider(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("cache error: {0}")]
    Cache(#[from] redis::RedisError),
    #[error("upstream request failed: {0}")]
    Upstream(#[from] reqwest::Error),
    #[error("token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
    #[error("export error: {0}")]
    Export(#[from] csv::Error),
    #[error("{0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthorized | AppError::InvalidCredentials(_) => StatusCode::UNAUTHORIZED,
            AppError::IdentityProvider(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound(_) | AppError::NoData => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::AlreadyExists(_)
            | AppError::Conflict(_)
            | AppError::InsufficientSeats { .. } => StatusCode::CONFLICT,
            AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
            AppError::Database(_)
            | AppError::Cache(_)
            | AppError::Token(_)
            | AppError::Export(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            AppError::Unauthorized | AppError::InvalidCredentials(_) => error_codes::AUTH_FAILED,
            AppError::IdentityProvider(_) | AppError::Upstream(_) => error_codes::IDENTITY_PROVIDER,
            AppError::Forbidden => error_codes::PERMISSION_DENIED,
            AppError::NotFound(_) => error_codes::NOT_FOUND,
            AppError::Validation(_) => error_codes::VALIDATION_ERROR,
            AppError::AlreadyExists(_) => error_codes::ALREADY_EXISTS,
            AppError::Conflict(_) => error_codes::INVALID_STATE,
            AppError::InsufficientSeats { .. } => error_codes::INSUFFICIENT_SEATS,
            AppError::NoData => error_codes::NO_DATA,
            _ => error_codes::INTERNAL_ERROR,
        }
    }

    /// True when a database error is a unique-constraint violation.
    pub fn is_unique_violation(err: &sqlx::Error) -> bool {
        err.as_database_error()
            .and_then(|db| db.code())
            .is_some_and(|code| code == "23505")
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
            "Interner Serverfehler".to_string()
        } else {
            self.to_string()
        };

        (status, error_to_api_response::<()>(self.code(), message)).into_response()
    }
}
