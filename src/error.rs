//! Error handling module
//!
//! Centralized error types and HTTP response conversion.

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::domain::BankError;

/// Application-wide Result type
pub type AppResult<T> = Result<T, AppError>;

/// Application error types
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Malformed body, path or query
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Bank(#[from] BankError),
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub error_code: String,
}

impl AppError {
    /// Status code and machine-readable code for every error kind
    pub fn classify(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "invalid_request"),
            AppError::Bank(err) => match err {
                BankError::DuplicateUsername(_) => (StatusCode::BAD_REQUEST, "duplicate_username"),
                BankError::DuplicateEmail(_) => (StatusCode::BAD_REQUEST, "duplicate_email"),
                BankError::InvalidAmount(_) => (StatusCode::BAD_REQUEST, "invalid_amount"),
                BankError::InvalidCustomerData(_) => {
                    (StatusCode::BAD_REQUEST, "invalid_customer_data")
                }
                BankError::InsufficientFunds { .. } => {
                    (StatusCode::BAD_REQUEST, "insufficient_funds")
                }
                BankError::SameAccount => (StatusCode::BAD_REQUEST, "same_account_transfer"),
                BankError::InvalidCredentials => {
                    (StatusCode::UNAUTHORIZED, "invalid_credentials")
                }
                BankError::AccountNotFound(_) => (StatusCode::NOT_FOUND, "customer_not_found"),
                BankError::EntryNotFound(_) => (StatusCode::NOT_FOUND, "transaction_not_found"),
                BankError::Conflict => (StatusCode::CONFLICT, "version_conflict"),
                BankError::StoreUnavailable(_) => {
                    (StatusCode::SERVICE_UNAVAILABLE, "store_unavailable")
                }
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_code) = self.classify();

        let message = if status.is_server_error() {
            tracing::error!(error_code, "Request failed: {}", self);
            "Service temporarily unavailable".to_string()
        } else {
            if let AppError::Bank(err) = &self {
                if err.is_client_error() {
                    tracing::debug!(error_code, "Request rejected: {}", err);
                }
            }
            self.to_string()
        };

        let body = ErrorResponse {
            error: message,
            error_code: error_code.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::InvalidRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::InvalidRequest(rejection.body_text())
    }
}
