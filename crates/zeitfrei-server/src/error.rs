//! Error types for the server.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use zeitfrei_oauth::{OAuthError, ProviderError};
use zeitfrei_store::StoreError;
use zeitfrei_sync::SyncError;

/// Server error type.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Missing or unknown API key.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The user revoked the application.
    #[error("Authorization revoked: {0}")]
    Revoked(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Resource already exists.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Discord could not be reached or answered with a retryable failure.
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Database/storage error.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for ServerError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::DuplicateMapping { .. } => ServerError::Conflict(e.to_string()),
            StoreError::MappingNotFound { .. } => ServerError::NotFound(e.to_string()),
            StoreError::Database(_) | StoreError::Migration(_) => ServerError::Storage(e.to_string()),
        }
    }
}

impl From<ProviderError> for ServerError {
    fn from(e: ProviderError) -> Self {
        match e {
            ProviderError::Rejected { .. } => ServerError::BadRequest(e.to_string()),
            ProviderError::Transient(_) => ServerError::ServiceUnavailable(e.to_string()),
        }
    }
}

impl From<SyncError> for ServerError {
    fn from(e: SyncError) -> Self {
        match e {
            SyncError::Store(e) | SyncError::OAuth(OAuthError::Store(e)) => e.into(),
            SyncError::Provider(e) | SyncError::OAuth(OAuthError::Provider(e)) => e.into(),
            SyncError::Notify(msg) => ServerError::Internal(msg),
        }
    }
}

/// Result type for server operations.
pub type Result<T> = std::result::Result<T, ServerError>;

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Human-readable error message.
    pub error: String,
    /// Error code for programmatic handling.
    pub code: String,
}

impl ServerError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ServerError::Forbidden(_) => (StatusCode::FORBIDDEN, "forbidden"),
            ServerError::Revoked(_) => (StatusCode::FORBIDDEN, "revoked"),
            ServerError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            ServerError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            ServerError::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
            ServerError::ServiceUnavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "service_unavailable"),
            ServerError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "storage_error"),
            ServerError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let message = self.to_string();

        if status.is_server_error() {
            tracing::error!(status = %status, code, error = %message, "Server error");
        } else {
            tracing::warn!(status = %status, code, error = %message, "Client error");
        }

        let body = ErrorResponse {
            error: message,
            code: code.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
