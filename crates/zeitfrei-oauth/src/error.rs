//! Error types for the OAuth crate.

use reqwest::StatusCode;

/// Result type alias for this crate.
pub type Result<T> = std::result::Result<T, OAuthError>;

/// Failure talking to the identity provider, classified by permanence.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProviderError {
    /// The provider refused the grant. For a refresh this means the refresh
    /// token is permanently invalid, typically because the user revoked the
    /// application.
    #[error("Provider rejected request ({status}): {body}")]
    Rejected { status: u16, body: String },

    /// Network failure, timeout, rate limit, 5xx, or an unreadable body.
    /// Safe to retry later.
    #[error("Transient provider failure: {0}")]
    Transient(String),
}

impl ProviderError {
    /// Classify a non-success HTTP status.
    ///
    /// 408 and 429 are client-error codes that say nothing about the grant
    /// itself, so they stay retryable.
    pub fn from_status(status: StatusCode, body: String) -> Self {
        if status.is_client_error()
            && status != StatusCode::REQUEST_TIMEOUT
            && status != StatusCode::TOO_MANY_REQUESTS
        {
            ProviderError::Rejected {
                status: status.as_u16(),
                body,
            }
        } else {
            ProviderError::Transient(format!("HTTP {}: {}", status.as_u16(), body))
        }
    }

    pub fn is_permanent(&self) -> bool {
        matches!(self, ProviderError::Rejected { .. })
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ProviderError::Transient(format!("Request timed out: {}", e))
        } else {
            ProviderError::Transient(e.to_string())
        }
    }
}

/// Errors that can occur in the OAuth crate.
#[derive(Debug, thiserror::Error)]
pub enum OAuthError {
    /// Identity provider failure.
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// Credential storage failure.
    #[error("Storage error: {0}")]
    Store(#[from] zeitfrei_store::StoreError),
}
