//! Error types for guild synchronization.

use std::time::Duration;

use reqwest::StatusCode;

/// Result type alias for this crate.
pub type Result<T> = std::result::Result<T, SyncError>;

/// A single guild API call failed.
///
/// These never abort a reconciliation; they are recorded per guild in the
/// report.
#[derive(Debug, Clone, thiserror::Error)]
pub enum GuildApiError {
    /// Discord answered with a non-success status.
    #[error("Discord returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The request never completed.
    #[error("Request failed: {0}")]
    Transport(String),

    /// No answer within the call budget.
    #[error("Timed out after {0:?}")]
    Timeout(Duration),
}

impl GuildApiError {
    pub fn from_status(status: StatusCode, body: String) -> Self {
        GuildApiError::Status {
            status: status.as_u16(),
            body,
        }
    }
}

impl From<reqwest::Error> for GuildApiError {
    fn from(e: reqwest::Error) -> Self {
        GuildApiError::Transport(e.to_string())
    }
}

/// Errors that can occur while synchronizing a user.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Credential or registry storage failure.
    #[error("Storage error: {0}")]
    Store(#[from] zeitfrei_store::StoreError),

    /// Token refresh failed for a reason other than the provider.
    #[error(transparent)]
    OAuth(#[from] zeitfrei_oauth::OAuthError),

    /// Identity provider failure during login.
    #[error(transparent)]
    Provider(#[from] zeitfrei_oauth::ProviderError),

    /// A revocation notice could not be delivered.
    #[error("Notification failed: {0}")]
    Notify(String),
}
