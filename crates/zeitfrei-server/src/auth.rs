//! API key middleware.
//!
//! Subscriber bots send their key in the `X-API-KEY` header. Keys are
//! compared in constant time against every configured bot.

use axum::{
    body::Body,
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use subtle::ConstantTimeEq;

use crate::error::ServerError;
use crate::state::AppState;

// ─────────────────────────────────────────────────────────────────────────────
// Constants
// ─────────────────────────────────────────────────────────────────────────────

/// Header carrying the caller's API key.
pub const API_KEY_HEADER: &str = "x-api-key";

// ─────────────────────────────────────────────────────────────────────────────
// Identity
// ─────────────────────────────────────────────────────────────────────────────

/// The bot a request was authenticated as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotIdentity {
    pub name: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Auth Error
// ─────────────────────────────────────────────────────────────────────────────

/// Authentication error.
#[derive(Debug, Clone)]
pub enum AuthError {
    MissingKey,
    InvalidKey,
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::MissingKey => write!(f, "Missing API key"),
            AuthError::InvalidKey => write!(f, "Invalid API key"),
        }
    }
}

impl std::error::Error for AuthError {}

impl From<AuthError> for ServerError {
    fn from(e: AuthError) -> Self {
        ServerError::Forbidden(e.to_string())
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        ServerError::from(self).into_response()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Security Helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Compare two strings in constant time.
///
/// Length mismatches still run a comparison of equal cost before failing.
fn constant_time_eq(a: &str, b: &str) -> bool {
    let a_bytes = a.as_bytes();
    let b_bytes = b.as_bytes();

    if a_bytes.len() == b_bytes.len() {
        a_bytes.ct_eq(b_bytes).into()
    } else {
        let _ = a_bytes.ct_eq(a_bytes);
        false
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Middleware
// ─────────────────────────────────────────────────────────────────────────────

/// Reject requests without a known API key; inject [`BotIdentity`] otherwise.
pub async fn api_key_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AuthError> {
    let identity = match validate_request(&request, &state) {
        Ok(identity) => identity,
        Err(e) => {
            tracing::debug!(path = %request.uri().path(), error = %e, "Rejected request");
            return Err(e);
        }
    };

    tracing::debug!(bot = %identity.name, path = %request.uri().path(), "Authenticated");
    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}

fn validate_request(request: &Request<Body>, state: &AppState) -> Result<BotIdentity, AuthError> {
    let presented = request
        .headers()
        .get(API_KEY_HEADER)
        .ok_or(AuthError::MissingKey)?
        .to_str()
        .map_err(|_| AuthError::InvalidKey)?;

    // Check every key so the match position does not affect timing.
    let mut matched = None;
    for api_key in &state.config().api_keys {
        if constant_time_eq(presented, &api_key.key) && matched.is_none() {
            matched = Some(api_key.bot.clone());
        }
    }

    matched
        .map(|name| BotIdentity { name })
        .ok_or(AuthError::InvalidKey)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
