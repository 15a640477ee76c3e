//! OAuth redirect target.

use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;
use zeitfrei_sync::EnsureOutcome;

use crate::error::{Result, ServerError};
use crate::state::AppState;

// ─────────────────────────────────────────────────────────────────────────────
// Types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    /// Set by Discord when the user declined.
    pub error: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// `GET /callback?code=...`
///
/// Exchanges the authorization code, stores the user and reconciles their
/// roles. Answers with JSON; rendering a page is left to a front end.
pub async fn callback_handler(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
) -> Result<Json<EnsureOutcome>> {
    if let Some(error) = query.error {
        return Err(ServerError::BadRequest(format!("Authorization denied: {}", error)));
    }
    let code = query
        .code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| ServerError::BadRequest("Missing authorization code".to_string()))?;

    Ok(Json(state.gatekeeper.register_user(&code).await?))
}
