//! User endpoints.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use serde_json::{Value, json};
use zeitfrei_sync::{CheckOutcome, DeauthReport, EnsureOutcome};
use zeitfrei_types::{UserCredential, UserId};

use super::parse_id;
use crate::error::{Result, ServerError};
use crate::state::AppState;

// ─────────────────────────────────────────────────────────────────────────────
// Types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct EnsureQuery {
    /// Verify the token against the provider before answering.
    #[serde(default)]
    pub ensure: bool,
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// `GET /user/{id}`
pub async fn get_user_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<EnsureQuery>,
) -> Result<Json<UserCredential>> {
    let user_id: UserId = parse_id(&id, "user id")?;

    if !query.ensure {
        return state
            .tokens()
            .get(user_id)?
            .map(Json)
            .ok_or_else(|| no_such_user(user_id));
    }

    match state.gatekeeper.check_user(user_id).await? {
        CheckOutcome::Fresh { credential, .. } => Ok(Json(credential)),
        CheckOutcome::NoSuchUser => Err(no_such_user(user_id)),
        CheckOutcome::Revoked { .. } => Err(ServerError::NotFound(format!(
            "User {} revoked authorization and was removed",
            user_id
        ))),
        CheckOutcome::Transient { reason } => Err(ServerError::ServiceUnavailable(reason)),
    }
}

/// `GET /all_user`
pub async fn all_users_handler(State(state): State<AppState>) -> Result<Json<Vec<UserCredential>>> {
    Ok(Json(state.tokens().list()?))
}

/// `DELETE /delete_user/{id}`
pub async fn delete_user_handler(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Value>> {
    let user_id: UserId = parse_id(&id, "user id")?;
    let report: DeauthReport = state.gatekeeper.remove_user(user_id).await?;

    let message = if report.credential_deleted {
        format!("User {} deleted successfully", user_id)
    } else {
        format!("User {} had no stored credential", user_id)
    };
    Ok(Json(json!({ "message": message, "report": report })))
}

/// `POST /add_user_to_server/{id}`
pub async fn add_user_to_server_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<EnsureOutcome>> {
    let user_id: UserId = parse_id(&id, "user id")?;

    match state.gatekeeper.ensure_member(user_id).await? {
        outcome @ EnsureOutcome::Reconciled { .. } => Ok(Json(outcome)),
        EnsureOutcome::NoSuchUser => Err(no_such_user(user_id)),
        EnsureOutcome::Revoked { .. } => Err(ServerError::Revoked(format!(
            "User {} revoked authorization and was removed",
            user_id
        ))),
        EnsureOutcome::Transient { reason } => Err(ServerError::ServiceUnavailable(reason)),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

fn no_such_user(user_id: UserId) -> ServerError {
    ServerError::NotFound(format!("User {} not found", user_id))
}
