//! Guild role mapping endpoints.

use axum::{
    Json,
    extract::{Path, State},
};
use serde_json::{Value, json};
use zeitfrei_types::{GuildId, GuildRoleMapping, RoleId};

use super::parse_id;
use crate::error::{Result, ServerError};
use crate::state::AppState;

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// `POST /add_guild`
pub async fn add_guild_handler(
    State(state): State<AppState>,
    Json(mapping): Json<GuildRoleMapping>,
) -> Result<Json<Value>> {
    state.guilds().add_mapping(&mapping)?;
    Ok(Json(json!({
        "message": format!("Guild {} added successfully", mapping.guild_id),
        "mapping": mapping,
    })))
}

/// `DELETE /delete_guild_data`
pub async fn delete_guild_handler(
    State(state): State<AppState>,
    Json(mapping): Json<GuildRoleMapping>,
) -> Result<Json<Value>> {
    state
        .guilds()
        .remove_mapping(mapping.guild_id, mapping.unauth_role_id, mapping.auth_role_id)?;
    Ok(Json(json!({
        "message": format!("Guild {} mapping deleted successfully", mapping.guild_id),
    })))
}

/// `GET /get_guild_auth_role_data/{guild_id}`
pub async fn get_guild_auth_role_data_handler(
    State(state): State<AppState>,
    Path(guild_id): Path<String>,
) -> Result<Json<Vec<GuildRoleMapping>>> {
    let guild_id: GuildId = parse_id(&guild_id, "guild id")?;
    Ok(Json(state.guilds().find_by_guild(guild_id)?))
}

/// `GET /get_auth_role_data/{unauth}+{auth}`
pub async fn get_auth_role_data_handler(
    State(state): State<AppState>,
    Path(pair): Path<String>,
) -> Result<Json<Vec<GuildRoleMapping>>> {
    let (unauth, auth) = pair
        .split_once('+')
        .ok_or_else(|| ServerError::BadRequest(format!("Expected <unauth>+<auth>, got '{}'", pair)))?;
    let unauth: RoleId = parse_id(unauth, "unauthorized role id")?;
    let auth: RoleId = parse_id(auth, "authorized role id")?;

    Ok(Json(state.guilds().find_by_role_pair(unauth, auth)?))
}
