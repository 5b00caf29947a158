//! Registered and connected user handlers.

use std::collections::BTreeMap;

use axum::extract::{Path, State};
use murmur_rpc::{User, UserInfo, UserInfoMap};
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info, instrument};

use crate::api::error::{ApiError, ApiResult};
use crate::api::extract::FormFields;
use crate::api::response::{PrettyJson, message};
use crate::api::state::AppState;
use crate::murmur::{MurmurError, VirtualServer};

/// A registration as rendered by the user routes.
#[derive(Debug, Serialize)]
pub struct Registration {
    pub user_id: i32,
    pub username: String,
    pub last_active: String,
}

impl Registration {
    fn new(user_id: i32, mut info: UserInfoMap) -> Self {
        Self {
            user_id,
            username: info.remove(&UserInfo::UserName).unwrap_or_default(),
            last_active: info.remove(&UserInfo::UserLastActive).unwrap_or_default(),
        }
    }
}

/// Find the connected session of a registered user.
///
/// The remote interface has no lookup by registration ID, so this scans every
/// connected user.
async fn connected_user(server: &dyn VirtualServer, userid: i32) -> ApiResult<Option<User>> {
    Ok(server
        .get_users()
        .await?
        .into_values()
        .find(|u| u.userid == userid))
}

async fn set_mute(state: &AppState, id: i32, userid: i32, mute: bool) -> ApiResult<()> {
    let server = state.server_or_internal(id).await?;
    let user = connected_user(server.as_ref(), userid)
        .await?
        .ok_or_else(|| ApiError::not_found_internal(format!("No User Found for ID {userid}")))?;

    let mut user_state = server.get_state(user.session).await?;
    user_state.mute = mute;
    server.set_state(user_state).await?;

    info!(server_id = id, userid, session = user.session, mute, "Changed mute state");
    Ok(())
}

/// Connected users keyed by session ID.
#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<PrettyJson<BTreeMap<i32, User>>> {
    let server = state.server(id).await?;
    Ok(PrettyJson(server.get_users().await?))
}

/// Register a user.
#[instrument(skip(state, form))]
pub async fn create_user(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    form: FormFields,
) -> ApiResult<PrettyJson<serde_json::Value>> {
    let server = state.server(id).await?;

    let (Some(username), Some(password)) = (form.get("username"), form.get("password")) else {
        debug!(server_id = id, "User registration without username or password");
        return Ok(message("Username and password required."));
    };

    let mut info = UserInfoMap::new();
    info.insert(UserInfo::UserName, username.to_string());
    info.insert(UserInfo::UserPassword, password.to_string());

    // Only an unknown server ID is a not-found here; a rejected registration is a remote failure.
    let userid = match server.register_user(info).await {
        Ok(userid) => userid,
        Err(MurmurError::InvalidUser(reason)) => {
            return Err(ApiError::internal(format!(
                "Failed to register user {username}: {reason}"
            )));
        }
        Err(err) => return Err(err.into()),
    };
    info!(server_id = id, userid, "Registered user");

    let registration = Registration::new(userid, server.get_registration(userid).await?);
    Ok(PrettyJson(serde_json::to_value(registration).map_err(|e| {
        ApiError::internal(format!("Failed to render registration: {e}"))
    })?))
}

/// Show a registration.
#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    Path((id, userid)): Path<(i32, i32)>,
) -> ApiResult<PrettyJson<Registration>> {
    let server = state.server(id).await?;
    let info = server.get_registration(userid).await?;
    Ok(PrettyJson(Registration::new(userid, info)))
}

/// Remove a registration.
#[instrument(skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    Path((id, userid)): Path<(i32, i32)>,
) -> ApiResult<PrettyJson<serde_json::Value>> {
    let server = state.server_or_internal(id).await?;

    match server.get_registration(userid).await {
        Ok(_) => {}
        Err(MurmurError::InvalidUser(_)) => {
            return Err(ApiError::not_found_internal(format!(
                "No User Found for ID {userid}"
            )));
        }
        Err(err) => return Err(err.into()),
    }

    server.unregister_user(userid).await?;
    info!(server_id = id, userid, "Unregistered user");

    Ok(PrettyJson(json!({
        "user_id": userid,
        "deleted": "Success",
    })))
}

/// Server-mute a connected user by registration ID.
#[instrument(skip(state))]
pub async fn mute_user(
    State(state): State<AppState>,
    Path((id, userid)): Path<(i32, i32)>,
) -> ApiResult<PrettyJson<serde_json::Value>> {
    set_mute(&state, id, userid, true).await?;
    Ok(PrettyJson(json!({
        "user_id": userid,
        "muted": "Success",
    })))
}

/// Lift a server mute.
#[instrument(skip(state))]
pub async fn unmute_user(
    State(state): State<AppState>,
    Path((id, userid)): Path<(i32, i32)>,
) -> ApiResult<PrettyJson<serde_json::Value>> {
    set_mute(&state, id, userid, false).await?;
    Ok(PrettyJson(json!({
        "user_id": userid,
        "unmuted": "Success",
    })))
}
