//! Channel and channel ACL handlers.

use std::collections::BTreeMap;

use axum::extract::{Path, State};
use murmur_rpc::permissions::{GROUP_ALL, PASSWORD_GATED, TOKEN_GROUP_MARKER};
use murmur_rpc::{Acl, AclSet, Channel};
use serde_json::json;
use tracing::{debug, info, instrument};

use crate::api::error::{ApiError, ApiResult};
use crate::api::extract::FormFields;
use crate::api::response::{PrettyJson, message};
use crate::api::state::AppState;
use crate::murmur::MurmurError;

/// ACL entries that close a channel to everyone except holders of `password`.
///
/// The blanket deny comes first so the access token grant overrides it.
pub fn password_acls(password: &str) -> Vec<Acl> {
    let deny_all = Acl {
        apply_here: true,
        apply_subs: false,
        inherited: false,
        userid: -1,
        group: GROUP_ALL.to_string(),
        allow: 0,
        deny: PASSWORD_GATED,
    };
    let grant = Acl {
        group: format!("{TOKEN_GROUP_MARKER}{password}"),
        allow: PASSWORD_GATED,
        deny: 0,
        ..deny_all.clone()
    };
    vec![deny_all, grant]
}

/// Channels keyed by channel ID.
#[instrument(skip(state))]
pub async fn list_channels(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<PrettyJson<BTreeMap<i32, Channel>>> {
    let server = state.server(id).await?;
    Ok(PrettyJson(server.get_channels().await?))
}

/// Create a channel and return its state.
#[instrument(skip(state, form))]
pub async fn create_channel(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    form: FormFields,
) -> ApiResult<PrettyJson<serde_json::Value>> {
    let server = state.server(id).await?;

    let Some(name) = form.get("name") else {
        debug!(server_id = id, "Channel creation without a name");
        return Ok(message("Channel name required."));
    };
    let parent = match form.get("parent") {
        Some(raw) => raw
            .trim()
            .parse::<i32>()
            .map_err(|_| ApiError::bad_request(format!("Invalid parent channel ID: {raw}")))?,
        None => 0,
    };

    let channel_id = server.add_channel(name, parent).await?;
    info!(server_id = id, channel_id, parent, "Created channel");

    let channel = server.get_channel_state(channel_id).await?;
    Ok(PrettyJson(serde_json::to_value(channel).map_err(|e| {
        ApiError::internal(format!("Failed to render channel: {e}"))
    })?))
}

/// Show one channel.
#[instrument(skip(state))]
pub async fn get_channel(
    State(state): State<AppState>,
    Path((id, channel_id)): Path<(i32, i32)>,
) -> ApiResult<PrettyJson<Channel>> {
    let server = state.server(id).await?;
    Ok(PrettyJson(server.get_channel_state(channel_id).await?))
}

/// Remove a channel and everything below it.
#[instrument(skip(state))]
pub async fn delete_channel(
    State(state): State<AppState>,
    Path((id, channel_id)): Path<(i32, i32)>,
) -> ApiResult<PrettyJson<serde_json::Value>> {
    let server = state.server_or_internal(id).await?;

    match server.get_channel_state(channel_id).await {
        Ok(_) => {}
        Err(MurmurError::InvalidChannel(_)) => {
            return Err(ApiError::not_found_internal(format!(
                "No Channel Found for ID {channel_id}"
            )));
        }
        Err(err) => return Err(err.into()),
    }

    server.remove_channel(channel_id).await?;
    info!(server_id = id, channel_id, "Removed channel");

    Ok(PrettyJson(json!({
        "channel_id": channel_id,
        "deleted": "Success",
    })))
}

/// ACL entries, groups and inherit flag of a channel as `[acls, groups, inherit]`.
#[instrument(skip(state))]
pub async fn channel_acl(
    State(state): State<AppState>,
    Path((id, channel_id)): Path<(i32, i32)>,
) -> ApiResult<PrettyJson<AclSet>> {
    let server = state.server(id).await?;
    Ok(PrettyJson(server.get_acl(channel_id).await?))
}

/// Password-protect a channel by replacing its ACL entries.
#[instrument(skip(state, form))]
pub async fn set_channel_password(
    State(state): State<AppState>,
    Path((id, channel_id)): Path<(i32, i32)>,
    form: FormFields,
) -> ApiResult<PrettyJson<serde_json::Value>> {
    let server = state.server(id).await?;

    let Some(password) = form.get("password") else {
        return Ok(message("Password required."));
    };

    let current = match server.get_acl(channel_id).await {
        Ok(acl) => acl,
        Err(MurmurError::InvalidChannel(_)) => {
            return Err(ApiError::not_found("Channel Not Found"));
        }
        Err(err) => return Err(err.into()),
    };

    let acl = AclSet {
        acls: password_acls(password),
        groups: current.groups,
        inherit: current.inherit,
    };
    server.set_acl(channel_id, acl).await?;
    info!(server_id = id, channel_id, "Set channel password");

    Ok(PrettyJson(json!({
        "channel_id": channel_id,
        "set_password": "Success",
    })))
}
