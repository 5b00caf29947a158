//! Messaging, superuser and moderation handlers.

use axum::extract::{Path, State};
use murmur_rpc::Ban;
use tracing::{debug, info, instrument};

use crate::api::error::ApiResult;
use crate::api::extract::FormFields;
use crate::api::response::{PrettyJson, message};
use crate::api::state::AppState;
use crate::murmur::MurmurError;

/// Channel the broadcast starts from.
const ROOT_CHANNEL: i32 = 0;

const DEFAULT_KICK_REASON: &str = "Reason not defined.";

/// Ban list of a server.
#[instrument(skip(state))]
pub async fn list_bans(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<PrettyJson<Vec<Ban>>> {
    let server = state.server(id).await?;
    Ok(PrettyJson(server.get_bans().await?))
}

/// Send a text message to every channel.
#[instrument(skip(state, form))]
pub async fn send_message(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    form: FormFields,
) -> ApiResult<PrettyJson<serde_json::Value>> {
    let Some(text) = form.get("message") else {
        return Ok(message("Message required."));
    };

    let server = state.server(id).await?;
    server.send_message_channel(ROOT_CHANNEL, true, text).await?;
    info!(server_id = id, "Broadcast message");
    Ok(message("Message sent."))
}

/// Reset the SuperUser password.
#[instrument(skip(state, form))]
pub async fn set_superuser_password(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    form: FormFields,
) -> ApiResult<PrettyJson<serde_json::Value>> {
    let Some(password) = form.get("password") else {
        return Ok(message("Password required."));
    };

    let server = state.server(id).await?;
    server.set_superuser_password(password).await?;
    info!(server_id = id, "Set superuser password");
    Ok(message("Superuser password set."))
}

/// Disconnect a session.
#[instrument(skip(state, form))]
pub async fn kick_user(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    form: FormFields,
) -> ApiResult<PrettyJson<serde_json::Value>> {
    let session = form
        .get("usersession")
        .and_then(|s| s.trim().parse::<i32>().ok())
        .filter(|&s| s != 0);
    let Some(session) = session else {
        return Ok(message("User session required."));
    };
    let reason = form.0.get("reason").map_or(DEFAULT_KICK_REASON, String::as_str);

    let server = state.server(id).await?;
    match server.kick_user(session, reason).await {
        Ok(()) => {
            info!(server_id = id, session, "Kicked user");
            Ok(message("User kicked from server."))
        }
        Err(MurmurError::InvalidSession(_)) => {
            debug!(server_id = id, session, "Kick for unknown session");
            Ok(message("Not a valid session ID."))
        }
        Err(err) => Err(err.into()),
    }
}
