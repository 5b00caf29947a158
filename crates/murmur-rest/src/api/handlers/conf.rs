//! Server configuration handlers.

use std::collections::BTreeMap;

use axum::extract::{Path, State};
use tracing::{debug, info, instrument};

use crate::api::error::ApiResult;
use crate::api::extract::FormFields;
use crate::api::response::{PrettyJson, message};
use crate::api::state::AppState;

/// Effective configuration of a server.
#[instrument(skip(state))]
pub async fn get_conf(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<PrettyJson<BTreeMap<String, String>>> {
    let server = state.server(id).await?;
    Ok(PrettyJson(server.get_all_conf().await?))
}

/// Write configuration.
///
/// A `key` and `value` pair writes exactly that entry. Without the pair, every other
/// non-empty field is written as its own key.
#[instrument(skip(state, form))]
pub async fn set_conf(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    form: FormFields,
) -> ApiResult<PrettyJson<serde_json::Value>> {
    let server = state.server(id).await?;

    if let (Some(key), Some(value)) = (form.get("key"), form.get("value")) {
        server.set_conf(key, value).await?;
        info!(server_id = id, key, "Updated configuration");
        return Ok(message("Configuration updated."));
    }

    let mut count = 0;
    for (key, value) in form.non_empty_except(&["key", "value"]) {
        server.set_conf(key, value).await?;
        count += 1;
    }

    if count == 0 {
        debug!(server_id = id, "Configuration update without fields");
        return Ok(message("Configuration key and value required."));
    }

    info!(server_id = id, count, "Updated configuration");
    Ok(message(format!("Configuration updated: {count} values.")))
}
