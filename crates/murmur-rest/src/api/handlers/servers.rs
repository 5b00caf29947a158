//! Server lifecycle handlers.

use std::collections::BTreeMap;

use axum::extract::{Path, Query, State};
use murmur_rpc::{Ban, Channel, Tree, User};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, instrument};

use crate::api::error::{ApiError, ApiResult};
use crate::api::extract::FormFields;
use crate::api::response::{PrettyJson, message};
use crate::api::state::AppState;
use crate::auth::CurrentUser;
use crate::murmur::{Meta, MurmurResult, VirtualServer};
use crate::util::{humanize_uptime, parse_id_list, server_conf, server_port};

/// Configuration keys `POST /servers` accepts.
const CREATE_FIELDS: &[&str] = &[
    "password",
    "port",
    "timeout",
    "bandwidth",
    "users",
    "welcometext",
    "registername",
    "registerpassword",
    "registerhostname",
    "registerurl",
];

/// One entry of the server listing.
#[derive(Debug, Serialize)]
pub struct ServerSummary {
    pub id: i32,
    pub name: String,
    pub address: String,
    pub host: String,
    pub port: i64,
    pub running: bool,
    pub users: usize,
    pub maxusers: i64,
    pub channels: usize,
    pub uptime_seconds: i64,
    pub uptime: String,
    pub log_length: i32,
}

/// Full view of one server. Tree, registration and ban fields are null while stopped.
#[derive(Debug, Serialize)]
pub struct ServerDetail {
    pub id: i32,
    pub name: String,
    pub host: String,
    pub port: i64,
    pub address: String,
    pub password: String,
    pub welcometext: String,
    pub user_count: usize,
    pub maxusers: i64,
    pub running: bool,
    pub uptime: i64,
    pub humanize_uptime: String,
    pub parent_channel: Option<Channel>,
    pub sub_channels: Option<Vec<Tree>>,
    pub users: Option<Vec<User>>,
    pub registered_users: Option<BTreeMap<i32, String>>,
    pub log_length: i32,
    pub bans: Option<Vec<Ban>>,
}

/// A log line as rendered by `GET /servers/{id}/logs`.
#[derive(Debug, Serialize)]
pub struct LogLine {
    pub message: String,
    pub timestamp: i32,
}

#[derive(Debug, Deserialize)]
pub struct BulkDeleteQuery {
    pub id: Option<String>,
}

fn parse_count(value: &str) -> i64 {
    value.trim().parse().unwrap_or(0)
}

async fn summarize(meta: &dyn Meta, server: &dyn VirtualServer) -> MurmurResult<ServerSummary> {
    let running = server.is_running().await?;
    let host = server_conf(meta, server, "host").await?;
    let port = server_port(meta, server).await?;

    let (users, channels, uptime_seconds) = if running {
        (
            server.get_users().await?.len(),
            server.get_channels().await?.len(),
            server.get_uptime().await?,
        )
    } else {
        (0, 0, 0)
    };

    Ok(ServerSummary {
        id: server.id(),
        name: server_conf(meta, server, "registername").await?,
        address: format!("{host}:{port}"),
        host,
        port,
        running,
        users,
        maxusers: parse_count(&server_conf(meta, server, "users").await?),
        channels,
        uptime_seconds,
        uptime: if running {
            humanize_uptime(uptime_seconds)
        } else {
            String::new()
        },
        log_length: server.get_log_len().await?,
    })
}

async fn describe(meta: &dyn Meta, server: &dyn VirtualServer) -> MurmurResult<ServerDetail> {
    let running = server.is_running().await?;
    let host = server_conf(meta, server, "host").await?;
    let port = server_port(meta, server).await?;

    let mut detail = ServerDetail {
        id: server.id(),
        name: server_conf(meta, server, "registername").await?,
        address: format!("{host}:{port}"),
        host,
        port,
        password: server_conf(meta, server, "password").await?,
        welcometext: server_conf(meta, server, "welcometext").await?,
        user_count: 0,
        maxusers: parse_count(&server_conf(meta, server, "users").await?),
        running,
        uptime: 0,
        humanize_uptime: String::new(),
        parent_channel: None,
        sub_channels: None,
        users: None,
        registered_users: None,
        log_length: server.get_log_len().await?,
        bans: None,
    };

    if running {
        let tree = server.get_tree().await?;
        detail.user_count = server.get_users().await?.len();
        detail.uptime = server.get_uptime().await?;
        detail.humanize_uptime = humanize_uptime(detail.uptime);
        detail.parent_channel = Some(tree.c);
        detail.sub_channels = Some(tree.children);
        detail.users = Some(tree.users);
        detail.registered_users = Some(server.get_registered_users("").await?);
        detail.bans = Some(server.get_bans().await?);
    }

    Ok(detail)
}

/// Stop (when running) and destroy a server.
async fn stop_and_delete(server: &dyn VirtualServer) -> MurmurResult<()> {
    if server.is_running().await? {
        server.stop().await?;
    }
    server.delete().await
}

/// List every server.
#[instrument(skip(state))]
pub async fn list_servers(State(state): State<AppState>) -> ApiResult<PrettyJson<Vec<ServerSummary>>> {
    let servers = state.meta.get_all_servers().await?;
    let mut summaries = Vec::with_capacity(servers.len());
    for server in &servers {
        summaries.push(summarize(state.meta.as_ref(), server.as_ref()).await?);
    }
    debug!(count = summaries.len(), "Listed servers");
    Ok(PrettyJson(summaries))
}

/// Show one server.
#[instrument(skip(state))]
pub async fn get_server(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<PrettyJson<ServerDetail>> {
    let server = state.server(id).await?;
    Ok(PrettyJson(describe(state.meta.as_ref(), server.as_ref()).await?))
}

/// Create a server from the submitted configuration and start it.
#[instrument(skip(state, user, form))]
pub async fn create_server(
    State(state): State<AppState>,
    user: Option<CurrentUser>,
    form: FormFields,
) -> ApiResult<PrettyJson<ServerDetail>> {
    let server = state.meta.new_server().await?;

    for key in CREATE_FIELDS {
        if let Some(value) = form.get(key) {
            server.set_conf(key, value).await?;
        }
    }

    server.start().await?;
    info!(
        server_id = server.id(),
        actor = CurrentUser::actor(user.as_ref()),
        "Created and started server"
    );

    Ok(PrettyJson(describe(state.meta.as_ref(), server.as_ref()).await?))
}

/// Stop and delete one server.
#[instrument(skip(state, user))]
pub async fn delete_server(
    State(state): State<AppState>,
    user: Option<CurrentUser>,
    Path(id): Path<i32>,
) -> ApiResult<PrettyJson<serde_json::Value>> {
    let server = state.server(id).await?;
    stop_and_delete(server.as_ref()).await?;
    info!(
        server_id = id,
        actor = CurrentUser::actor(user.as_ref()),
        "Deleted server"
    );
    Ok(message("Server deleted"))
}

/// Stop and delete every server in `?id=a,b,c`. Unknown IDs are skipped.
#[instrument(skip(state, user))]
pub async fn delete_servers(
    State(state): State<AppState>,
    user: Option<CurrentUser>,
    Query(query): Query<BulkDeleteQuery>,
) -> ApiResult<PrettyJson<serde_json::Value>> {
    let Some(raw) = query.id.filter(|s| !s.trim().is_empty()) else {
        return Ok(message("No servers to delete."));
    };
    let ids = parse_id_list(&raw).map_err(ApiError::bad_request)?;

    for &id in &ids {
        let Some(server) = state.meta.get_server(id).await? else {
            debug!(server_id = id, "Skipping unknown server");
            continue;
        };
        stop_and_delete(server.as_ref()).await?;
        info!(
            server_id = id,
            actor = CurrentUser::actor(user.as_ref()),
            "Deleted server"
        );
    }

    Ok(PrettyJson(json!({
        "message": "Deleting servers.",
        "ids": ids,
    })))
}

/// Start a server.
#[instrument(skip(state))]
pub async fn start_server(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<PrettyJson<serde_json::Value>> {
    let server = state.server(id).await?;
    if server.is_running().await? {
        return Ok(message("Server already running."));
    }
    server.start().await?;
    info!(server_id = id, "Started server");
    Ok(message("Server started."))
}

/// Stop a server.
#[instrument(skip(state))]
pub async fn stop_server(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<PrettyJson<serde_json::Value>> {
    let server = state.server(id).await?;
    if !server.is_running().await? {
        return Ok(message("Server already stopped."));
    }
    server.stop().await?;
    info!(server_id = id, "Stopped server");
    Ok(message("Server stopped."))
}

/// The whole log buffer, newest first.
#[instrument(skip(state))]
pub async fn server_logs(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<PrettyJson<Vec<LogLine>>> {
    let server = state.server(id).await?;
    let lines = server
        .get_log(0, -1)
        .await?
        .into_iter()
        .map(|entry| LogLine {
            message: entry.txt,
            timestamp: entry.timestamp,
        })
        .collect();
    Ok(PrettyJson(lines))
}
