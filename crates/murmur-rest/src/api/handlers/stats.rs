//! Aggregate statistics.

use axum::extract::State;
use serde::Serialize;
use tracing::instrument;

use crate::api::error::ApiResult;
use crate::api::response::PrettyJson;
use crate::api::state::AppState;

#[derive(Debug, Serialize)]
pub struct Stats {
    pub all_servers: usize,
    pub booted_servers: usize,
    /// Connected users across running servers.
    pub users_online: usize,
    pub murmur_version: String,
    #[serde(rename = "murmur-rest_version")]
    pub murmur_rest_version: &'static str,
    pub uptime: i64,
}

/// Counters across every server.
#[instrument(skip(state))]
pub async fn stats(State(state): State<AppState>) -> ApiResult<PrettyJson<Stats>> {
    let all = state.meta.get_all_servers().await?;
    let booted = state.meta.get_booted_servers().await?;

    let mut users_online = 0;
    for server in &booted {
        users_online += server.get_users().await?.len();
    }

    Ok(PrettyJson(Stats {
        all_servers: all.len(),
        booted_servers: booted.len(),
        users_online,
        murmur_version: state.meta.get_version().await?.text,
        murmur_rest_version: env!("CARGO_PKG_VERSION"),
        uptime: state.meta.get_uptime().await?,
    }))
}
