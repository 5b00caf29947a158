//! Public channel viewer handler.

use axum::extract::{Path, State};
use tracing::{debug, instrument};

use crate::api::error::{ApiError, ApiResult};
use crate::api::response::PrettyJson;
use crate::api::state::AppState;
use crate::cvp::CvpDocument;
use crate::util::{conf_flag, server_conf, server_port};

/// Channel viewer document of a server that opted in through `x_cvp`.
#[instrument(skip(state))]
pub async fn cvp(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<PrettyJson<CvpDocument>> {
    let server = state.server(id).await?;
    let meta = state.meta.as_ref();

    if !conf_flag(&server_conf(meta, server.as_ref(), "x_cvp").await?) {
        debug!(server_id = id, "CVP requested for server without x_cvp");
        return Err(ApiError::forbidden("CVP Disabled"));
    }

    let tree = server.get_tree().await?;
    let name = server_conf(meta, server.as_ref(), "registername").await?;
    let hostname = server_conf(meta, server.as_ref(), "registerhostname").await?;
    let port = server_port(meta, server.as_ref()).await?;
    let uptime = server.get_uptime().await?;

    Ok(PrettyJson(CvpDocument::new(
        id, &tree, &name, &hostname, port, uptime,
    )))
}
