//! Application state shared across handlers.

use std::sync::Arc;

use crate::auth::AuthState;
use crate::murmur::{Meta, ServerHandle};

use super::error::{ApiError, ApiResult};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// The voice server's administrative interface.
    pub meta: Arc<dyn Meta>,
    /// Authentication state.
    pub auth: AuthState,
}

impl AppState {
    pub fn new(meta: Arc<dyn Meta>, auth: AuthState) -> Self {
        Self { meta, auth }
    }

    /// Resolve a server, answering 404 `Not Found` for unknown IDs.
    pub async fn server(&self, id: i32) -> ApiResult<ServerHandle> {
        self.meta
            .get_server(id)
            .await?
            .ok_or_else(ApiError::server_not_found)
    }

    /// Resolve a server, answering 500 `No Server Found for ID <id>` for unknown IDs.
    pub async fn server_or_internal(&self, id: i32) -> ApiResult<ServerHandle> {
        self.meta
            .get_server(id)
            .await?
            .ok_or_else(|| ApiError::not_found_internal(format!("No Server Found for ID {id}")))
    }
}
