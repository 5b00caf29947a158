//! Miscellaneous handlers.

use serde::Serialize;

use crate::api::response::PrettyJson;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Health check endpoint.
pub async fn health() -> PrettyJson<HealthResponse> {
    PrettyJson(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
