//! JSONP wrapping for the public routes.

use axum::{
    body::{Body, to_bytes},
    extract::{Query, Request},
    http::{HeaderValue, Uri, header::CONTENT_TYPE},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::{debug, error};

use super::error::ApiError;
use crate::util::is_valid_callback;

/// Largest body that will be wrapped.
const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

#[derive(Debug, Default, Deserialize)]
struct JsonpQuery {
    callback: Option<String>,
}

/// Decoded `callback` query parameter, if any.
fn callback_param(uri: &Uri) -> Option<String> {
    Query::<JsonpQuery>::try_from_uri(uri)
        .ok()
        .and_then(|Query(query)| query.callback)
}

/// Wrap JSON responses as `callback(<json>)` when a `callback` query parameter is given.
pub async fn jsonp_middleware(req: Request, next: Next) -> Response {
    let Some(callback) = callback_param(req.uri()).filter(|c| !c.is_empty()) else {
        return next.run(req).await;
    };

    if !is_valid_callback(&callback) {
        debug!(callback = %callback, "Rejected JSONP callback");
        return ApiError::bad_request("Invalid callback name.").into_response();
    }

    let response = next.run(req).await;
    let (mut parts, body) = response.into_parts();
    let bytes = match to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(err) => {
            error!("Failed to buffer response for JSONP: {}", err);
            return ApiError::internal("Failed to render response").into_response();
        }
    };

    let mut wrapped = Vec::with_capacity(callback.len() + bytes.len() + 2);
    wrapped.extend_from_slice(callback.as_bytes());
    wrapped.push(b'(');
    wrapped.extend_from_slice(&bytes);
    wrapped.push(b')');

    parts.headers.remove(axum::http::header::CONTENT_LENGTH);
    parts.headers.insert(
        CONTENT_TYPE,
        HeaderValue::from_static("application/javascript"),
    );
    Response::from_parts(parts, Body::from(wrapped))
}
