//! JSON response rendering.
//!
//! Every body is pretty-printed with four-space indentation and sorted object keys.
//! Keys that are all integers (session, channel and user IDs) sort numerically.

use axum::{
    http::{HeaderValue, StatusCode, header::CONTENT_TYPE},
    response::{IntoResponse, Response},
};
use std::cmp::Ordering;

use serde::Serialize;
use serde_json::{Map, Value, json};
use tracing::error;

/// Pretty, key-sorted JSON response.
#[derive(Debug, Clone)]
pub struct PrettyJson<T>(pub T);

/// A `{"message": ...}` body.
pub fn message(msg: impl Into<String>) -> PrettyJson<Value> {
    PrettyJson(json!({ "message": msg.into() }))
}

fn compare_keys(a: &str, b: &str) -> Ordering {
    match (a.parse::<i64>(), b.parse::<i64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        _ => a.cmp(b),
    }
}

/// Recursively order object keys.
pub fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| compare_keys(&a.0, &b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, sort_keys(v)))
                    .collect::<Map<String, Value>>(),
            )
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}

/// Serialize `value` the way every response body is written.
pub fn to_pretty_string<T: Serialize>(value: &T) -> serde_json::Result<String> {
    let value = sort_keys(serde_json::to_value(value)?);
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut serializer)?;
    // serde_json only writes valid UTF-8.
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

impl<T: Serialize> IntoResponse for PrettyJson<T> {
    fn into_response(self) -> Response {
        match to_pretty_string(&self.0) {
            Ok(body) => (
                [(CONTENT_TYPE, HeaderValue::from_static("application/json"))],
                body,
            )
                .into_response(),
            Err(err) => {
                error!("Failed to serialize response: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    [(CONTENT_TYPE, HeaderValue::from_static("application/json"))],
                    "{\n    \"message\": \"Internal Server Error\"\n}",
                )
                    .into_response()
            }
        }
    }
}
