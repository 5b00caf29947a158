//! Test utilities and common setup.

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{HeaderMap, Method, Request, StatusCode, header},
};
use base64::Engine;
use murmur_rest::api::{self, AppState};
use murmur_rest::auth::{ApiUser, AuthConfig, AuthState};
use murmur_rest::murmur::MemoryMeta;
use serde_json::Value;
use tower::ServiceExt;

pub const TEST_USER: &str = "admin";
pub const TEST_PASSWORD: &str = "correct horse";

/// Create a test application backed by an in-process registry, auth disabled.
pub fn test_app() -> (Router, MemoryMeta) {
    let meta = MemoryMeta::new();
    let state = AppState::new(Arc::new(meta.clone()), AuthState::disabled());
    (api::create_router(state), meta)
}

/// Create a test application that requires Basic credentials.
pub fn test_app_with_auth() -> (Router, MemoryMeta) {
    // Minimum cost keeps the tests fast.
    let password_hash = bcrypt::hash(TEST_PASSWORD, 4).expect("Failed to hash password");
    let config = AuthConfig {
        enabled: true,
        users: vec![ApiUser {
            username: TEST_USER.to_string(),
            password_hash,
        }],
        ..AuthConfig::default()
    };

    let meta = MemoryMeta::new();
    let state = AppState::new(Arc::new(meta.clone()), AuthState::new(config));
    (api::create_router(state), meta)
}

/// `Authorization` header value for the given credentials.
pub fn basic_auth(username: &str, password: &str) -> String {
    let encoded =
        base64::engine::general_purpose::STANDARD.encode(format!("{username}:{password}"));
    format!("Basic {encoded}")
}

/// Encode form fields as `application/x-www-form-urlencoded`.
pub fn form_body(fields: &[(&str, &str)]) -> String {
    fields
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

/// A response reduced to what the tests look at.
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub text: String,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_str(&self.text)
            .unwrap_or_else(|e| panic!("response is not JSON ({e}): {}", self.text))
    }
}

/// Send a request, optionally with form fields and an Authorization header.
pub async fn send_with(
    app: &Router,
    method: Method,
    uri: &str,
    form: Option<&[(&str, &str)]>,
    authorization: Option<&str>,
) -> TestResponse {
    let mut builder = Request::builder().uri(uri).method(method);
    if let Some(value) = authorization {
        builder = builder.header(header::AUTHORIZATION, value);
    }

    let body = match form {
        Some(fields) => {
            builder = builder.header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
            Body::from(form_body(fields))
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();

    TestResponse {
        status,
        headers,
        text: String::from_utf8(bytes.to_vec()).unwrap(),
    }
}

pub async fn get(app: &Router, uri: &str) -> TestResponse {
    send_with(app, Method::GET, uri, None, None).await
}

pub async fn post(app: &Router, uri: &str, form: &[(&str, &str)]) -> TestResponse {
    send_with(app, Method::POST, uri, Some(form), None).await
}

/// POST without a body.
pub async fn post_empty(app: &Router, uri: &str) -> TestResponse {
    send_with(app, Method::POST, uri, None, None).await
}

pub async fn delete(app: &Router, uri: &str) -> TestResponse {
    send_with(app, Method::DELETE, uri, None, None).await
}

/// Create a running server through the API and return its ID.
pub async fn create_server(app: &Router, form: &[(&str, &str)]) -> i64 {
    let response = post(app, "/servers", form).await;
    assert_eq!(response.status, StatusCode::OK, "{}", response.text);
    response.json()["id"].as_i64().unwrap()
}
