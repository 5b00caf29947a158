//! Authentication middleware.

use axum::{
    extract::{FromRequestParts, OptionalFromRequestParts, State},
    http::{header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};
use base64::Engine;
use log::{debug, warn};
use std::convert::Infallible;
use std::sync::Arc;

use super::{AuthConfig, AuthError};

/// Extract `(username, password)` from a Basic Authorization header value.
fn basic_credentials_from_header(header_value: &str) -> Result<(String, String), AuthError> {
    let mut parts = header_value.split_whitespace();
    let scheme = parts.next().ok_or(AuthError::InvalidAuthHeader)?;

    if !scheme.eq_ignore_ascii_case("basic") {
        return Err(AuthError::InvalidAuthHeader);
    }

    let encoded = parts.next().ok_or(AuthError::InvalidAuthHeader)?;
    if parts.next().is_some() {
        return Err(AuthError::InvalidAuthHeader);
    }

    let decoded = base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .map_err(|_| AuthError::InvalidAuthHeader)?;
    let decoded = String::from_utf8(decoded).map_err(|_| AuthError::InvalidAuthHeader)?;

    let (username, password) = decoded
        .split_once(':')
        .ok_or(AuthError::InvalidAuthHeader)?;

    Ok((username.to_string(), password.to_string()))
}

/// Authentication state shared across handlers.
#[derive(Clone)]
pub struct AuthState {
    config: Arc<AuthConfig>,
}

impl AuthState {
    /// Create new auth state from config.
    pub fn new(config: AuthConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    /// Auth state that lets every request through.
    pub fn disabled() -> Self {
        Self::new(AuthConfig::default())
    }

    /// Check if credentials are required.
    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn realm(&self) -> &str {
        &self.config.realm
    }

    /// Get allowed CORS origins from config.
    pub fn allowed_origins(&self) -> &[String] {
        &self.config.allowed_origins
    }

    /// Check a Basic Authorization header value.
    pub fn validate_header(&self, header_value: &str) -> Result<CurrentUser, AuthError> {
        let (username, password) = basic_credentials_from_header(header_value)?;
        match self.config.authenticate(&username, &password) {
            Some(user) => Ok(CurrentUser {
                username: user.username.clone(),
            }),
            None => {
                warn!("Rejected credentials for user '{}'", username);
                Err(AuthError::InvalidCredentials)
            }
        }
    }
}

/// Authenticated user extracted from request.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub username: String,
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or(AuthError::MissingAuthHeader)
    }
}

/// `None` when the gate is disabled.
impl<S> OptionalFromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        Ok(parts.extensions.get::<CurrentUser>().cloned())
    }
}

impl CurrentUser {
    /// Name for audit log lines.
    pub fn actor(user: Option<&CurrentUser>) -> &str {
        user.map(|u| u.username.as_str()).unwrap_or("anonymous")
    }
}

/// Authentication middleware.
///
/// Validates Basic credentials and injects `CurrentUser` into request extensions.
/// Rejections carry a `WWW-Authenticate` challenge. Does nothing when auth is disabled.
pub async fn auth_middleware(
    State(auth): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    if !auth.is_enabled() {
        return next.run(req).await;
    }

    let header = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let user = match header {
        Some(value) => auth.validate_header(value),
        None => Err(AuthError::MissingAuthHeader),
    };

    match user {
        Ok(user) => {
            debug!("Authenticated request as '{}'", user.username);
            req.extensions_mut().insert(user);
            next.run(req).await
        }
        Err(err) => err.challenge(auth.realm()),
    }
}
