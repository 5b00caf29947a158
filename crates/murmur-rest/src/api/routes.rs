//! API route definitions.

use axum::http::{HeaderValue, Method, header};
use axum::{
    Router, middleware,
    routing::{delete, get, post},
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::auth::auth_middleware;

use super::handlers;
use super::jsonp::jsonp_middleware;
use super::state::AppState;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    let cors = build_cors_layer(&state);

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_request(DefaultOnRequest::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    let auth_state = state.auth.clone();

    // Administrative routes (Basic auth when enabled)
    let protected_routes = Router::new()
        // Servers
        .route(
            "/servers",
            get(handlers::list_servers).post(handlers::create_server),
        )
        .route("/servers/delete", delete(handlers::delete_servers))
        .route(
            "/servers/{id}",
            get(handlers::get_server).delete(handlers::delete_server),
        )
        .route("/servers/{id}/start", post(handlers::start_server))
        .route("/servers/{id}/stop", post(handlers::stop_server))
        .route("/servers/{id}/logs", get(handlers::server_logs))
        // Users
        .route(
            "/servers/{id}/user",
            get(handlers::list_users).post(handlers::create_user),
        )
        .route(
            "/servers/{id}/user/{user}",
            get(handlers::get_user).delete(handlers::delete_user),
        )
        .route("/servers/{id}/user/{user}/mute", post(handlers::mute_user))
        .route(
            "/servers/{id}/user/{user}/unmute",
            post(handlers::unmute_user),
        )
        // Channels
        .route(
            "/servers/{id}/channels",
            get(handlers::list_channels).post(handlers::create_channel),
        )
        .route(
            "/servers/{id}/channels/{channel}",
            get(handlers::get_channel).delete(handlers::delete_channel),
        )
        .route(
            "/servers/{id}/channels/{channel}/acl",
            get(handlers::channel_acl),
        )
        .route(
            "/servers/{id}/channels/{channel}/password",
            post(handlers::set_channel_password),
        )
        // Configuration
        .route(
            "/servers/{id}/conf",
            get(handlers::get_conf).post(handlers::set_conf),
        )
        // Moderation
        .route("/servers/{id}/bans", get(handlers::list_bans))
        .route("/servers/{id}/sendmessage", post(handlers::send_message))
        .route(
            "/servers/{id}/setsuperuserpw",
            post(handlers::set_superuser_password),
        )
        .route("/servers/{id}/kickuser", post(handlers::kick_user))
        // Stats
        .route("/stats", get(handlers::stats))
        .layer(middleware::from_fn_with_state(auth_state, auth_middleware))
        .with_state(state.clone());

    // Public routes (no authentication)
    let public_routes = Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/cvp/{id}",
            get(handlers::cvp).layer(middleware::from_fn(jsonp_middleware)),
        )
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(cors)
        .layer(trace_layer)
}

/// Build the CORS layer based on configuration.
///
/// With no configured origins any origin may call the API (without credentials).
fn build_cors_layer(state: &AppState) -> CorsLayer {
    let allowed_origins = state.auth.allowed_origins();

    let methods = [Method::GET, Method::POST, Method::DELETE, Method::OPTIONS];

    let headers = [
        header::AUTHORIZATION,
        header::CONTENT_TYPE,
        header::ACCEPT,
        header::ORIGIN,
    ];

    if allowed_origins.is_empty() {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(headers);
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| {
            origin.parse::<HeaderValue>().ok().or_else(|| {
                tracing::warn!("CORS: Invalid origin in config: {}", origin);
                None
            })
        })
        .collect();

    if origins.is_empty() {
        tracing::error!("CORS: All configured origins are invalid!");
        CorsLayer::new().allow_origin(HeaderValue::from_static("null"))
    } else {
        tracing::info!("CORS: Allowing {} origin(s)", origins.len());
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(methods)
            .allow_headers(headers)
            .allow_credentials(true)
    }
}
