//! Unified API error handling.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, warn};

use super::response::PrettyJson;
use crate::murmur::MurmurError;

/// API error type. Every variant renders as `{"message": ...}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),

    /// Not-found outcome some sub-resource routes report as a server error.
    #[error("{0}")]
    NotFoundInternal(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    /// The plain `{"message": "Not Found"}` answer for unknown server IDs.
    pub fn server_not_found() -> Self {
        Self::NotFound("Not Found".to_string())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn not_found_internal(msg: impl Into<String>) -> Self {
        Self::NotFoundInternal(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::NotFoundInternal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) | Self::NotFoundInternal(_) => "NOT_FOUND",
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.error_code();
        let message = self.to_string();

        match &self {
            ApiError::Internal(msg) => {
                error!(error_code = code, message = %msg, "API error");
            }
            ApiError::NotFoundInternal(msg) => {
                warn!(error_code = code, message = %msg, "Not found (legacy 500)");
            }
            _ => {
                debug!(error_code = code, message = %message, "Client error");
            }
        }

        (status, PrettyJson(ErrorResponse { message })).into_response()
    }
}

impl From<MurmurError> for ApiError {
    fn from(err: MurmurError) -> Self {
        match err {
            MurmurError::InvalidServer(_) => ApiError::server_not_found(),
            MurmurError::InvalidChannel(_) => ApiError::not_found("Channel Not Found"),
            MurmurError::InvalidUser(_) => ApiError::not_found("User Not Found"),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
