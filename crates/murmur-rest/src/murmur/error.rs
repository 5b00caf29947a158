//! Remote service error types.

use murmur_rpc::{Fault, FaultKind};
use thiserror::Error;

/// Result type for remote operations.
pub type MurmurResult<T> = Result<T, MurmurError>;

/// Errors raised by the voice server or on the way to it.
#[derive(Debug, Error)]
pub enum MurmurError {
    /// The server ID does not resolve to a virtual server.
    #[error("invalid server: {0}")]
    InvalidServer(String),

    /// The server is in the wrong running state for the operation.
    #[error("server booted state mismatch: {0}")]
    ServerBooted(String),

    /// The session ID does not belong to a connected user.
    #[error("invalid session: {0}")]
    InvalidSession(String),

    /// The channel ID does not exist.
    #[error("invalid channel: {0}")]
    InvalidChannel(String),

    /// The registration ID does not exist or the registration was rejected.
    #[error("invalid user: {0}")]
    InvalidUser(String),

    /// The admin bridge rejected our shared secret.
    #[error("invalid secret for admin interface")]
    InvalidSecret,

    /// Could not reach the admin bridge.
    #[error("failed to reach admin interface at {address}: {message}")]
    Transport { address: String, message: String },

    /// The admin bridge sent something we could not parse.
    #[error("malformed response from admin interface: {0}")]
    Protocol(String),

    /// Any other failure reported by the remote side.
    #[error("remote error: {0}")]
    Remote(String),
}

impl MurmurError {
    /// Whether the error means an ID did not resolve.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::InvalidServer(_) | Self::InvalidChannel(_) | Self::InvalidUser(_)
        )
    }
}

impl From<Fault> for MurmurError {
    fn from(fault: Fault) -> Self {
        let Fault { kind, message } = fault;
        match kind {
            FaultKind::InvalidServer => Self::InvalidServer(message),
            FaultKind::ServerBooted => Self::ServerBooted(message),
            FaultKind::InvalidSession => Self::InvalidSession(message),
            FaultKind::InvalidChannel => Self::InvalidChannel(message),
            FaultKind::InvalidUser => Self::InvalidUser(message),
            FaultKind::InvalidSecret => Self::InvalidSecret,
            FaultKind::Other => Self::Remote(message),
        }
    }
}
