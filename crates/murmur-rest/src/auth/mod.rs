//! Authentication module.
//!
//! HTTP Basic authentication against a configured list of users with bcrypt
//! password hashes. When disabled, every route is open.

mod config;
mod error;
mod middleware;

#[allow(unused_imports)]
pub use config::{ApiUser, AuthConfig, ConfigValidationError};
pub use error::AuthError;
pub use middleware::{AuthState, CurrentUser, auth_middleware};
