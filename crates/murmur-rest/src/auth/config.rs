//! Authentication configuration.

use serde::{Deserialize, Serialize};

/// Authentication configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Require HTTP Basic credentials on the administrative routes.
    pub enabled: bool,

    /// Realm sent in the `WWW-Authenticate` challenge.
    pub realm: String,

    /// Users allowed to call the API.
    /// Passwords are stored as bcrypt hashes (see `murmur-rest hash-password`).
    pub users: Vec<ApiUser>,

    /// Allowed CORS origins. Empty allows any origin.
    pub allowed_origins: Vec<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            realm: "murmur-rest".to_string(),
            users: Vec::new(),
            allowed_origins: Vec::new(),
        }
    }
}

impl AuthConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if !self.enabled {
            return Ok(());
        }

        if self.users.is_empty() {
            return Err(ConfigValidationError::NoUsers);
        }

        for user in &self.users {
            if user.username.is_empty() {
                return Err(ConfigValidationError::EmptyUsername);
            }
            if !user.password_hash.starts_with("$2") {
                return Err(ConfigValidationError::InvalidHash(user.username.clone()));
            }
        }

        Ok(())
    }

    /// Find the user matching `username` whose hash accepts `password`.
    pub fn authenticate(&self, username: &str, password: &str) -> Option<&ApiUser> {
        self.users
            .iter()
            .find(|u| u.username == username && u.verify_password(password))
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigValidationError {
    /// Authentication is enabled but nobody could log in.
    NoUsers,
    /// A user entry has no username.
    EmptyUsername,
    /// A password hash is not a bcrypt hash.
    InvalidHash(String),
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoUsers => write!(
                f,
                "auth.enabled is true but no auth.users are configured. Add a user or disable auth."
            ),
            Self::EmptyUsername => write!(f, "auth.users entries need a non-empty username."),
            Self::InvalidHash(user) => write!(
                f,
                "password_hash for user '{}' is not a bcrypt hash. Generate one with `murmur-rest hash-password`.",
                user
            ),
        }
    }
}

impl std::error::Error for ConfigValidationError {}

/// A user allowed to call the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiUser {
    pub username: String,
    /// Password hash (bcrypt).
    pub password_hash: String,
}

impl ApiUser {
    /// Verify a password against this user's hash.
    pub fn verify_password(&self, password: &str) -> bool {
        bcrypt::verify(password, &self.password_hash).unwrap_or(false)
    }
}
