//! Remote voice server interface.
//!
//! This module defines the `Meta` and `VirtualServer` traits that abstract the voice
//! server's administrative interface. The HTTP layer only ever talks to these traits,
//! so the same handlers run against a live server or the in-process backend.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      murmur-rest API                        │
//! │                                                             │
//! │   "resolve server id → call VirtualServer → render JSON"    │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!         ┌─────────────┴─────────────┐
//!         │                           │
//!         ▼                           ▼
//! ┌───────────────────┐     ┌───────────────────┐
//! │      RpcMeta      │     │    MemoryMeta     │
//! │                   │     │                   │
//! │ JSON lines over   │     │ In-process server │
//! │ TCP to the admin  │     │ registry (tests,  │
//! │ bridge            │     │ local demos)      │
//! └───────────────────┘     └───────────────────┘
//! ```

mod client;
mod error;
mod memory;

pub use client::RpcMeta;
pub use error::{MurmurError, MurmurResult};
pub use memory::MemoryMeta;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use murmur_rpc::{AclSet, Ban, Channel, LogEntry, Tree, User, UserInfoMap, Version};
use serde::{Deserialize, Serialize};

/// Shared handle to one virtual server.
pub type ServerHandle = Arc<dyn VirtualServer>;

/// The voice server process: a registry of virtual servers.
#[async_trait]
pub trait Meta: Send + Sync {
    /// Resolve a server by ID. `None` when the ID is unknown.
    async fn get_server(&self, id: i32) -> MurmurResult<Option<ServerHandle>>;

    /// Allocate a new virtual server. It starts out stopped with default configuration.
    async fn new_server(&self) -> MurmurResult<ServerHandle>;

    /// Every virtual server, running or not.
    async fn get_all_servers(&self) -> MurmurResult<Vec<ServerHandle>>;

    /// Only the running virtual servers.
    async fn get_booted_servers(&self) -> MurmurResult<Vec<ServerHandle>>;

    /// Configuration every server falls back to for unset keys.
    async fn get_default_conf(&self) -> MurmurResult<BTreeMap<String, String>>;

    async fn get_version(&self) -> MurmurResult<Version>;

    /// Seconds since the voice server process started.
    async fn get_uptime(&self) -> MurmurResult<i64>;
}

/// One virtual server.
///
/// Operations on connected users, channels, ACLs and registrations require the
/// server to be running and fail with `MurmurError::ServerBooted` otherwise.
#[async_trait]
pub trait VirtualServer: Send + Sync {
    fn id(&self) -> i32;

    // -- Lifecycle --

    async fn is_running(&self) -> MurmurResult<bool>;

    /// Start the server. Fails if it is already running.
    async fn start(&self) -> MurmurResult<()>;

    /// Stop the server, disconnecting everyone. Fails if it is not running.
    async fn stop(&self) -> MurmurResult<()>;

    /// Destroy the server. Must only be called on a stopped server.
    async fn delete(&self) -> MurmurResult<()>;

    /// Seconds since the server was started.
    async fn get_uptime(&self) -> MurmurResult<i64>;

    // -- Configuration --

    /// Server-specific value of `key`, empty when unset.
    async fn get_conf(&self, key: &str) -> MurmurResult<String>;

    async fn set_conf(&self, key: &str, value: &str) -> MurmurResult<()>;

    /// Effective configuration (defaults overlaid with server-specific values).
    async fn get_all_conf(&self) -> MurmurResult<BTreeMap<String, String>>;

    async fn set_superuser_password(&self, password: &str) -> MurmurResult<()>;

    // -- Logs --

    /// Log entries `first..=last`, newest first. `last == -1` means through the end.
    async fn get_log(&self, first: i32, last: i32) -> MurmurResult<Vec<LogEntry>>;

    async fn get_log_len(&self) -> MurmurResult<i32>;

    // -- Connected users --

    /// Connected users keyed by session ID.
    async fn get_users(&self) -> MurmurResult<BTreeMap<i32, User>>;

    async fn get_state(&self, session: i32) -> MurmurResult<User>;

    /// Apply mute/deaf/channel/... changes to the session named in `state`.
    async fn set_state(&self, state: User) -> MurmurResult<()>;

    /// Disconnect a session. Fails with `InvalidSession` for stale IDs.
    async fn kick_user(&self, session: i32, reason: &str) -> MurmurResult<()>;

    // -- Registrations --

    /// Registered users keyed by registration ID, filtered by name substring.
    async fn get_registered_users(&self, filter: &str) -> MurmurResult<BTreeMap<i32, String>>;

    async fn get_registration(&self, userid: i32) -> MurmurResult<UserInfoMap>;

    /// Register a user. Returns the new registration ID.
    async fn register_user(&self, info: UserInfoMap) -> MurmurResult<i32>;

    async fn unregister_user(&self, userid: i32) -> MurmurResult<()>;

    // -- Channels --

    /// Channels keyed by channel ID.
    async fn get_channels(&self) -> MurmurResult<BTreeMap<i32, Channel>>;

    /// The channel tree starting at the root channel.
    async fn get_tree(&self) -> MurmurResult<Tree>;

    async fn get_channel_state(&self, channel_id: i32) -> MurmurResult<Channel>;

    /// Create a channel under `parent`. Returns the new channel ID.
    async fn add_channel(&self, name: &str, parent: i32) -> MurmurResult<i32>;

    async fn remove_channel(&self, channel_id: i32) -> MurmurResult<()>;

    async fn get_acl(&self, channel_id: i32) -> MurmurResult<AclSet>;

    /// Replace the ACL entries, groups and inherit flag of a channel.
    async fn set_acl(&self, channel_id: i32, acl: AclSet) -> MurmurResult<()>;

    /// Send a text message to a channel, and to its sub-channels when `tree` is set.
    async fn send_message_channel(&self, channel_id: i32, tree: bool, text: &str)
    -> MurmurResult<()>;

    // -- Bans --

    async fn get_bans(&self) -> MurmurResult<Vec<Ban>>;
}

/// Which implementation of the remote interface to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendMode {
    /// Talk to a live voice server through its admin bridge.
    #[default]
    Rpc,
    /// Keep an in-process server registry (nothing is persisted).
    Memory,
}

/// Remote interface configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MurmurConfig {
    /// Backend to use: "rpc" or "memory".
    pub backend: BackendMode,
    /// Address of the admin bridge (host:port).
    pub address: String,
    /// Shared secret for the admin bridge. Supports `env:VAR_NAME`.
    pub secret: Option<String>,
    /// Connect and read timeout per remote call, in seconds.
    pub timeout_secs: u64,
}

impl Default for MurmurConfig {
    fn default() -> Self {
        Self {
            backend: BackendMode::Rpc,
            address: "127.0.0.1:6503".to_string(),
            secret: None,
            timeout_secs: 10,
        }
    }
}

impl MurmurConfig {
    /// Resolve the shared secret, expanding `env:VAR_NAME` syntax.
    pub fn resolve_secret(&self) -> anyhow::Result<Option<String>> {
        match &self.secret {
            None => Ok(None),
            Some(value) => match value.strip_prefix("env:") {
                Some(var_name) => match std::env::var(var_name) {
                    Ok(secret) if !secret.is_empty() => Ok(Some(secret)),
                    Ok(_) => anyhow::bail!("environment variable '{var_name}' is empty"),
                    Err(_) => anyhow::bail!("environment variable '{var_name}' not found"),
                },
                None => Ok(Some(value.clone())),
            },
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

/// Build the configured remote interface.
pub fn connect(config: &MurmurConfig) -> anyhow::Result<Arc<dyn Meta>> {
    let meta: Arc<dyn Meta> = match config.backend {
        BackendMode::Rpc => Arc::new(RpcMeta::new(
            config.address.clone(),
            config.resolve_secret()?,
            config.timeout(),
        )),
        BackendMode::Memory => Arc::new(MemoryMeta::new()),
    };
    Ok(meta)
}
