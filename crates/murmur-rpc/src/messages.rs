//! Wire envelope for the admin bridge.
//!
//! The protocol is newline-delimited JSON over a TCP stream. Every request carries a
//! correlation `id` and a `method` tag; the bridge answers with exactly one response
//! line carrying the same `id` and either a `result` or a `fault`.
//!
//! ```text
//! -> {"id":7,"method":"server.set_conf","server_id":1,"key":"users","value":"50"}
//! <- {"id":7,"result":null}
//! -> {"id":8,"method":"server.kick_user","server_id":1,"session":99,"reason":"bye"}
//! <- {"id":8,"fault":{"kind":"invalid_session","message":"no such session"}}
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::{Acl, Group, User, UserInfoMap};

// ============================================================================
// Requests
// ============================================================================

/// A request sent to the admin bridge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcRequest {
    /// Correlation ID, echoed in the response.
    pub id: u64,

    /// Shared secret, when the bridge requires one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,

    /// The call payload.
    #[serde(flatten)]
    pub call: Call,
}

/// All remote calls, tagged by `method`.
///
/// `meta.*` calls address the server process, `server.*` calls address one virtual
/// server by `server_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method")]
pub enum Call {
    // -- Server registry --
    /// Resolve a server ID. Result: the ID, or null when unknown.
    #[serde(rename = "meta.get_server")]
    GetServer { id: i32 },

    /// Allocate a new (stopped) server. Result: its ID.
    #[serde(rename = "meta.new_server")]
    NewServer,

    /// Result: IDs of every server.
    #[serde(rename = "meta.get_all_servers")]
    GetAllServers,

    /// Result: IDs of running servers.
    #[serde(rename = "meta.get_booted_servers")]
    GetBootedServers,

    /// Result: the default configuration map.
    #[serde(rename = "meta.get_default_conf")]
    GetDefaultConf,

    /// Result: a `Version`.
    #[serde(rename = "meta.get_version")]
    GetVersion,

    /// Result: seconds since the server process started.
    #[serde(rename = "meta.get_uptime")]
    GetMetaUptime,

    // -- Lifecycle --
    #[serde(rename = "server.is_running")]
    IsRunning { server_id: i32 },

    #[serde(rename = "server.start")]
    Start { server_id: i32 },

    #[serde(rename = "server.stop")]
    Stop { server_id: i32 },

    #[serde(rename = "server.delete")]
    Delete { server_id: i32 },

    #[serde(rename = "server.get_uptime")]
    GetUptime { server_id: i32 },

    // -- Configuration --
    #[serde(rename = "server.get_conf")]
    GetConf { server_id: i32, key: String },

    #[serde(rename = "server.set_conf")]
    SetConf {
        server_id: i32,
        key: String,
        value: String,
    },

    #[serde(rename = "server.get_all_conf")]
    GetAllConf { server_id: i32 },

    #[serde(rename = "server.set_superuser_password")]
    SetSuperuserPassword { server_id: i32, password: String },

    // -- Logs --
    /// Entries `first..=last`; `last == -1` means through the end.
    #[serde(rename = "server.get_log")]
    GetLog {
        server_id: i32,
        first: i32,
        last: i32,
    },

    #[serde(rename = "server.get_log_len")]
    GetLogLen { server_id: i32 },

    // -- Users and sessions --
    /// Result: map of session ID to `User`.
    #[serde(rename = "server.get_users")]
    GetUsers { server_id: i32 },

    #[serde(rename = "server.get_state")]
    GetState { server_id: i32, session: i32 },

    #[serde(rename = "server.set_state")]
    SetState { server_id: i32, state: User },

    #[serde(rename = "server.kick_user")]
    KickUser {
        server_id: i32,
        session: i32,
        reason: String,
    },

    // -- Registrations --
    /// Result: map of registration ID to name.
    #[serde(rename = "server.get_registered_users")]
    GetRegisteredUsers { server_id: i32, filter: String },

    #[serde(rename = "server.get_registration")]
    GetRegistration { server_id: i32, userid: i32 },

    /// Result: the new registration ID.
    #[serde(rename = "server.register_user")]
    RegisterUser { server_id: i32, info: UserInfoMap },

    #[serde(rename = "server.unregister_user")]
    UnregisterUser { server_id: i32, userid: i32 },

    // -- Channels --
    /// Result: map of channel ID to `Channel`.
    #[serde(rename = "server.get_channels")]
    GetChannels { server_id: i32 },

    #[serde(rename = "server.get_tree")]
    GetTree { server_id: i32 },

    #[serde(rename = "server.get_channel_state")]
    GetChannelState { server_id: i32, channel_id: i32 },

    /// Result: the new channel ID.
    #[serde(rename = "server.add_channel")]
    AddChannel {
        server_id: i32,
        name: String,
        parent: i32,
    },

    #[serde(rename = "server.remove_channel")]
    RemoveChannel { server_id: i32, channel_id: i32 },

    #[serde(rename = "server.get_acl")]
    GetAcl { server_id: i32, channel_id: i32 },

    #[serde(rename = "server.set_acl")]
    SetAcl {
        server_id: i32,
        channel_id: i32,
        acls: Vec<Acl>,
        groups: Vec<Group>,
        inherit: bool,
    },

    #[serde(rename = "server.send_message_channel")]
    SendMessageChannel {
        server_id: i32,
        channel_id: i32,
        tree: bool,
        text: String,
    },

    // -- Bans --
    #[serde(rename = "server.get_bans")]
    GetBans { server_id: i32 },
}

impl Call {
    /// Wire name of the call, as written in the `method` field.
    pub fn method(&self) -> &'static str {
        match self {
            Call::GetServer { .. } => "meta.get_server",
            Call::NewServer => "meta.new_server",
            Call::GetAllServers => "meta.get_all_servers",
            Call::GetBootedServers => "meta.get_booted_servers",
            Call::GetDefaultConf => "meta.get_default_conf",
            Call::GetVersion => "meta.get_version",
            Call::GetMetaUptime => "meta.get_uptime",
            Call::IsRunning { .. } => "server.is_running",
            Call::Start { .. } => "server.start",
            Call::Stop { .. } => "server.stop",
            Call::Delete { .. } => "server.delete",
            Call::GetUptime { .. } => "server.get_uptime",
            Call::GetConf { .. } => "server.get_conf",
            Call::SetConf { .. } => "server.set_conf",
            Call::GetAllConf { .. } => "server.get_all_conf",
            Call::SetSuperuserPassword { .. } => "server.set_superuser_password",
            Call::GetLog { .. } => "server.get_log",
            Call::GetLogLen { .. } => "server.get_log_len",
            Call::GetUsers { .. } => "server.get_users",
            Call::GetState { .. } => "server.get_state",
            Call::SetState { .. } => "server.set_state",
            Call::KickUser { .. } => "server.kick_user",
            Call::GetRegisteredUsers { .. } => "server.get_registered_users",
            Call::GetRegistration { .. } => "server.get_registration",
            Call::RegisterUser { .. } => "server.register_user",
            Call::UnregisterUser { .. } => "server.unregister_user",
            Call::GetChannels { .. } => "server.get_channels",
            Call::GetTree { .. } => "server.get_tree",
            Call::GetChannelState { .. } => "server.get_channel_state",
            Call::AddChannel { .. } => "server.add_channel",
            Call::RemoveChannel { .. } => "server.remove_channel",
            Call::GetAcl { .. } => "server.get_acl",
            Call::SetAcl { .. } => "server.set_acl",
            Call::SendMessageChannel { .. } => "server.send_message_channel",
            Call::GetBans { .. } => "server.get_bans",
        }
    }
}

// ============================================================================
// Responses
// ============================================================================

/// A response from the admin bridge.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RpcResponse {
    /// Correlation ID of the request this answers.
    pub id: u64,

    /// Call result, present on success. `null` for calls without a return value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,

    /// Failure reported by the remote side.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fault: Option<Fault>,
}

impl RpcResponse {
    /// Build a success response.
    pub fn ok(id: u64, result: Value) -> Self {
        Self {
            id,
            result: Some(result),
            fault: None,
        }
    }

    /// Build a fault response.
    pub fn fault(id: u64, kind: FaultKind, message: impl Into<String>) -> Self {
        Self {
            id,
            result: None,
            fault: Some(Fault {
                kind,
                message: message.into(),
            }),
        }
    }

    /// Split into the result value or the fault.
    ///
    /// A response with neither field is a success with a `null` result.
    pub fn into_result(self) -> Result<Value, Fault> {
        match self.fault {
            Some(fault) => Err(fault),
            None => Ok(self.result.unwrap_or(Value::Null)),
        }
    }
}

/// A failure raised by the voice server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fault {
    pub kind: FaultKind,
    #[serde(default)]
    pub message: String,
}

/// Categories of remote failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultKind {
    /// The server ID does not exist (any more).
    InvalidServer,
    /// The server is in the wrong running state for the call.
    ServerBooted,
    /// The session ID does not belong to a connected user.
    InvalidSession,
    InvalidChannel,
    InvalidUser,
    /// The shared secret was missing or wrong.
    InvalidSecret,
    /// Anything the bridge could not classify.
    #[serde(other)]
    Other,
}
