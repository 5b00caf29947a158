//! Client for the voice server's admin bridge.
//!
//! Each call opens a TCP connection, writes one JSON request line and reads one
//! JSON response line. Calls are attempted once; there is no retry.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use murmur_rpc::{
    AclSet, Ban, Call, Channel, LogEntry, RpcRequest, RpcResponse, Tree, User, UserInfoMap,
    Version,
};
use serde::de::DeserializeOwned;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::time::timeout;

use super::{Meta, MurmurError, MurmurResult, ServerHandle, VirtualServer};

/// Connection details shared by the meta client and every server handle.
#[derive(Debug)]
struct RpcClient {
    address: String,
    secret: Option<String>,
    timeout: Duration,
    next_id: AtomicU64,
}

impl RpcClient {
    fn transport_error(&self, message: impl ToString) -> MurmurError {
        MurmurError::Transport {
            address: self.address.clone(),
            message: message.to_string(),
        }
    }

    /// Send a call and decode its result.
    async fn call<T: DeserializeOwned>(&self, call: Call) -> MurmurResult<T> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let method = call.method();
        debug!("rpc #{id} -> {method}");

        let request = RpcRequest {
            id,
            secret: self.secret.clone(),
            call,
        };
        let mut line = serde_json::to_string(&request)
            .map_err(|e| MurmurError::Protocol(format!("serializing {method}: {e}")))?;
        line.push('\n');

        let response = timeout(self.timeout, self.exchange(&line))
            .await
            .map_err(|_| self.transport_error(format!("{method} timed out after {:?}", self.timeout)))??;

        let response: RpcResponse = serde_json::from_str(&response)
            .map_err(|e| MurmurError::Protocol(format!("parsing {method} response: {e}")))?;
        if response.id != id {
            return Err(MurmurError::Protocol(format!(
                "response id {} does not match request id {id}",
                response.id
            )));
        }

        let value = response.into_result().map_err(|fault| {
            warn!("rpc #{id} {method} failed: {:?} {}", fault.kind, fault.message);
            MurmurError::from(fault)
        })?;

        serde_json::from_value(value)
            .map_err(|e| MurmurError::Protocol(format!("decoding {method} result: {e}")))
    }

    /// Write one request line and read one response line.
    async fn exchange(&self, line: &str) -> MurmurResult<String> {
        let mut stream = TcpStream::connect(&self.address)
            .await
            .map_err(|e| self.transport_error(e))?;

        stream
            .write_all(line.as_bytes())
            .await
            .map_err(|e| self.transport_error(e))?;

        let mut reader = BufReader::new(stream);
        let mut response = String::new();
        let read = reader
            .read_line(&mut response)
            .await
            .map_err(|e| self.transport_error(e))?;
        if read == 0 {
            return Err(self.transport_error("connection closed before response"));
        }

        Ok(response)
    }
}

/// `Meta` implementation backed by the admin bridge.
#[derive(Debug, Clone)]
pub struct RpcMeta {
    client: Arc<RpcClient>,
}

impl RpcMeta {
    /// Create a client for the bridge at `address` (host:port).
    pub fn new(address: impl Into<String>, secret: Option<String>, timeout: Duration) -> Self {
        Self {
            client: Arc::new(RpcClient {
                address: address.into(),
                secret,
                timeout,
                next_id: AtomicU64::new(1),
            }),
        }
    }

    fn handle(&self, id: i32) -> ServerHandle {
        Arc::new(RpcServer {
            id,
            client: self.client.clone(),
        })
    }
}

#[async_trait]
impl Meta for RpcMeta {
    async fn get_server(&self, id: i32) -> MurmurResult<Option<ServerHandle>> {
        let found: Option<i32> = self.client.call(Call::GetServer { id }).await?;
        Ok(found.map(|id| self.handle(id)))
    }

    async fn new_server(&self) -> MurmurResult<ServerHandle> {
        let id: i32 = self.client.call(Call::NewServer).await?;
        Ok(self.handle(id))
    }

    async fn get_all_servers(&self) -> MurmurResult<Vec<ServerHandle>> {
        let ids: Vec<i32> = self.client.call(Call::GetAllServers).await?;
        Ok(ids.into_iter().map(|id| self.handle(id)).collect())
    }

    async fn get_booted_servers(&self) -> MurmurResult<Vec<ServerHandle>> {
        let ids: Vec<i32> = self.client.call(Call::GetBootedServers).await?;
        Ok(ids.into_iter().map(|id| self.handle(id)).collect())
    }

    async fn get_default_conf(&self) -> MurmurResult<BTreeMap<String, String>> {
        self.client.call(Call::GetDefaultConf).await
    }

    async fn get_version(&self) -> MurmurResult<Version> {
        self.client.call(Call::GetVersion).await
    }

    async fn get_uptime(&self) -> MurmurResult<i64> {
        self.client.call(Call::GetMetaUptime).await
    }
}

/// Handle to one virtual server behind the admin bridge.
#[derive(Debug)]
struct RpcServer {
    id: i32,
    client: Arc<RpcClient>,
}

#[async_trait]
impl VirtualServer for RpcServer {
    fn id(&self) -> i32 {
        self.id
    }

    async fn is_running(&self) -> MurmurResult<bool> {
        self.client
            .call(Call::IsRunning { server_id: self.id })
            .await
    }

    async fn start(&self) -> MurmurResult<()> {
        self.client.call(Call::Start { server_id: self.id }).await
    }

    async fn stop(&self) -> MurmurResult<()> {
        self.client.call(Call::Stop { server_id: self.id }).await
    }

    async fn delete(&self) -> MurmurResult<()> {
        self.client.call(Call::Delete { server_id: self.id }).await
    }

    async fn get_uptime(&self) -> MurmurResult<i64> {
        self.client
            .call(Call::GetUptime { server_id: self.id })
            .await
    }

    async fn get_conf(&self, key: &str) -> MurmurResult<String> {
        self.client
            .call(Call::GetConf {
                server_id: self.id,
                key: key.to_string(),
            })
            .await
    }

    async fn set_conf(&self, key: &str, value: &str) -> MurmurResult<()> {
        self.client
            .call(Call::SetConf {
                server_id: self.id,
                key: key.to_string(),
                value: value.to_string(),
            })
            .await
    }

    async fn get_all_conf(&self) -> MurmurResult<BTreeMap<String, String>> {
        self.client
            .call(Call::GetAllConf { server_id: self.id })
            .await
    }

    async fn set_superuser_password(&self, password: &str) -> MurmurResult<()> {
        self.client
            .call(Call::SetSuperuserPassword {
                server_id: self.id,
                password: password.to_string(),
            })
            .await
    }

    async fn get_log(&self, first: i32, last: i32) -> MurmurResult<Vec<LogEntry>> {
        self.client
            .call(Call::GetLog {
                server_id: self.id,
                first,
                last,
            })
            .await
    }

    async fn get_log_len(&self) -> MurmurResult<i32> {
        self.client
            .call(Call::GetLogLen { server_id: self.id })
            .await
    }

    async fn get_users(&self) -> MurmurResult<BTreeMap<i32, User>> {
        self.client
            .call(Call::GetUsers { server_id: self.id })
            .await
    }

    async fn get_state(&self, session: i32) -> MurmurResult<User> {
        self.client
            .call(Call::GetState {
                server_id: self.id,
                session,
            })
            .await
    }

    async fn set_state(&self, state: User) -> MurmurResult<()> {
        self.client
            .call(Call::SetState {
                server_id: self.id,
                state,
            })
            .await
    }

    async fn kick_user(&self, session: i32, reason: &str) -> MurmurResult<()> {
        self.client
            .call(Call::KickUser {
                server_id: self.id,
                session,
                reason: reason.to_string(),
            })
            .await
    }

    async fn get_registered_users(&self, filter: &str) -> MurmurResult<BTreeMap<i32, String>> {
        self.client
            .call(Call::GetRegisteredUsers {
                server_id: self.id,
                filter: filter.to_string(),
            })
            .await
    }

    async fn get_registration(&self, userid: i32) -> MurmurResult<UserInfoMap> {
        self.client
            .call(Call::GetRegistration {
                server_id: self.id,
                userid,
            })
            .await
    }

    async fn register_user(&self, info: UserInfoMap) -> MurmurResult<i32> {
        self.client
            .call(Call::RegisterUser {
                server_id: self.id,
                info,
            })
            .await
    }

    async fn unregister_user(&self, userid: i32) -> MurmurResult<()> {
        self.client
            .call(Call::UnregisterUser {
                server_id: self.id,
                userid,
            })
            .await
    }

    async fn get_channels(&self) -> MurmurResult<BTreeMap<i32, Channel>> {
        self.client
            .call(Call::GetChannels { server_id: self.id })
            .await
    }

    async fn get_tree(&self) -> MurmurResult<Tree> {
        self.client
            .call(Call::GetTree { server_id: self.id })
            .await
    }

    async fn get_channel_state(&self, channel_id: i32) -> MurmurResult<Channel> {
        self.client
            .call(Call::GetChannelState {
                server_id: self.id,
                channel_id,
            })
            .await
    }

    async fn add_channel(&self, name: &str, parent: i32) -> MurmurResult<i32> {
        self.client
            .call(Call::AddChannel {
                server_id: self.id,
                name: name.to_string(),
                parent,
            })
            .await
    }

    async fn remove_channel(&self, channel_id: i32) -> MurmurResult<()> {
        self.client
            .call(Call::RemoveChannel {
                server_id: self.id,
                channel_id,
            })
            .await
    }

    async fn get_acl(&self, channel_id: i32) -> MurmurResult<AclSet> {
        self.client
            .call(Call::GetAcl {
                server_id: self.id,
                channel_id,
            })
            .await
    }

    async fn set_acl(&self, channel_id: i32, acl: AclSet) -> MurmurResult<()> {
        self.client
            .call(Call::SetAcl {
                server_id: self.id,
                channel_id,
                acls: acl.acls,
                groups: acl.groups,
                inherit: acl.inherit,
            })
            .await
    }

    async fn send_message_channel(
        &self,
        channel_id: i32,
        tree: bool,
        text: &str,
    ) -> MurmurResult<()> {
        self.client
            .call(Call::SendMessageChannel {
                server_id: self.id,
                channel_id,
                tree,
                text: text.to_string(),
            })
            .await
    }

    async fn get_bans(&self) -> MurmurResult<Vec<Ban>> {
        self.client
            .call(Call::GetBans { server_id: self.id })
            .await
    }
}
