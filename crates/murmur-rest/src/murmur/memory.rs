//! In-process voice server registry.
//!
//! Behaves like the remote interface for everything the API touches: servers have a
//! running state, a root channel, registrations, connected sessions, ACLs and a log.
//! Nothing is persisted. Used by the test suite and by `murmur.backend = "memory"`.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::Utc;
use murmur_rpc::{AclSet, Ban, Channel, LogEntry, Tree, User, UserInfo, UserInfoMap, Version};
use tokio::sync::RwLock;

use super::{Meta, MurmurError, MurmurResult, ServerHandle, VirtualServer};

/// Default port of the first virtual server.
pub const DEFAULT_PORT: u16 = 64738;

/// Registration ID reserved for the superuser account.
const SUPERUSER_ID: i32 = 0;

/// Channel ID of the root channel.
const ROOT_CHANNEL: i32 = 0;

fn default_conf() -> BTreeMap<String, String> {
    [
        ("bandwidth", "72000"),
        ("host", ""),
        ("password", ""),
        ("port", "64738"),
        ("registerhostname", ""),
        ("registername", ""),
        ("registerpassword", ""),
        ("registerurl", ""),
        ("timeout", "30"),
        ("users", "100"),
        (
            "welcometext",
            "<br />Welcome to this server running <b>Murmur</b>.<br />Enjoy your stay!<br />",
        ),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

fn now_timestamp() -> i32 {
    i32::try_from(Utc::now().timestamp()).unwrap_or(i32::MAX)
}

/// A message delivered through `send_message_channel`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub channel_id: i32,
    pub tree: bool,
    pub text: String,
}

#[derive(Debug)]
struct Registration {
    info: UserInfoMap,
    password: Option<String>,
}

#[derive(Debug)]
struct ServerData {
    conf: BTreeMap<String, String>,
    running_since: Option<Instant>,
    log: Vec<LogEntry>,
    channels: BTreeMap<i32, Channel>,
    next_channel_id: i32,
    acls: BTreeMap<i32, AclSet>,
    registrations: BTreeMap<i32, Registration>,
    next_userid: i32,
    users: BTreeMap<i32, User>,
    next_session: i32,
    bans: Vec<Ban>,
    messages: Vec<SentMessage>,
}

impl ServerData {
    fn new() -> Self {
        let root = Channel {
            id: ROOT_CHANNEL,
            name: "Root".to_string(),
            parent: -1,
            ..Channel::default()
        };

        let mut superuser = UserInfoMap::new();
        superuser.insert(UserInfo::UserName, "SuperUser".to_string());

        let mut data = Self {
            conf: BTreeMap::new(),
            running_since: None,
            log: Vec::new(),
            channels: BTreeMap::from([(ROOT_CHANNEL, root)]),
            next_channel_id: 1,
            acls: BTreeMap::new(),
            registrations: BTreeMap::from([(
                SUPERUSER_ID,
                Registration {
                    info: superuser,
                    password: None,
                },
            )]),
            next_userid: 1,
            users: BTreeMap::new(),
            next_session: 1,
            bans: Vec::new(),
            messages: Vec::new(),
        };
        data.log("Server created");
        data
    }

    fn log(&mut self, txt: impl Into<String>) {
        self.log.push(LogEntry {
            timestamp: now_timestamp(),
            txt: txt.into(),
        });
    }

    fn is_running(&self) -> bool {
        self.running_since.is_some()
    }

    fn require_running(&self) -> MurmurResult<()> {
        if self.is_running() {
            Ok(())
        } else {
            Err(MurmurError::ServerBooted("server is not running".to_string()))
        }
    }

    fn channel(&self, channel_id: i32) -> MurmurResult<&Channel> {
        self.channels
            .get(&channel_id)
            .ok_or_else(|| MurmurError::InvalidChannel(format!("no channel {channel_id}")))
    }

    fn registration_info(&self, userid: i32) -> MurmurResult<UserInfoMap> {
        self.registrations
            .get(&userid)
            .map(|r| r.info.clone())
            .ok_or_else(|| MurmurError::InvalidUser(format!("no registration {userid}")))
    }

    /// Build the subtree rooted at `channel_id`. Children sort by position, then name.
    fn tree(&self, channel_id: i32) -> MurmurResult<Tree> {
        let c = self.channel(channel_id)?.clone();

        let mut child_channels: Vec<&Channel> = self
            .channels
            .values()
            .filter(|ch| ch.parent == channel_id && ch.id != channel_id)
            .collect();
        child_channels.sort_by(|a, b| a.position.cmp(&b.position).then(a.name.cmp(&b.name)));

        let children = child_channels
            .into_iter()
            .map(|ch| self.tree(ch.id))
            .collect::<MurmurResult<Vec<_>>>()?;

        let users = self
            .users
            .values()
            .filter(|u| u.channel == channel_id)
            .cloned()
            .collect();

        Ok(Tree { c, children, users })
    }

    /// IDs of `channel_id` and every channel below it.
    fn subtree_ids(&self, channel_id: i32) -> Vec<i32> {
        let mut ids = vec![channel_id];
        let mut i = 0;
        while i < ids.len() {
            let parent = ids[i];
            ids.extend(
                self.channels
                    .values()
                    .filter(|ch| ch.parent == parent && ch.id != parent)
                    .map(|ch| ch.id),
            );
            i += 1;
        }
        ids
    }
}

#[derive(Debug)]
struct MemoryState {
    started: Instant,
    next_server_id: i32,
    default_conf: BTreeMap<String, String>,
    servers: BTreeMap<i32, ServerData>,
}

/// In-process implementation of the remote interface.
#[derive(Debug, Clone)]
pub struct MemoryMeta {
    state: Arc<RwLock<MemoryState>>,
}

impl Default for MemoryMeta {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryMeta {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(MemoryState {
                started: Instant::now(),
                next_server_id: 1,
                default_conf: default_conf(),
                servers: BTreeMap::new(),
            })),
        }
    }

    fn handle(&self, id: i32) -> ServerHandle {
        Arc::new(MemoryServer {
            id,
            state: self.state.clone(),
        })
    }

    /// Connect a user to a running server's root channel. Returns the session ID.
    ///
    /// `userid` is the registration ID, -1 for an anonymous user.
    pub async fn connect_user(&self, server_id: i32, name: &str, userid: i32) -> MurmurResult<i32> {
        let mut state = self.state.write().await;
        let server = state
            .servers
            .get_mut(&server_id)
            .ok_or_else(|| MurmurError::InvalidServer(format!("no server {server_id}")))?;
        server.require_running()?;

        let session = server.next_session;
        server.next_session += 1;
        server.users.insert(
            session,
            User {
                session,
                userid,
                name: name.to_string(),
                channel: ROOT_CHANNEL,
                ..User::default()
            },
        );
        server.log(format!("<{session}:{name}({userid})> Authenticated"));
        Ok(session)
    }

    /// Add a ban entry to a server.
    pub async fn add_ban(&self, server_id: i32, ban: Ban) -> MurmurResult<()> {
        let mut state = self.state.write().await;
        let server = state
            .servers
            .get_mut(&server_id)
            .ok_or_else(|| MurmurError::InvalidServer(format!("no server {server_id}")))?;
        server.bans.push(ban);
        Ok(())
    }

    /// Messages sent to a server through `send_message_channel`, oldest first.
    pub async fn sent_messages(&self, server_id: i32) -> Vec<SentMessage> {
        let state = self.state.read().await;
        state
            .servers
            .get(&server_id)
            .map(|s| s.messages.clone())
            .unwrap_or_default()
    }

    /// Superuser password last set on a server.
    pub async fn superuser_password(&self, server_id: i32) -> Option<String> {
        let state = self.state.read().await;
        state
            .servers
            .get(&server_id)
            .and_then(|s| s.registrations.get(&SUPERUSER_ID))
            .and_then(|r| r.password.clone())
    }

    /// Server-specific configuration, without defaults.
    pub async fn explicit_conf(&self, server_id: i32) -> BTreeMap<String, String> {
        let state = self.state.read().await;
        state
            .servers
            .get(&server_id)
            .map(|s| s.conf.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Meta for MemoryMeta {
    async fn get_server(&self, id: i32) -> MurmurResult<Option<ServerHandle>> {
        let state = self.state.read().await;
        Ok(state.servers.contains_key(&id).then(|| self.handle(id)))
    }

    async fn new_server(&self) -> MurmurResult<ServerHandle> {
        let mut state = self.state.write().await;
        let id = state.next_server_id;
        state.next_server_id += 1;
        state.servers.insert(id, ServerData::new());
        Ok(self.handle(id))
    }

    async fn get_all_servers(&self) -> MurmurResult<Vec<ServerHandle>> {
        let state = self.state.read().await;
        Ok(state.servers.keys().map(|&id| self.handle(id)).collect())
    }

    async fn get_booted_servers(&self) -> MurmurResult<Vec<ServerHandle>> {
        let state = self.state.read().await;
        Ok(state
            .servers
            .iter()
            .filter(|(_, s)| s.is_running())
            .map(|(&id, _)| self.handle(id))
            .collect())
    }

    async fn get_default_conf(&self) -> MurmurResult<BTreeMap<String, String>> {
        Ok(self.state.read().await.default_conf.clone())
    }

    async fn get_version(&self) -> MurmurResult<Version> {
        Ok(Version {
            major: 1,
            minor: 3,
            patch: 4,
            text: "1.3.4".to_string(),
        })
    }

    async fn get_uptime(&self) -> MurmurResult<i64> {
        let secs = self.state.read().await.started.elapsed().as_secs();
        Ok(i64::try_from(secs).unwrap_or(i64::MAX))
    }
}

/// Handle to one in-process server.
#[derive(Debug)]
struct MemoryServer {
    id: i32,
    state: Arc<RwLock<MemoryState>>,
}

impl MemoryServer {
    fn missing(&self) -> MurmurError {
        MurmurError::InvalidServer(format!("no server {}", self.id))
    }

    async fn read<T>(&self, f: impl FnOnce(&ServerData) -> MurmurResult<T>) -> MurmurResult<T> {
        let state = self.state.read().await;
        let server = state.servers.get(&self.id).ok_or_else(|| self.missing())?;
        f(server)
    }

    async fn write<T>(
        &self,
        f: impl FnOnce(&mut ServerData) -> MurmurResult<T>,
    ) -> MurmurResult<T> {
        let mut state = self.state.write().await;
        let server = state
            .servers
            .get_mut(&self.id)
            .ok_or_else(|| self.missing())?;
        f(server)
    }
}

#[async_trait]
impl VirtualServer for MemoryServer {
    fn id(&self) -> i32 {
        self.id
    }

    async fn is_running(&self) -> MurmurResult<bool> {
        self.read(|s| Ok(s.is_running())).await
    }

    async fn start(&self) -> MurmurResult<()> {
        self.write(|s| {
            if s.is_running() {
                return Err(MurmurError::ServerBooted("server already running".to_string()));
            }
            s.running_since = Some(Instant::now());
            s.log("Server started");
            Ok(())
        })
        .await
    }

    async fn stop(&self) -> MurmurResult<()> {
        self.write(|s| {
            s.require_running()?;
            s.running_since = None;
            s.users.clear();
            s.log("Server stopped");
            Ok(())
        })
        .await
    }

    async fn delete(&self) -> MurmurResult<()> {
        let mut state = self.state.write().await;
        let server = state.servers.get(&self.id).ok_or_else(|| self.missing())?;
        if server.is_running() {
            return Err(MurmurError::ServerBooted(
                "cannot delete a running server".to_string(),
            ));
        }
        state.servers.remove(&self.id);
        Ok(())
    }

    async fn get_uptime(&self) -> MurmurResult<i64> {
        self.read(|s| {
            let secs = s.running_since.map(|t| t.elapsed().as_secs()).unwrap_or(0);
            Ok(i64::try_from(secs).unwrap_or(i64::MAX))
        })
        .await
    }

    async fn get_conf(&self, key: &str) -> MurmurResult<String> {
        self.read(|s| Ok(s.conf.get(key).cloned().unwrap_or_default()))
            .await
    }

    async fn set_conf(&self, key: &str, value: &str) -> MurmurResult<()> {
        self.write(|s| {
            s.conf.insert(key.to_string(), value.to_string());
            Ok(())
        })
        .await
    }

    async fn get_all_conf(&self) -> MurmurResult<BTreeMap<String, String>> {
        let state = self.state.read().await;
        let server = state.servers.get(&self.id).ok_or_else(|| self.missing())?;
        let mut conf = state.default_conf.clone();
        conf.extend(server.conf.iter().map(|(k, v)| (k.clone(), v.clone())));
        Ok(conf)
    }

    async fn set_superuser_password(&self, password: &str) -> MurmurResult<()> {
        self.write(|s| {
            if let Some(superuser) = s.registrations.get_mut(&SUPERUSER_ID) {
                superuser.password = Some(password.to_string());
            }
            s.log("SuperUser password changed");
            Ok(())
        })
        .await
    }

    async fn get_log(&self, first: i32, last: i32) -> MurmurResult<Vec<LogEntry>> {
        self.read(|s| {
            let newest_first: Vec<LogEntry> = s.log.iter().rev().cloned().collect();
            let start = usize::try_from(first.max(0)).unwrap_or(0);
            let end = if last < 0 {
                newest_first.len()
            } else {
                usize::try_from(last).map_or(0, |l| (l + 1).min(newest_first.len()))
            };
            Ok(newest_first
                .get(start..end.max(start))
                .map(<[LogEntry]>::to_vec)
                .unwrap_or_default())
        })
        .await
    }

    async fn get_log_len(&self) -> MurmurResult<i32> {
        self.read(|s| Ok(i32::try_from(s.log.len()).unwrap_or(i32::MAX)))
            .await
    }

    async fn get_users(&self) -> MurmurResult<BTreeMap<i32, User>> {
        self.read(|s| {
            s.require_running()?;
            Ok(s.users.clone())
        })
        .await
    }

    async fn get_state(&self, session: i32) -> MurmurResult<User> {
        self.read(|s| {
            s.require_running()?;
            s.users
                .get(&session)
                .cloned()
                .ok_or_else(|| MurmurError::InvalidSession(format!("no session {session}")))
        })
        .await
    }

    async fn set_state(&self, state: User) -> MurmurResult<()> {
        self.write(|s| {
            s.require_running()?;
            s.channel(state.channel)?;
            let user = s.users.get_mut(&state.session).ok_or_else(|| {
                MurmurError::InvalidSession(format!("no session {}", state.session))
            })?;
            user.mute = state.mute;
            user.deaf = state.deaf;
            user.suppress = state.suppress;
            user.priority_speaker = state.priority_speaker;
            user.channel = state.channel;
            user.name = state.name;
            user.comment = state.comment;
            Ok(())
        })
        .await
    }

    async fn kick_user(&self, session: i32, reason: &str) -> MurmurResult<()> {
        self.write(|s| {
            s.require_running()?;
            let user = s
                .users
                .remove(&session)
                .ok_or_else(|| MurmurError::InvalidSession(format!("no session {session}")))?;
            s.log(format!("Kicked {} ({session}): {reason}", user.name));
            Ok(())
        })
        .await
    }

    async fn get_registered_users(&self, filter: &str) -> MurmurResult<BTreeMap<i32, String>> {
        self.read(|s| {
            s.require_running()?;
            let needle = filter.to_lowercase();
            Ok(s.registrations
                .iter()
                .filter_map(|(&id, r)| {
                    let name = r.info.get(&UserInfo::UserName)?;
                    name.to_lowercase()
                        .contains(&needle)
                        .then(|| (id, name.clone()))
                })
                .collect())
        })
        .await
    }

    async fn get_registration(&self, userid: i32) -> MurmurResult<UserInfoMap> {
        self.read(|s| {
            s.require_running()?;
            s.registration_info(userid)
        })
        .await
    }

    async fn register_user(&self, mut info: UserInfoMap) -> MurmurResult<i32> {
        self.write(|s| {
            s.require_running()?;
            let name = info
                .get(&UserInfo::UserName)
                .filter(|n| !n.is_empty())
                .cloned()
                .ok_or_else(|| MurmurError::InvalidUser("registration needs a name".to_string()))?;

            let taken = s.registrations.values().any(|r| {
                r.info
                    .get(&UserInfo::UserName)
                    .is_some_and(|existing| existing.eq_ignore_ascii_case(&name))
            });
            if taken {
                return Err(MurmurError::InvalidUser(format!(
                    "name {name} is already registered"
                )));
            }

            let password = info.remove(&UserInfo::UserPassword);
            info.insert(
                UserInfo::UserLastActive,
                Utc::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            );

            let userid = s.next_userid;
            s.next_userid += 1;
            s.registrations
                .insert(userid, Registration { info, password });
            s.log(format!("Registered user {name} as {userid}"));
            Ok(userid)
        })
        .await
    }

    async fn unregister_user(&self, userid: i32) -> MurmurResult<()> {
        self.write(|s| {
            s.require_running()?;
            if userid == SUPERUSER_ID || s.registrations.remove(&userid).is_none() {
                return Err(MurmurError::InvalidUser(format!("no registration {userid}")));
            }
            s.log(format!("Unregistered user {userid}"));
            Ok(())
        })
        .await
    }

    async fn get_channels(&self) -> MurmurResult<BTreeMap<i32, Channel>> {
        self.read(|s| {
            s.require_running()?;
            Ok(s.channels.clone())
        })
        .await
    }

    async fn get_tree(&self) -> MurmurResult<Tree> {
        self.read(|s| {
            s.require_running()?;
            s.tree(ROOT_CHANNEL)
        })
        .await
    }

    async fn get_channel_state(&self, channel_id: i32) -> MurmurResult<Channel> {
        self.read(|s| {
            s.require_running()?;
            s.channel(channel_id).cloned()
        })
        .await
    }

    async fn add_channel(&self, name: &str, parent: i32) -> MurmurResult<i32> {
        self.write(|s| {
            s.require_running()?;
            s.channel(parent)?;
            let id = s.next_channel_id;
            s.next_channel_id += 1;
            s.channels.insert(
                id,
                Channel {
                    id,
                    name: name.to_string(),
                    parent,
                    ..Channel::default()
                },
            );
            s.log(format!("Added channel {name} ({id}) under {parent}"));
            Ok(id)
        })
        .await
    }

    async fn remove_channel(&self, channel_id: i32) -> MurmurResult<()> {
        self.write(|s| {
            s.require_running()?;
            let parent = s.channel(channel_id)?.parent;
            if channel_id == ROOT_CHANNEL {
                return Err(MurmurError::InvalidChannel(
                    "the root channel cannot be removed".to_string(),
                ));
            }

            let removed = s.subtree_ids(channel_id);
            for id in &removed {
                s.channels.remove(id);
                s.acls.remove(id);
            }
            for user in s.users.values_mut() {
                if removed.contains(&user.channel) {
                    user.channel = parent;
                }
            }
            for channel in s.channels.values_mut() {
                channel.links.retain(|l| !removed.contains(l));
            }
            s.log(format!("Removed channel {channel_id}"));
            Ok(())
        })
        .await
    }

    async fn get_acl(&self, channel_id: i32) -> MurmurResult<AclSet> {
        self.read(|s| {
            s.require_running()?;
            s.channel(channel_id)?;
            Ok(s.acls.get(&channel_id).cloned().unwrap_or(AclSet {
                inherit: true,
                ..AclSet::default()
            }))
        })
        .await
    }

    async fn set_acl(&self, channel_id: i32, acl: AclSet) -> MurmurResult<()> {
        self.write(|s| {
            s.require_running()?;
            s.channel(channel_id)?;
            s.acls.insert(channel_id, acl);
            Ok(())
        })
        .await
    }

    async fn send_message_channel(
        &self,
        channel_id: i32,
        tree: bool,
        text: &str,
    ) -> MurmurResult<()> {
        self.write(|s| {
            s.require_running()?;
            s.channel(channel_id)?;
            s.messages.push(SentMessage {
                channel_id,
                tree,
                text: text.to_string(),
            });
            Ok(())
        })
        .await
    }

    async fn get_bans(&self) -> MurmurResult<Vec<Ban>> {
        self.read(|s| {
            s.require_running()?;
            Ok(s.bans.clone())
        })
        .await
    }
}
