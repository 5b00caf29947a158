//! Records exchanged with the voice server.
//!
//! Every record mirrors a structure of the server's administrative interface. Field
//! names are renamed to the interface's camelCase spelling so the JSON form matches
//! what the server documents.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A channel on a virtual server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Channel {
    /// Channel ID. The root channel is always 0.
    pub id: i32,
    pub name: String,
    /// Parent channel ID, -1 for the root channel.
    pub parent: i32,
    /// IDs of linked channels.
    pub links: Vec<i32>,
    pub description: String,
    /// Temporary channels vanish once the last user leaves.
    pub temporary: bool,
    /// Sort position among siblings.
    pub position: i32,
}

/// State of a connected user session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct User {
    /// Session ID, valid only while the user stays connected.
    pub session: i32,
    /// Registration ID, -1 for unregistered users.
    pub userid: i32,
    pub mute: bool,
    pub deaf: bool,
    pub suppress: bool,
    pub priority_speaker: bool,
    pub self_mute: bool,
    pub self_deaf: bool,
    pub recording: bool,
    /// Channel the user is in.
    pub channel: i32,
    pub name: String,
    pub onlinesecs: i32,
    pub bytespersec: i32,
    pub version: i32,
    pub release: String,
    pub os: String,
    pub osversion: String,
    pub identity: String,
    pub context: String,
    pub comment: String,
    pub tcponly: bool,
    pub idlesecs: i32,
    pub udp_ping: f32,
    pub tcp_ping: f32,
}

/// A channel together with its sub-channels and the users inside it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tree {
    /// The channel at this node.
    pub c: Channel,
    /// Sub-channels in display order.
    pub children: Vec<Tree>,
    /// Users currently in this channel.
    pub users: Vec<User>,
}

/// A single access control entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Acl {
    /// Entry applies to the channel it is set on.
    pub apply_here: bool,
    /// Entry applies to sub-channels.
    pub apply_subs: bool,
    /// Entry was inherited from a parent channel.
    pub inherited: bool,
    /// Registration the entry targets, -1 when it targets a group.
    pub userid: i32,
    /// Group the entry targets, empty when it targets a user.
    pub group: String,
    pub allow: i32,
    pub deny: i32,
}

/// A channel group definition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Group {
    pub name: String,
    pub inherited: bool,
    pub inherit: bool,
    pub inheritable: bool,
    pub add: Vec<i32>,
    pub remove: Vec<i32>,
    pub members: Vec<i32>,
}

/// The full access control state of a channel.
///
/// Serialized positionally as `[acls, groups, inherit]`, the order the server
/// returns them in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AclSet {
    pub acls: Vec<Acl>,
    pub groups: Vec<Group>,
    /// Whether the channel inherits ACL entries from its parent.
    pub inherit: bool,
}

impl Serialize for AclSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        (&self.acls, &self.groups, self.inherit).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for AclSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let (acls, groups, inherit) = <(Vec<Acl>, Vec<Group>, bool)>::deserialize(deserializer)?;
        Ok(Self {
            acls,
            groups,
            inherit,
        })
    }
}

/// A ban entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Ban {
    /// Address in network byte order (IPv4 addresses are v4-mapped IPv6).
    pub address: Vec<u8>,
    /// Prefix length of the banned range.
    pub bits: i32,
    pub name: String,
    pub hash: String,
    pub reason: String,
    /// Unix timestamp the ban started at.
    pub start: i32,
    /// Length in seconds, 0 for permanent bans.
    pub duration: i32,
}

/// A line of the server log.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogEntry {
    /// Unix timestamp.
    pub timestamp: i32,
    pub txt: String,
}

/// Keys of a registration record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum UserInfo {
    UserName,
    UserEmail,
    UserComment,
    UserHash,
    UserPassword,
    UserLastActive,
}

/// A registration record.
pub type UserInfoMap = BTreeMap<UserInfo, String>;

/// Version of the voice server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Version {
    pub major: i32,
    pub minor: i32,
    pub patch: i32,
    /// Free-form release text, e.g. "1.3.4".
    pub text: String,
}
