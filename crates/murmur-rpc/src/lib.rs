//! Record types and wire envelope for the Murmur administrative interface.
//!
//! This crate describes the remote side of murmur-rest as plain data:
//!
//! ```text
//! HTTP client <--[REST/JSON]--> murmur-rest <--[JSON lines over TCP]--> admin bridge <--> murmurd
//! ```
//!
//! - [`types`]: the records the voice server hands back (channels, users, ACLs, bans, ...).
//! - [`permissions`]: ACL permission bits.
//! - [`messages`]: the request/response envelope spoken to the admin bridge.
//!
//! The field names follow the voice server's own interface definition, so a record
//! serialized here is the same shape the server documents.

pub mod messages;
pub mod permissions;
pub mod types;

pub use messages::{Call, Fault, FaultKind, RpcRequest, RpcResponse};
pub use types::{
    Acl, AclSet, Ban, Channel, Group, LogEntry, Tree, User, UserInfo, UserInfoMap, Version,
};
