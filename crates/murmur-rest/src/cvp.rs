//! Channel Viewer Protocol rendering.
//!
//! Turns a server's channel tree into the public document channel viewer widgets
//! consume. Only presentation fields are exposed: no addresses, certificates or
//! client details.

use murmur_rpc::{Tree, User};
use serde::Serialize;

/// A channel node of the public tree.
#[derive(Debug, Clone, Serialize)]
pub struct CvpChannel {
    pub id: i32,
    pub parent: i32,
    pub name: String,
    pub description: String,
    pub position: i32,
    pub temporary: bool,
    pub links: Vec<i32>,
    pub channels: Vec<CvpChannel>,
    pub users: Vec<CvpUser>,
}

/// A connected user as shown in the public tree.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CvpUser {
    pub session: i32,
    pub userid: i32,
    pub name: String,
    pub mute: bool,
    pub deaf: bool,
    pub suppress: bool,
    pub self_mute: bool,
    pub self_deaf: bool,
    pub channel: i32,
    pub onlinesecs: i32,
    pub idlesecs: i32,
}

impl From<&User> for CvpUser {
    fn from(user: &User) -> Self {
        Self {
            session: user.session,
            userid: user.userid,
            name: user.name.clone(),
            mute: user.mute,
            deaf: user.deaf,
            suppress: user.suppress,
            self_mute: user.self_mute,
            self_deaf: user.self_deaf,
            channel: user.channel,
            onlinesecs: user.onlinesecs,
            idlesecs: user.idlesecs,
        }
    }
}

impl From<&Tree> for CvpChannel {
    fn from(tree: &Tree) -> Self {
        let c = &tree.c;
        Self {
            id: c.id,
            parent: c.parent,
            name: c.name.clone(),
            description: c.description.clone(),
            position: c.position,
            temporary: c.temporary,
            links: c.links.clone(),
            channels: tree.children.iter().map(CvpChannel::from).collect(),
            users: tree.users.iter().map(CvpUser::from).collect(),
        }
    }
}

/// The full public document for one server.
#[derive(Debug, Clone, Serialize)]
pub struct CvpDocument {
    pub id: i32,
    pub name: String,
    pub root: CvpChannel,
    pub x_uptime: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x_connecturl: Option<String>,
}

impl CvpDocument {
    /// Build the document.
    ///
    /// `register_name` falls back to "Root" when empty. A connect URL is included only
    /// when `register_hostname` is set.
    pub fn new(
        id: i32,
        tree: &Tree,
        register_name: &str,
        register_hostname: &str,
        port: i64,
        uptime: i64,
    ) -> Self {
        let name = if register_name.is_empty() {
            "Root".to_string()
        } else {
            register_name.to_string()
        };

        let x_connecturl = (!register_hostname.is_empty())
            .then(|| connect_url(register_hostname, port));

        Self {
            id,
            name,
            root: CvpChannel::from(tree),
            x_uptime: uptime,
            x_connecturl,
        }
    }
}

/// Client link for joining a server.
pub fn connect_url(host: &str, port: i64) -> String {
    format!("mumble://{host}:{port}/?version=1.2.0")
}
