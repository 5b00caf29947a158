//! ACL permission bits.
//!
//! Values match the voice server's `Permission` constants.

pub const WRITE: i32 = 0x01;
pub const TRAVERSE: i32 = 0x02;
pub const ENTER: i32 = 0x04;
pub const SPEAK: i32 = 0x08;
pub const MUTE_DEAFEN: i32 = 0x10;
pub const MOVE: i32 = 0x20;
pub const MAKE_CHANNEL: i32 = 0x40;
pub const LINK_CHANNEL: i32 = 0x80;
pub const WHISPER: i32 = 0x100;
pub const TEXT_MESSAGE: i32 = 0x200;

/// Bits a password-protected channel withholds from everyone and hands back to
/// members of the password group (910).
pub const PASSWORD_GATED: i32 = TRAVERSE | ENTER | SPEAK | LINK_CHANNEL | WHISPER | TEXT_MESSAGE;

/// Group every connected user belongs to.
pub const GROUP_ALL: &str = "all";

/// Prefix that turns a group name into an access-token group.
pub const TOKEN_GROUP_MARKER: char = '#';
