//! API request handlers.
//!
//! Organized by resource:
//! - `servers`: server listing, creation, deletion, start/stop, logs
//! - `users`: registrations and connected users
//! - `channels`: channels, ACLs, channel passwords
//! - `conf`: server configuration
//! - `moderation`: broadcast messages, superuser password, kicks, bans
//! - `stats`: aggregate counters
//! - `cvp`: public channel viewer
//! - `misc`: health check

mod channels;
mod conf;
mod cvp;
mod misc;
mod moderation;
mod servers;
mod stats;
mod users;

// Re-export all public types and handlers
pub use channels::*;
pub use conf::*;
pub use cvp::*;
pub use misc::*;
pub use moderation::*;
pub use servers::*;
pub use stats::*;
pub use users::*;
