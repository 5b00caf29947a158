//! REST API for administering Murmur voice servers.
//!
//! Every endpoint resolves a virtual server through the [`murmur::Meta`] interface,
//! performs one or two remote calls and renders the result as JSON.

pub mod api;
pub mod auth;
pub mod cvp;
pub mod murmur;
pub mod util;
