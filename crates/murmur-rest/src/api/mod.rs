//! HTTP API module.
//!
//! Maps REST endpoints onto calls against the voice server's administrative interface.

mod error;
mod extract;
mod handlers;
mod jsonp;
mod response;
mod routes;
mod state;

#[allow(unused_imports)]
pub use error::{ApiError, ApiResult, ErrorResponse};
pub use response::{PrettyJson, to_pretty_string};
pub use routes::create_router;
pub use state::AppState;
