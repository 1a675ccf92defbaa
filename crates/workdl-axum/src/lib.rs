//! HTTP adapter for the workdl download engine.
//!
//! Thin axum handlers over [`workdl_download::DownloadEngine`], JSON error
//! bodies via [`HttpError`], and a server-sent event stream of engine events.
#![deny(unsafe_code)]
#![deny(unused_crate_dependencies)]

// Silence unused dev-dependency warnings
#[cfg(test)]
use http_body_util as _;
#[cfg(test)]
use tempfile as _;
#[cfg(test)]
use tokio_test as _;
#[cfg(test)]
use tower as _;

pub mod bootstrap;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod sse;
pub mod state;

// Re-export primary types
pub use bootstrap::{AxumContext, CorsConfig, ServerConfig, bootstrap, start_server};
pub use error::HttpError;
pub use routes::create_router;
pub use sse::SseBroadcaster;
pub use state::AppState;
