//! `workdl` command-line interface.
//!
//! Local commands drive an in-process [`workdl_download::DownloadEngine`];
//! queue commands talk to a running `workdl serve` over HTTP.
#![deny(unsafe_code)]
#![deny(unused_crate_dependencies)]

// Silence unused dev-dependency warnings
#[cfg(test)]
use tokio_test as _;

// Used by main.rs binary
use tracing_subscriber as _;

pub mod bootstrap;
pub mod commands;
pub mod error;
pub mod handlers;
pub mod parser;
pub mod presentation;
pub mod remote;

// Re-export primary types for convenient access
pub use bootstrap::{CliContext, bootstrap};
pub use commands::{Commands, ConfigCommand, LibraryCommand, QueueCommand};
pub use error::{CliError, exit_code_for};
pub use parser::Cli;
