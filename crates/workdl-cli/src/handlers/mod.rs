//! Command handlers.
//!
//! Local handlers take a [`CliContext`](crate::bootstrap::CliContext) and call
//! the engine directly. Queue handlers talk to a running server.

pub mod config;
pub mod download;
pub mod launch;
pub mod library;
pub mod queue;
pub mod serve;
