//! Steam Web API client for workshop item details.
//!
//! Implements [`workdl_core::WorkshopDetailsPort`] on top of the
//! `ISteamRemoteStorage/GetPublishedFileDetails` endpoint.
#![deny(unsafe_code)]
#![deny(unused_crate_dependencies)]
// DefaultSteamClient is meant to be used through the port trait, not its generic structure
#![allow(private_interfaces, private_bounds)]

mod client;
mod config;
mod error;
mod http;
mod models;

// ============================================================================
// Public API
// ============================================================================

pub use client::{DefaultSteamClient, SteamWorkshopClient};
pub use config::SteamClientConfig;
pub use error::{SteamError, SteamResult};

// Silence unused dev-dependency warnings
#[cfg(test)]
use tokio_test as _;
