//! HTTP request handlers for the Axum web server.
//!
//! Each submodule contains handlers for a specific API area.
//! Handlers are thin wrappers that delegate to `DownloadEngine`.

pub mod download;
pub mod events;
pub mod game;
pub mod library;
pub mod queue;
pub mod settings;
pub mod workshop;

use serde::Deserialize;

/// Request field accepting one string or a list of strings.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ItemsInput {
    One(String),
    Many(Vec<String>),
}

impl ItemsInput {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            Self::One(item) => vec![item],
            Self::Many(items) => items,
        }
    }
}
