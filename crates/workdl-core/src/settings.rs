//! Settings domain types and validation.
//!
//! The engine re-reads these values at the start of every operation, so an
//! update takes effect on the next download without restarting anything.

use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::errors::EngineError;

/// Default executable name launched by the game launcher.
pub const DEFAULT_GAME_EXECUTABLE: &str = "BlackOps3";

/// Default upper bound for one fetch, in seconds.
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 3600;

/// Default SIGTERM grace period before a forced kill, in seconds.
pub const DEFAULT_STOP_GRACE_SECS: u64 = 5;

/// Engine settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Game installation root; items go under `usermaps/` and `mods/`.
    pub install_dir: Option<PathBuf>,

    /// Fetch tool executable, or the directory containing it.
    pub fetch_tool_path: Option<PathBuf>,

    /// Game executable name without extension.
    pub game_executable: String,

    /// Extra arguments for the game, whitespace separated.
    pub launch_parameters: String,

    /// Keep consuming the queue after each item.
    pub continuous_download: bool,

    /// Delete the fetch tool's staging copy after installation.
    pub clean_on_finish: bool,

    /// Drop queued items that are already in the library.
    pub skip_already_installed: bool,

    /// Upper bound for one fetch.
    pub fetch_timeout_secs: u64,

    /// Grace period between a stop request and a forced kill.
    pub stop_grace_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            install_dir: None,
            fetch_tool_path: None,
            game_executable: DEFAULT_GAME_EXECUTABLE.to_string(),
            launch_parameters: String::new(),
            continuous_download: true,
            clean_on_finish: true,
            skip_already_installed: true,
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
            stop_grace_secs: DEFAULT_STOP_GRACE_SECS,
        }
    }
}

impl Settings {
    /// Merge a partial update into these settings.
    pub fn merge(&mut self, other: &SettingsUpdate) {
        if let Some(ref dir) = other.install_dir {
            self.install_dir.clone_from(dir);
        }
        if let Some(ref tool) = other.fetch_tool_path {
            self.fetch_tool_path.clone_from(tool);
        }
        if let Some(ref exe) = other.game_executable {
            self.game_executable.clone_from(exe);
        }
        if let Some(ref params) = other.launch_parameters {
            self.launch_parameters.clone_from(params);
        }
        if let Some(flag) = other.continuous_download {
            self.continuous_download = flag;
        }
        if let Some(flag) = other.clean_on_finish {
            self.clean_on_finish = flag;
        }
        if let Some(flag) = other.skip_already_installed {
            self.skip_already_installed = flag;
        }
        if let Some(secs) = other.fetch_timeout_secs {
            self.fetch_timeout_secs = secs;
        }
        if let Some(secs) = other.stop_grace_secs {
            self.stop_grace_secs = secs;
        }
    }

    /// Installation root, or a validation error when unset.
    pub fn require_install_dir(&self) -> Result<&Path, EngineError> {
        self.install_dir
            .as_deref()
            .ok_or_else(|| EngineError::validation("installation directory is not configured"))
    }

    /// Fetch tool location, or a validation error when unset.
    pub fn require_fetch_tool(&self) -> Result<&Path, EngineError> {
        self.fetch_tool_path
            .as_deref()
            .ok_or_else(|| EngineError::validation("fetch tool path is not configured"))
    }

    pub const fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub const fn stop_grace(&self) -> Duration {
        Duration::from_secs(self.stop_grace_secs)
    }

    /// Launch parameters split on whitespace.
    pub fn launch_args(&self) -> Vec<String> {
        self.launch_parameters
            .split_whitespace()
            .map(str::to_string)
            .collect()
    }
}

/// Partial settings update.
///
/// Outer `None` leaves a field untouched. For the path fields, `Some(None)`
/// (JSON `null`) clears the value.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SettingsUpdate {
    #[serde(deserialize_with = "double_option")]
    pub install_dir: Option<Option<PathBuf>>,
    #[serde(deserialize_with = "double_option")]
    pub fetch_tool_path: Option<Option<PathBuf>>,
    pub game_executable: Option<String>,
    pub launch_parameters: Option<String>,
    pub continuous_download: Option<bool>,
    pub clean_on_finish: Option<bool>,
    pub skip_already_installed: Option<bool>,
    pub fetch_timeout_secs: Option<u64>,
    pub stop_grace_secs: Option<u64>,
}

fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Settings validation or persistence error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SettingsError {
    #[error("Invalid setting: {0}")]
    Invalid(String),

    #[error("Settings storage error: {0}")]
    Storage(String),
}

/// Validate settings values.
pub fn validate_settings(settings: &Settings) -> Result<(), SettingsError> {
    let exe = settings.game_executable.trim();
    if exe.is_empty() {
        return Err(SettingsError::Invalid(
            "game executable cannot be empty".to_string(),
        ));
    }
    if exe.contains(['/', '\\']) {
        return Err(SettingsError::Invalid(format!(
            "game executable must be a file name, got '{exe}'"
        )));
    }

    if let Some(dir) = &settings.install_dir {
        if dir.as_os_str().is_empty() {
            return Err(SettingsError::Invalid(
                "installation directory cannot be empty".to_string(),
            ));
        }
    }
    if let Some(tool) = &settings.fetch_tool_path {
        if tool.as_os_str().is_empty() {
            return Err(SettingsError::Invalid(
                "fetch tool path cannot be empty".to_string(),
            ));
        }
    }

    if settings.fetch_timeout_secs == 0 {
        return Err(SettingsError::Invalid(
            "fetch timeout must be at least one second".to_string(),
        ));
    }
    if settings.stop_grace_secs == 0 {
        return Err(SettingsError::Invalid(
            "stop grace period must be at least one second".to_string(),
        ));
    }

    Ok(())
}
