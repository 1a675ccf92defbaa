//! Directory helpers and default locations.

use std::env;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Environment override for the settings file location.
pub const SETTINGS_PATH_ENV: &str = "WORKDL_SETTINGS";

/// Errors from path resolution and directory checks.
#[derive(Debug, Error)]
pub enum PathError {
    /// Could not determine the user's configuration directory.
    #[error("Cannot determine configuration directory")]
    NoConfigDir,

    /// A path was expected to be a directory but was not.
    #[error("{0} exists but is not a directory")]
    NotADirectory(PathBuf),

    /// Failed to create a directory.
    #[error("Failed to create directory {path}: {reason}")]
    CreateFailed { path: PathBuf, reason: String },

    /// A directory is not writable.
    #[error("Directory {path} is not writable: {reason}")]
    NotWritable { path: PathBuf, reason: String },
}

/// Default settings file: `$WORKDL_SETTINGS`, else `<config dir>/workdl/settings.json`.
pub fn default_settings_path() -> Result<PathBuf, PathError> {
    if let Ok(path) = env::var(SETTINGS_PATH_ENV) {
        if !path.trim().is_empty() {
            return Ok(PathBuf::from(path));
        }
    }
    let base = dirs::config_dir().ok_or(PathError::NoConfigDir)?;
    Ok(base.join("workdl").join("settings.json"))
}

/// Create `path` (and parents) if missing, then verify it is a writable directory.
pub fn ensure_directory(path: &Path) -> Result<(), PathError> {
    if path.exists() {
        if !path.is_dir() {
            return Err(PathError::NotADirectory(path.to_path_buf()));
        }
    } else {
        fs::create_dir_all(path).map_err(|e| PathError::CreateFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
    }

    verify_writable(path)
}

/// Verify a directory is writable by creating and removing a probe file.
pub fn verify_writable(path: &Path) -> Result<(), PathError> {
    let probe = path.join(".workdl_write_test");
    let result = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&probe);

    match result {
        Ok(mut file) => {
            file.write_all(b"ok").map_err(|e| PathError::NotWritable {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
            drop(file);
            let _ = fs::remove_file(&probe);
            Ok(())
        }
        Err(err) => Err(PathError::NotWritable {
            path: path.to_path_buf(),
            reason: err.to_string(),
        }),
    }
}
