//! Game launch.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use serde::Serialize;
use tokio::process::Command;
use tracing::{debug, info};

use workdl_core::{EngineError, EngineResult};

use super::DownloadEngine;

/// Acknowledgement of a launched game process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LaunchAck {
    pub executable: String,
    pub pid: Option<u32>,
}

/// Paths tried for the configured executable, in order.
///
/// A name without `.exe` gets the suffix appended; off Windows the plain name
/// is tried as well.
pub fn game_executable_candidates(root: &Path, name: &str) -> Vec<PathBuf> {
    let name = name.trim();
    if name.to_ascii_lowercase().ends_with(".exe") {
        return vec![root.join(name)];
    }
    let mut candidates = vec![root.join(format!("{name}.exe"))];
    if cfg!(not(windows)) {
        candidates.push(root.join(name));
    }
    candidates
}

impl DownloadEngine {
    /// Launch the game from the install directory with its parameters.
    ///
    /// The process is detached; a background task reaps it.
    pub async fn launch_game(&self) -> EngineResult<LaunchAck> {
        let settings = self.load_settings().await?;
        let root = settings.require_install_dir()?;
        if !root.is_dir() {
            return Err(EngineError::validation(
                "installation directory does not exist",
            ));
        }

        let executable = game_executable_candidates(root, &settings.game_executable)
            .into_iter()
            .find(|p| p.is_file())
            .ok_or_else(|| EngineError::NotFound("game executable".to_string()))?;

        let mut child = Command::new(&executable)
            .args(settings.launch_args())
            .current_dir(root)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| EngineError::io("launch game", e))?;

        let pid = child.id();
        let name = executable
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        info!(target: "workdl.download", executable = %name, ?pid, "Game launched");

        tokio::spawn(async move {
            let status = child.wait().await;
            debug!(target: "workdl.download", ?status, "Game process exited");
        });

        Ok(LaunchAck {
            executable: name,
            pid,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidates_append_exe() {
        let root = Path::new("/games/bo3");
        let candidates = game_executable_candidates(root, "BlackOps3");
        assert_eq!(candidates[0], root.join("BlackOps3.exe"));
        if cfg!(not(windows)) {
            assert_eq!(candidates[1], root.join("BlackOps3"));
        }
    }

    #[test]
    fn test_candidates_keep_explicit_exe() {
        let root = Path::new("/games/bo3");
        assert_eq!(
            game_executable_candidates(root, "BlackOps3.EXE"),
            vec![root.join("BlackOps3.EXE")]
        );
    }
}
