//! Fetch tool invocation: executable resolution, arguments and staging layout.

use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::{Child, Command};

use workdl_core::{STEAM_APP_ID, WorkshopItemId};

/// Staging directory name created next to the fetch tool.
pub const STAGING_DIR_NAME: &str = "workdl_staging";

#[cfg(windows)]
const TOOL_CANDIDATES: &[&str] = &["steamcmd.exe"];
#[cfg(not(windows))]
const TOOL_CANDIDATES: &[&str] = &["steamcmd.sh", "steamcmd"];

/// Resolve the configured fetch tool location to an executable path.
///
/// A directory is searched for the platform's SteamCMD launcher; when none is
/// present the first candidate is returned and spawning reports the failure.
pub fn resolve_fetch_tool(configured: &Path) -> PathBuf {
    if !configured.is_dir() {
        return configured.to_path_buf();
    }
    TOOL_CANDIDATES
        .iter()
        .map(|name| configured.join(name))
        .find(|candidate| candidate.is_file())
        .unwrap_or_else(|| configured.join(TOOL_CANDIDATES[0]))
}

/// Default staging root for a resolved tool: a sibling `workdl_staging` directory.
pub fn default_staging_root(tool: &Path) -> PathBuf {
    tool.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
        .join(STAGING_DIR_NAME)
}

/// Where the fetch tool puts an item inside the staging root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagingLayout {
    root: PathBuf,
}

impl StagingLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn workshop_dir(&self, section: &str) -> PathBuf {
        self.root
            .join("steamapps")
            .join("workshop")
            .join(section)
            .join(STEAM_APP_ID.to_string())
    }

    /// Finished item content.
    pub fn content_dir(&self, id: &WorkshopItemId) -> PathBuf {
        self.workshop_dir("content").join(id.as_str())
    }

    /// In-flight chunks for an item.
    pub fn download_dir(&self, id: &WorkshopItemId) -> PathBuf {
        self.workshop_dir("downloads").join(id.as_str())
    }
}

/// One fetch tool invocation.
#[derive(Debug, Clone)]
pub struct FetchCommand {
    program: PathBuf,
    staging_root: PathBuf,
    item_id: WorkshopItemId,
}

impl FetchCommand {
    pub fn new(program: &Path, staging_root: &Path, item_id: &WorkshopItemId) -> Self {
        Self {
            program: program.to_path_buf(),
            staging_root: staging_root.to_path_buf(),
            item_id: item_id.clone(),
        }
    }

    /// Command-line arguments, in order.
    pub fn args(&self) -> Vec<String> {
        vec![
            "+force_install_dir".to_string(),
            self.staging_root.display().to_string(),
            "+login".to_string(),
            "anonymous".to_string(),
            "+workshop_download_item".to_string(),
            STEAM_APP_ID.to_string(),
            self.item_id.to_string(),
            "validate".to_string(),
            "+quit".to_string(),
        ]
    }

    /// Spawn with piped output. The child is killed if its handle is dropped.
    pub fn spawn(&self) -> io::Result<Child> {
        let mut cmd = Command::new(&self.program);
        cmd.args(self.args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = self.program.parent().filter(|p| p.is_dir()) {
            cmd.current_dir(dir);
        }
        cmd.spawn()
    }
}

/// User-facing description of a spawn error, without filesystem paths.
pub fn describe_spawn_error(err: &io::Error) -> String {
    match err.kind() {
        io::ErrorKind::NotFound => "fetch tool executable not found".to_string(),
        io::ErrorKind::PermissionDenied => "permission denied launching fetch tool".to_string(),
        _ => format!("could not launch fetch tool ({})", err.kind()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_order() {
        let id = WorkshopItemId::parse("2873415912").unwrap();
        let cmd = FetchCommand::new(
            Path::new("/opt/steamcmd/steamcmd.sh"),
            Path::new("/opt/steamcmd/workdl_staging"),
            &id,
        );
        assert_eq!(
            cmd.args(),
            vec![
                "+force_install_dir",
                "/opt/steamcmd/workdl_staging",
                "+login",
                "anonymous",
                "+workshop_download_item",
                "311210",
                "2873415912",
                "validate",
                "+quit",
            ]
        );
    }

    #[test]
    fn test_layout_paths() {
        let layout = StagingLayout::new("/stage");
        let id = WorkshopItemId::parse("7").unwrap();
        assert_eq!(
            layout.content_dir(&id),
            PathBuf::from("/stage/steamapps/workshop/content/311210/7")
        );
        assert_eq!(
            layout.download_dir(&id),
            PathBuf::from("/stage/steamapps/workshop/downloads/311210/7")
        );
    }

    #[test]
    fn test_resolve_file_path_is_kept() {
        let path = Path::new("/nonexistent/steamcmd.sh");
        assert_eq!(resolve_fetch_tool(path), path);
    }

    #[test]
    fn test_resolve_directory_finds_launcher() {
        let dir = tempfile::tempdir().unwrap();
        let launcher = dir.path().join(TOOL_CANDIDATES[0]);
        std::fs::write(&launcher, b"").unwrap();
        assert_eq!(resolve_fetch_tool(dir.path()), launcher);
    }

    #[test]
    fn test_default_staging_root() {
        assert_eq!(
            default_staging_root(Path::new("/opt/steamcmd/steamcmd.sh")),
            PathBuf::from("/opt/steamcmd/workdl_staging")
        );
        assert_eq!(
            default_staging_root(Path::new("steamcmd")),
            PathBuf::from("./workdl_staging")
        );
    }

    #[test]
    fn test_spawn_error_hides_paths() {
        let err = io::Error::new(io::ErrorKind::NotFound, "/secret/path missing");
        assert_eq!(describe_spawn_error(&err), "fetch tool executable not found");
    }

    #[tokio::test]
    async fn test_spawn_missing_binary_fails() {
        let id = WorkshopItemId::parse("1").unwrap();
        let cmd = FetchCommand::new(
            Path::new("/definitely/not/here/steamcmd"),
            Path::new("/tmp"),
            &id,
        );
        assert!(cmd.spawn().is_err());
    }
}
