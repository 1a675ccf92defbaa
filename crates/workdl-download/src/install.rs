//! Installation of fetched content into the game library.
//!
//! The fetch tool leaves an item under its staging content directory. The
//! installer locates the item's `workshop.json`, picks the library
//! subdirectory from its `Type`, and copies everything into
//! `<install_root>/<usermaps|mods>/<folder>/zone/`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use workdl_core::{EngineError, ItemKind, WorkshopItemId, WorkshopMetadata};

use crate::supervisor::StagingLayout;

/// Metadata file name shipped with every item.
pub const METADATA_FILE: &str = "workshop.json";

/// Library subdirectory holding an item's files.
pub const ZONE_DIR: &str = "zone";

/// How deep below the staging directories `workshop.json` is searched.
const METADATA_SEARCH_DEPTH: usize = 4;

/// Errors raised while installing fetched content.
#[derive(Debug, Error)]
pub enum InstallError {
    #[error("workshop.json was not produced by the fetch tool")]
    MissingMetadata,

    #[error("unable to read workshop.json: {0}")]
    InvalidMetadata(String),

    #[error("failed to {action}: {source}")]
    Io {
        action: &'static str,
        #[source]
        source: io::Error,
    },
}

impl InstallError {
    fn io(action: &'static str) -> impl FnOnce(io::Error) -> Self {
        move |source| Self::Io { action, source }
    }
}

impl From<InstallError> for EngineError {
    fn from(err: InstallError) -> Self {
        match err {
            InstallError::Io { action, source } => Self::io(action, source),
            other => Self::Subprocess(other.to_string()),
        }
    }
}

/// Where an item ended up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstalledItem {
    pub item_id: WorkshopItemId,
    pub folder_name: String,
    pub kind: ItemKind,
    pub path: PathBuf,
    pub title: Option<String>,
    pub files_copied: usize,
}

/// Copy a fetched item from staging into the library.
pub fn install_item(
    item_id: &WorkshopItemId,
    layout: &StagingLayout,
    install_root: &Path,
    clean_on_finish: bool,
) -> Result<InstalledItem, InstallError> {
    let content_dir = layout.content_dir(item_id);
    let download_dir = layout.download_dir(item_id);

    let metadata_path = find_metadata(&content_dir, &download_dir)?;
    let source_root = if metadata_path.starts_with(&content_dir) {
        content_dir.clone()
    } else {
        metadata_path
            .parent()
            .map_or_else(|| content_dir.clone(), Path::to_path_buf)
    };

    let metadata = read_metadata(&metadata_path)?;
    let kind = metadata.kind();
    let folder_name = choose_folder_name(&metadata, item_id);

    let destination = install_root
        .join(kind.dir_name())
        .join(&folder_name)
        .join(ZONE_DIR);
    fs::create_dir_all(&destination).map_err(InstallError::io("create library folder"))?;

    let files_copied = copy_tree(&source_root, &destination)?;
    info!(
        target: "workdl.download",
        item_id = %item_id,
        folder = %folder_name,
        kind = kind.dir_name(),
        files_copied,
        "Installed item"
    );

    if clean_on_finish {
        remove_staging(&content_dir);
        remove_staging(&download_dir);
    }

    Ok(InstalledItem {
        item_id: item_id.clone(),
        path: install_root.join(kind.dir_name()).join(&folder_name),
        folder_name,
        kind,
        title: metadata.title.filter(|t| !t.trim().is_empty()),
        files_copied,
    })
}

fn find_metadata(content_dir: &Path, download_dir: &Path) -> Result<PathBuf, InstallError> {
    let direct = content_dir.join(METADATA_FILE);
    if direct.is_file() {
        return Ok(direct);
    }
    [content_dir, download_dir]
        .into_iter()
        .filter(|dir| dir.is_dir())
        .find_map(|dir| {
            WalkDir::new(dir)
                .max_depth(METADATA_SEARCH_DEPTH)
                .sort_by_file_name()
                .into_iter()
                .filter_map(Result::ok)
                .find(|e| e.file_type().is_file() && e.file_name() == METADATA_FILE)
                .map(walkdir::DirEntry::into_path)
        })
        .ok_or(InstallError::MissingMetadata)
}

fn read_metadata(path: &Path) -> Result<WorkshopMetadata, InstallError> {
    let raw = fs::read_to_string(path).map_err(InstallError::io("read workshop.json"))?;
    serde_json::from_str(&raw).map_err(|e| InstallError::InvalidMetadata(e.to_string()))
}

/// `FolderName`, else `PublisherID`, else the workshop id.
///
/// Values that are not a single path component fall back to the id.
fn choose_folder_name(metadata: &WorkshopMetadata, item_id: &WorkshopItemId) -> String {
    let declared = metadata.declared_folder().or_else(|| metadata.declared_id());
    match declared {
        Some(name) if is_plain_component(name) => name.to_string(),
        Some(name) => {
            warn!(target: "workdl.download", item_id = %item_id, folder = name, "Ignoring unsafe folder name from metadata");
            item_id.to_string()
        }
        None => item_id.to_string(),
    }
}

fn is_plain_component(name: &str) -> bool {
    name != "." && name != ".." && !name.contains(['/', '\\', ':'])
}

/// Recursively copy `src` into `dst`, overwriting existing files.
fn copy_tree(src: &Path, dst: &Path) -> Result<usize, InstallError> {
    let mut copied = 0;
    for entry in WalkDir::new(src).min_depth(1) {
        let entry = entry.map_err(|e| InstallError::Io {
            action: "read fetched content",
            source: e.into(),
        })?;
        let Ok(relative) = entry.path().strip_prefix(src) else {
            continue;
        };
        let target = dst.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).map_err(InstallError::io("create library folder"))?;
        } else if entry.file_type().is_file() {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).map_err(InstallError::io("create library folder"))?;
            }
            fs::copy(entry.path(), &target).map_err(InstallError::io("copy item content"))?;
            copied += 1;
        }
    }
    Ok(copied)
}

fn remove_staging(dir: &Path) {
    match fs::remove_dir_all(dir) {
        Ok(()) => debug!(target: "workdl.download", path = %dir.display(), "Removed staging directory"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => {
            warn!(target: "workdl.download", path = %dir.display(), error = %e, "Failed to clean staging directory");
        }
    }
}
