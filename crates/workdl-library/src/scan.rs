//! Library scanning.
//!
//! The directory tree is the source of truth: every immediate subdirectory of
//! `usermaps/` and `mods/` is one item. Blocking; run it on the blocking pool.

use std::fs;
use std::path::Path;

use tracing::{debug, warn};
use walkdir::WalkDir;

use workdl_core::{
    EngineError, EngineResult, ItemKind, LibraryItem, WorkshopMetadata, format_bytes,
};

use crate::naming::{FolderNamingConvention, NamingInput};

/// Subdirectory of an item holding its files and metadata.
pub const ZONE_DIR: &str = "zone";

/// Metadata file inside [`ZONE_DIR`].
pub const METADATA_FILE: &str = "workshop.json";

/// Scan `install_root` and build one [`LibraryItem`] per item folder.
///
/// Items are ordered maps first, then by folder name (case-insensitive).
/// Kind directories that do not exist contribute nothing.
///
/// # Errors
///
/// `Validation` when `install_root` is not a directory.
pub fn scan_library(
    install_root: &Path,
    naming: &dyn FolderNamingConvention,
) -> EngineResult<Vec<LibraryItem>> {
    if !install_root.is_dir() {
        return Err(EngineError::validation(
            "installation directory does not exist",
        ));
    }

    let mut items = Vec::new();
    for kind in ItemKind::ALL {
        let base = install_root.join(kind.dir_name());
        if !base.is_dir() {
            continue;
        }
        let entries = match fs::read_dir(&base) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(target: "workdl.library", dir = kind.dir_name(), error = %e, "Cannot read library directory");
                continue;
            }
        };

        let mut found: Vec<LibraryItem> = entries
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_ok_and(|t| t.is_dir()))
            .filter_map(|entry| read_item(&entry.path(), kind, naming))
            .collect();
        found.sort_by_key(|item| item.folder_name.to_lowercase());
        items.extend(found);
    }

    debug!(
        target: "workdl.library",
        count = items.len(),
        naming = naming.name(),
        "Library scanned"
    );
    Ok(items)
}

/// Build an item from its folder. `None` when the folder cannot be read.
fn read_item(path: &Path, kind: ItemKind, naming: &dyn FolderNamingConvention) -> Option<LibraryItem> {
    let folder_name = path.file_name()?.to_string_lossy().into_owned();
    if let Err(e) = fs::read_dir(path) {
        warn!(target: "workdl.library", folder = %folder_name, error = %e, "Skipping unreadable item folder");
        return None;
    }

    let metadata = read_metadata(&path.join(ZONE_DIR).join(METADATA_FILE));
    let id = metadata
        .as_ref()
        .and_then(WorkshopMetadata::declared_id)
        .unwrap_or(folder_name.as_str())
        .to_string();
    let expected_folder = naming.expected_folder(&NamingInput {
        id: &id,
        folder_name: &folder_name,
        metadata: metadata.as_ref(),
    });
    let name = metadata
        .as_ref()
        .and_then(|m| m.title.as_deref())
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(folder_name.as_str())
        .to_string();
    let size_bytes = folder_size(path);

    Some(LibraryItem {
        needs_fix: folder_name != expected_folder,
        description: metadata.and_then(|m| m.description),
        id,
        name,
        expected_folder,
        kind,
        size_bytes,
        size: format_bytes(size_bytes),
        path: path.to_path_buf(),
        folder_name,
    })
}

/// Parse item metadata; missing or malformed files yield `None`.
pub fn read_metadata(path: &Path) -> Option<WorkshopMetadata> {
    let raw = fs::read_to_string(path).ok()?;
    match serde_json::from_str(&raw) {
        Ok(metadata) => Some(metadata),
        Err(e) => {
            debug!(target: "workdl.library", path = %path.display(), error = %e, "Ignoring malformed workshop.json");
            None
        }
    }
}

/// Recursive size of every regular file under `path`.
pub fn folder_size(path: &Path) -> u64 {
    WalkDir::new(path)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| entry.metadata().ok())
        .map(|meta| meta.len())
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::naming::DeclaredFolderName;
    use std::path::PathBuf;

    fn write_item(root: &Path, kind: &str, folder: &str, metadata: Option<&str>, bytes: usize) -> PathBuf {
        let zone = root.join(kind).join(folder).join(ZONE_DIR);
        fs::create_dir_all(&zone).unwrap();
        if let Some(meta) = metadata {
            fs::write(zone.join(METADATA_FILE), meta).unwrap();
        }
        fs::write(zone.join("data.ff"), vec![0u8; bytes]).unwrap();
        root.join(kind).join(folder)
    }

    #[test]
    fn test_scan_reads_metadata_and_flags_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        write_item(
            dir.path(),
            "usermaps",
            "123",
            Some(r#"{"PublisherID":"123","Title":"Castle","FolderName":"zm_castle","Type":"map"}"#),
            100,
        );
        write_item(
            dir.path(),
            "mods",
            "my_mod",
            Some(r#"{"PublisherID":"456","Title":"A Mod","FolderName":"my_mod","Type":"mod"}"#),
            10,
        );

        let items = scan_library(dir.path(), &DeclaredFolderName).unwrap();
        assert_eq!(items.len(), 2);

        let map = &items[0];
        assert_eq!(map.kind, ItemKind::Map);
        assert_eq!(map.id, "123");
        assert_eq!(map.name, "Castle");
        assert_eq!(map.expected_folder, "zm_castle");
        assert!(map.needs_fix);
        assert!(map.size_bytes >= 100);

        let module = &items[1];
        assert_eq!(module.kind, ItemKind::Mod);
        assert_eq!(module.id, "456");
        assert!(!module.needs_fix);
    }

    #[test]
    fn test_missing_or_bad_metadata_falls_back_to_folder() {
        let dir = tempfile::tempdir().unwrap();
        write_item(dir.path(), "usermaps", "999", None, 1);
        write_item(dir.path(), "usermaps", "broken", Some("{nope"), 1);

        let items = scan_library(dir.path(), &DeclaredFolderName).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].id, "999");
        assert_eq!(items[0].name, "999");
        assert_eq!(items[1].id, "broken");
        assert!(items.iter().all(|i| !i.needs_fix));
    }

    #[test]
    fn test_n_mismatched_folders() {
        let dir = tempfile::tempdir().unwrap();
        for n in 0..5 {
            let meta = format!(r#"{{"PublisherID":"{n}","FolderName":"expected_{n}"}}"#);
            write_item(dir.path(), "usermaps", &format!("wrong_{n}"), Some(&meta), 1);
        }
        let items = scan_library(dir.path(), &DeclaredFolderName).unwrap();
        assert_eq!(items.len(), 5);
        assert!(items.iter().all(|i| i.needs_fix));
    }

    #[test]
    fn test_files_in_kind_dir_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("usermaps")).unwrap();
        fs::write(dir.path().join("usermaps/readme.txt"), b"hi").unwrap();
        assert!(scan_library(dir.path(), &DeclaredFolderName).unwrap().is_empty());
    }

    #[test]
    fn test_missing_root_is_validation_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = scan_library(&dir.path().join("nope"), &DeclaredFolderName).unwrap_err();
        assert_eq!(err.kind(), workdl_core::ErrorKind::Validation);
    }
}
