//! [`LibraryPort`] implementation over the filesystem.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::task;
use tracing::info;

use workdl_core::{
    CompatibilityMismatch, EngineError, EngineResult, FixReport, FixSelection, LibraryItem,
    LibraryPort,
};

use crate::fixer::fix_items;
use crate::naming::{DeclaredFolderName, FolderNamingConvention};
use crate::scan::scan_library;

/// Filesystem-backed library with a read-through cache of the last scan.
#[derive(Debug)]
pub struct LibraryService {
    naming: Arc<dyn FolderNamingConvention>,
    cache: RwLock<Vec<LibraryItem>>,
}

impl Default for LibraryService {
    fn default() -> Self {
        Self::new()
    }
}

impl LibraryService {
    /// Service using the declared-folder-name convention.
    pub fn new() -> Self {
        Self::with_naming(Arc::new(DeclaredFolderName))
    }

    pub fn with_naming(naming: Arc<dyn FolderNamingConvention>) -> Self {
        Self {
            naming,
            cache: RwLock::new(Vec::new()),
        }
    }

    pub fn naming(&self) -> &dyn FolderNamingConvention {
        self.naming.as_ref()
    }
}

async fn blocking<T, F>(f: F) -> EngineResult<T>
where
    F: FnOnce() -> EngineResult<T> + Send + 'static,
    T: Send + 'static,
{
    task::spawn_blocking(f)
        .await
        .map_err(|e| EngineError::Internal(format!("library task failed: {e}")))?
}

#[async_trait]
impl LibraryPort for LibraryService {
    async fn scan(&self, install_root: &Path) -> EngineResult<Vec<LibraryItem>> {
        let root = install_root.to_path_buf();
        let naming = Arc::clone(&self.naming);
        let items = blocking(move || scan_library(&root, naming.as_ref())).await?;
        self.cache.write().await.clone_from(&items);
        Ok(items)
    }

    async fn cached(&self) -> Vec<LibraryItem> {
        self.cache.read().await.clone()
    }

    async fn remove(&self, install_root: &Path, key: &str) -> EngineResult<LibraryItem> {
        let items = self.scan(install_root).await?;
        let item = items
            .into_iter()
            .find(|item| item.matches(key))
            .ok_or_else(|| EngineError::NotFound(format!("library item '{key}'")))?;

        let path: PathBuf = item.path.clone();
        blocking(move || {
            std::fs::remove_dir_all(&path).map_err(|e| EngineError::io("remove library item", e))
        })
        .await?;
        info!(target: "workdl.library", id = %item.id, folder = %item.folder_name, "Removed library item");

        self.scan(install_root).await?;
        Ok(item)
    }

    async fn mismatches(&self, install_root: &Path) -> EngineResult<Vec<CompatibilityMismatch>> {
        let items = self.scan(install_root).await?;
        Ok(items
            .iter()
            .filter_map(CompatibilityMismatch::from_item)
            .collect())
    }

    async fn fix(&self, install_root: &Path, selection: &FixSelection) -> EngineResult<FixReport> {
        let items = self.scan(install_root).await?;
        let owned = selection.clone();
        let report = blocking(move || Ok(fix_items(&items, &owned))).await?;

        // needs_fix must reflect the renamed folders
        self.scan(install_root).await?;

        if let FixSelection::Ids(ids) = selection {
            if report.missing.len() == ids.len() {
                return Err(EngineError::NotFound(format!(
                    "no installed items match {}",
                    report.missing.join(", ")
                )));
            }
        }
        info!(
            target: "workdl.library",
            fixed = report.fixed_count,
            failed = report.failed.len(),
            missing = report.missing.len(),
            "Compatibility fix finished"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::naming::WorkshopIdFolder;
    use crate::scan::{METADATA_FILE, ZONE_DIR};
    use std::fs;
    use workdl_core::{ErrorKind, WorkshopItemId};

    fn install(root: &Path, folder: &str, id: &str, declared: &str) {
        let zone = root.join("usermaps").join(folder).join(ZONE_DIR);
        fs::create_dir_all(&zone).unwrap();
        fs::write(
            zone.join(METADATA_FILE),
            format!(r#"{{"PublisherID":"{id}","Title":"T{id}","FolderName":"{declared}","Type":"map"}}"#),
        )
        .unwrap();
    }

    #[tokio::test]
    async fn test_fix_twice_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        install(dir.path(), "100", "100", "zm_a");
        install(dir.path(), "200", "200", "zm_b");
        let service = LibraryService::new();

        assert_eq!(service.mismatches(dir.path()).await.unwrap().len(), 2);

        let first = service.fix(dir.path(), &FixSelection::All).await.unwrap();
        assert_eq!(first.fixed_count, 2);
        let second = service.fix(dir.path(), &FixSelection::All).await.unwrap();
        assert_eq!(second.fixed_count, 0);

        assert!(service.cached().await.iter().all(|i| !i.needs_fix));
    }

    #[tokio::test]
    async fn test_fix_only_missing_ids_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        install(dir.path(), "100", "100", "zm_a");
        let service = LibraryService::new();

        let selection = FixSelection::Ids(vec![WorkshopItemId::parse("999").unwrap()]);
        let err = service.fix(dir.path(), &selection).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_remove_by_id_and_folder() {
        let dir = tempfile::tempdir().unwrap();
        install(dir.path(), "zm_a", "100", "zm_a");
        install(dir.path(), "zm_b", "200", "zm_b");
        let service = LibraryService::new();

        let removed = service.remove(dir.path(), "100").await.unwrap();
        assert_eq!(removed.folder_name, "zm_a");
        assert!(!dir.path().join("usermaps/zm_a").exists());

        service.remove(dir.path(), "ZM_B").await.unwrap();
        assert!(service.cached().await.is_empty());

        let err = service.remove(dir.path(), "100").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_custom_naming_convention() {
        let dir = tempfile::tempdir().unwrap();
        install(dir.path(), "zm_a", "100", "zm_a");
        let service = LibraryService::with_naming(Arc::new(WorkshopIdFolder));

        let mismatches = service.mismatches(dir.path()).await.unwrap();
        assert_eq!(mismatches.len(), 1);
        assert_eq!(mismatches[0].expected_folder, "100");
    }
}
