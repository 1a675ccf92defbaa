//! Library port: scanning, removal and compatibility fixing of installed items.
//!
//! The download engine only needs to rescan after a completed fetch and to ask
//! whether an item is installed; the concrete reconciler lives in its own crate.

use std::path::Path;

use async_trait::async_trait;

use crate::errors::EngineError;
use crate::library::{CompatibilityMismatch, FixReport, FixSelection, LibraryItem};

#[async_trait]
pub trait LibraryPort: Send + Sync {
    /// Rescan `install_root` and refresh the cached item list.
    async fn scan(&self, install_root: &Path) -> Result<Vec<LibraryItem>, EngineError>;

    /// Items from the most recent scan, without touching the disk.
    async fn cached(&self) -> Vec<LibraryItem>;

    /// Delete the item matching `key` (workshop id or folder name).
    async fn remove(&self, install_root: &Path, key: &str) -> Result<LibraryItem, EngineError>;

    /// Rescan and return the items whose folder breaks the naming convention.
    async fn mismatches(&self, install_root: &Path)
    -> Result<Vec<CompatibilityMismatch>, EngineError>;

    /// Rename mismatched folders, then rescan.
    async fn fix(
        &self,
        install_root: &Path,
        selection: &FixSelection,
    ) -> Result<FixReport, EngineError>;
}
