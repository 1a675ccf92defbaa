//! Compatibility fixer: rename item folders to their expected names.
//!
//! Works on a fresh scan result. Renames stay inside the item's kind
//! directory; an existing target is never overwritten.

use std::fs;
use std::path::Path;

use tracing::{info, warn};

use workdl_core::{FixFailure, FixReport, FixSelection, FixedItem, LibraryItem};

/// Rename every selected item that needs a fix.
///
/// Selected ids with no installed item are listed in `missing`. Items that
/// are already correct are skipped silently.
pub fn fix_items(items: &[LibraryItem], selection: &FixSelection) -> FixReport {
    let mut report = FixReport::default();

    if let FixSelection::Ids(ids) = selection {
        report.missing = ids
            .iter()
            .filter(|id| !items.iter().any(|item| item.id == id.as_str()))
            .map(ToString::to_string)
            .collect();
    }

    for item in items
        .iter()
        .filter(|item| item.needs_fix && selection.includes(&item.id))
    {
        match rename_item(item) {
            Ok(fixed) => {
                info!(
                    target: "workdl.library",
                    id = %fixed.id,
                    from = %fixed.old_name,
                    to = %fixed.new_name,
                    "Renamed item folder"
                );
                report.fixed.push(fixed);
            }
            Err(reason) => {
                warn!(target: "workdl.library", id = %item.id, folder = %item.folder_name, %reason, "Rename failed");
                report.failed.push(FixFailure {
                    id: item.id.clone(),
                    folder_name: item.folder_name.clone(),
                    reason,
                });
            }
        }
    }

    report.fixed_count = report.fixed.len();
    report
}

fn rename_item(item: &LibraryItem) -> Result<FixedItem, String> {
    let expected = item.expected_folder.as_str();
    if !is_plain_component(expected) {
        return Err(format!("invalid expected folder name '{expected}'"));
    }
    let parent = item
        .path
        .parent()
        .ok_or_else(|| "item folder has no parent".to_string())?;
    let target = parent.join(expected);
    if target_taken(&item.path, &target) {
        return Err(format!("a folder named '{expected}' already exists"));
    }
    fs::rename(&item.path, &target).map_err(|e| e.to_string())?;
    Ok(FixedItem {
        id: item.id.clone(),
        old_name: item.folder_name.clone(),
        new_name: expected.to_string(),
        kind: item.kind,
    })
}

/// Whether `target` exists as something other than `source` itself.
///
/// On case-insensitive filesystems a case-only rename finds its own source.
fn target_taken(source: &Path, target: &Path) -> bool {
    if !target.exists() {
        return false;
    }
    match (fs::canonicalize(source), fs::canonicalize(target)) {
        (Ok(a), Ok(b)) => a != b,
        _ => true,
    }
}

fn is_plain_component(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\', ':'])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use workdl_core::{ItemKind, WorkshopItemId};

    fn item(root: &Path, id: &str, folder: &str, expected: &str) -> LibraryItem {
        let path = root.join("usermaps").join(folder);
        fs::create_dir_all(&path).unwrap();
        LibraryItem {
            id: id.to_string(),
            name: id.to_string(),
            folder_name: folder.to_string(),
            expected_folder: expected.to_string(),
            kind: ItemKind::Map,
            size_bytes: 0,
            size: "0 B".to_string(),
            path,
            needs_fix: folder != expected,
            description: None,
        }
    }

    fn ids(values: &[&str]) -> FixSelection {
        FixSelection::Ids(
            values
                .iter()
                .map(|v| WorkshopItemId::parse(v).unwrap())
                .collect(),
        )
    }

    #[test]
    fn test_fix_all_renames_mismatches() {
        let dir = tempfile::tempdir().unwrap();
        let items = vec![
            item(dir.path(), "1", "1", "zm_one"),
            item(dir.path(), "2", "zm_two", "zm_two"),
        ];

        let report = fix_items(&items, &FixSelection::All);

        assert_eq!(report.fixed_count, 1);
        assert_eq!(report.fixed[0].old_name, "1");
        assert_eq!(report.fixed[0].new_name, "zm_one");
        assert!(dir.path().join("usermaps/zm_one").is_dir());
        assert!(!dir.path().join("usermaps/1").exists());
        assert!(report.failed.is_empty());
    }

    #[test]
    fn test_existing_target_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("usermaps/zm_taken")).unwrap();
        let items = vec![item(dir.path(), "5", "5", "zm_taken")];

        let report = fix_items(&items, &FixSelection::All);

        assert_eq!(report.fixed_count, 0);
        assert_eq!(report.failed.len(), 1);
        assert!(report.failed[0].reason.contains("already exists"));
        assert!(dir.path().join("usermaps/5").is_dir());
    }

    #[test]
    fn test_selection_and_missing_ids() {
        let dir = tempfile::tempdir().unwrap();
        let items = vec![
            item(dir.path(), "1", "1", "zm_one"),
            item(dir.path(), "2", "2", "zm_two"),
        ];

        let report = fix_items(&items, &ids(&["2", "42"]));

        assert_eq!(report.fixed_count, 1);
        assert_eq!(report.fixed[0].id, "2");
        assert_eq!(report.missing, vec!["42".to_string()]);
        assert!(dir.path().join("usermaps/1").is_dir());
    }

    #[test]
    fn test_unsafe_expected_name_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let items = vec![item(dir.path(), "1", "1", "../escape")];
        let report = fix_items(&items, &FixSelection::All);
        assert_eq!(report.failed.len(), 1);
        assert!(!PathBuf::from(dir.path()).join("escape").exists());
    }
}
