//! Folder naming conventions.
//!
//! The compatibility layer loads an item from a folder with a specific name.
//! A convention maps what is known about an installed item to that name;
//! items whose folder differs are reported as mismatches.

use std::fmt::Debug;

use workdl_core::WorkshopMetadata;

/// What a convention gets to look at.
#[derive(Debug, Clone, Copy)]
pub struct NamingInput<'a> {
    /// Workshop id, or the folder name when no id is known.
    pub id: &'a str,
    /// Current folder name on disk.
    pub folder_name: &'a str,
    /// Parsed `zone/workshop.json`, if present.
    pub metadata: Option<&'a WorkshopMetadata>,
}

/// Pure mapping from an installed item to its expected folder name.
pub trait FolderNamingConvention: Send + Sync + Debug {
    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    /// Expected folder name for the item.
    fn expected_folder(&self, input: &NamingInput<'_>) -> String;
}

/// `FolderName` from metadata, else the workshop id.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeclaredFolderName;

impl FolderNamingConvention for DeclaredFolderName {
    fn name(&self) -> &'static str {
        "declared-folder-name"
    }

    fn expected_folder(&self, input: &NamingInput<'_>) -> String {
        input
            .metadata
            .and_then(WorkshopMetadata::declared_folder)
            .unwrap_or(input.id)
            .to_string()
    }
}

/// Always the workshop id.
#[derive(Debug, Clone, Copy, Default)]
pub struct WorkshopIdFolder;

impl FolderNamingConvention for WorkshopIdFolder {
    fn name(&self) -> &'static str {
        "workshop-id"
    }

    fn expected_folder(&self, input: &NamingInput<'_>) -> String {
        input.id.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata(folder: Option<&str>) -> WorkshopMetadata {
        WorkshopMetadata {
            publisher_id: Some("123".to_string()),
            folder_name: folder.map(str::to_string),
            ..WorkshopMetadata::default()
        }
    }

    #[test]
    fn test_declared_folder_name() {
        let meta = metadata(Some("zm_castle"));
        let input = NamingInput {
            id: "123",
            folder_name: "123",
            metadata: Some(&meta),
        };
        assert_eq!(DeclaredFolderName.expected_folder(&input), "zm_castle");
        assert_eq!(WorkshopIdFolder.expected_folder(&input), "123");
    }

    #[test]
    fn test_declared_falls_back_to_id() {
        let meta = metadata(None);
        let input = NamingInput {
            id: "123",
            folder_name: "whatever",
            metadata: Some(&meta),
        };
        assert_eq!(DeclaredFolderName.expected_folder(&input), "123");

        let bare = NamingInput {
            id: "my_folder",
            folder_name: "my_folder",
            metadata: None,
        };
        assert_eq!(DeclaredFolderName.expected_folder(&bare), "my_folder");
    }
}
