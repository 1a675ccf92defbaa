//! Library domain types: installed items, item metadata and compatibility fixes.

use serde::{Deserialize, Deserializer, Serialize};
use std::path::PathBuf;

use crate::errors::EngineError;
use crate::item::WorkshopItemId;

/// Kind of installed content; decides the library subdirectory.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Map,
    Mod,
}

impl ItemKind {
    /// Both kinds, in scan order.
    pub const ALL: [Self; 2] = [Self::Map, Self::Mod];

    /// Library subdirectory holding items of this kind.
    #[must_use]
    pub const fn dir_name(self) -> &'static str {
        match self {
            Self::Map => "usermaps",
            Self::Mod => "mods",
        }
    }

    /// Interpret the `Type` field of item metadata. Anything but `mod` is a map.
    #[must_use]
    pub fn from_metadata_type(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(t) if t.eq_ignore_ascii_case("mod") => Self::Mod,
            _ => Self::Map,
        }
    }
}

/// Metadata file shipped with each workshop item (`workshop.json`).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkshopMetadata {
    #[serde(rename = "PublisherID", default, deserialize_with = "string_or_number")]
    pub publisher_id: Option<String>,
    #[serde(rename = "Title", default)]
    pub title: Option<String>,
    #[serde(rename = "FolderName", default)]
    pub folder_name: Option<String>,
    #[serde(rename = "Type", default)]
    pub item_type: Option<String>,
    #[serde(rename = "Description", default)]
    pub description: Option<String>,
}

impl WorkshopMetadata {
    /// Declared folder name, ignoring blanks.
    #[must_use]
    pub fn declared_folder(&self) -> Option<&str> {
        self.folder_name
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Declared publisher id, ignoring blanks.
    #[must_use]
    pub fn declared_id(&self) -> Option<&str> {
        self.publisher_id
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    pub fn kind(&self) -> ItemKind {
        ItemKind::from_metadata_type(self.item_type.as_deref())
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// One installed item, as found by a library scan.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryItem {
    /// Workshop id, or the folder name when no id is known.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Current folder name on disk.
    pub folder_name: String,
    /// Folder name the compatibility layer expects.
    pub expected_folder: String,
    pub kind: ItemKind,
    pub size_bytes: u64,
    /// Human-readable size on disk.
    pub size: String,
    pub path: PathBuf,
    /// True when `folder_name != expected_folder`.
    pub needs_fix: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl LibraryItem {
    /// Whether this item answers to the given workshop id or folder name.
    #[must_use]
    pub fn matches(&self, key: &str) -> bool {
        self.id == key || self.folder_name.eq_ignore_ascii_case(key)
    }
}

/// An installed item whose folder does not follow the naming convention.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompatibilityMismatch {
    pub id: String,
    pub name: String,
    pub folder_name: String,
    pub expected_folder: String,
    pub kind: ItemKind,
    pub path: PathBuf,
}

impl CompatibilityMismatch {
    /// Project a library item; `None` when it needs no fix.
    #[must_use]
    pub fn from_item(item: &LibraryItem) -> Option<Self> {
        item.needs_fix.then(|| Self {
            id: item.id.clone(),
            name: item.name.clone(),
            folder_name: item.folder_name.clone(),
            expected_folder: item.expected_folder.clone(),
            kind: item.kind,
            path: item.path.clone(),
        })
    }
}

/// Which mismatches a fix request targets.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawSelection", into = "RawSelection")]
pub enum FixSelection {
    /// Every current mismatch.
    All,
    /// Only these items.
    Ids(Vec<WorkshopItemId>),
}

impl FixSelection {
    /// Build a selection from request items: `"all"` anywhere selects everything.
    pub fn from_items<S: AsRef<str>>(items: &[S]) -> Result<Self, EngineError> {
        if items.is_empty() {
            return Err(EngineError::validation("no items selected for fixing"));
        }
        if items
            .iter()
            .any(|i| i.as_ref().trim().eq_ignore_ascii_case("all"))
        {
            return Ok(Self::All);
        }
        let ids = items
            .iter()
            .map(|i| WorkshopItemId::parse(i.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::Ids(ids))
    }

    /// Whether an item with this id is selected.
    #[must_use]
    pub fn includes(&self, id: &str) -> bool {
        match self {
            Self::All => true,
            Self::Ids(ids) => ids.iter().any(|i| i.as_str() == id),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum RawSelection {
    Word(String),
    List(Vec<String>),
}

impl TryFrom<RawSelection> for FixSelection {
    type Error = EngineError;

    fn try_from(raw: RawSelection) -> Result<Self, Self::Error> {
        match raw {
            RawSelection::Word(word) => Self::from_items(&[word]),
            RawSelection::List(list) => Self::from_items(&list),
        }
    }
}

impl From<FixSelection> for RawSelection {
    fn from(selection: FixSelection) -> Self {
        match selection {
            FixSelection::All => Self::Word("all".to_string()),
            FixSelection::Ids(ids) => Self::List(ids.into_iter().map(String::from).collect()),
        }
    }
}

/// One successful rename.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixedItem {
    pub id: String,
    pub old_name: String,
    pub new_name: String,
    pub kind: ItemKind,
}

/// One rename that did not happen.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixFailure {
    pub id: String,
    pub folder_name: String,
    pub reason: String,
}

/// Outcome of a compatibility fix batch. Partial success is normal.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixReport {
    pub fixed: Vec<FixedItem>,
    pub failed: Vec<FixFailure>,
    /// Requested ids that are not installed.
    pub missing: Vec<String>,
    pub fixed_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_parses_numeric_publisher_id() {
        let meta: WorkshopMetadata = serde_json::from_str(
            r#"{"PublisherID": 2873415912, "Title": "Kino", "FolderName": "zm_kino", "Type": "map"}"#,
        )
        .unwrap();
        assert_eq!(meta.declared_id(), Some("2873415912"));
        assert_eq!(meta.declared_folder(), Some("zm_kino"));
        assert_eq!(meta.kind(), ItemKind::Map);
    }

    #[test]
    fn test_metadata_blank_folder_is_ignored() {
        let meta: WorkshopMetadata =
            serde_json::from_str(r#"{"FolderName": "  ", "Type": "Mod"}"#).unwrap();
        assert_eq!(meta.declared_folder(), None);
        assert_eq!(meta.kind(), ItemKind::Mod);
    }

    #[test]
    fn test_fix_selection_from_json() {
        let all: FixSelection = serde_json::from_str("\"all\"").unwrap();
        assert_eq!(all, FixSelection::All);

        let list_with_all: FixSelection = serde_json::from_str(r#"["1", "all"]"#).unwrap();
        assert_eq!(list_with_all, FixSelection::All);

        let ids: FixSelection = serde_json::from_str(r#"["1", "2"]"#).unwrap();
        assert!(ids.includes("2"));
        assert!(!ids.includes("3"));
    }

    #[test]
    fn test_fix_selection_rejects_empty_and_bad_ids() {
        assert!(serde_json::from_str::<FixSelection>("[]").is_err());
        assert!(serde_json::from_str::<FixSelection>(r#"["abc"]"#).is_err());
    }

    #[test]
    fn test_mismatch_projection() {
        let mut item = LibraryItem {
            id: "7".into(),
            name: "Seven".into(),
            folder_name: "7".into(),
            expected_folder: "zm_seven".into(),
            kind: ItemKind::Map,
            size_bytes: 0,
            size: "0 B".into(),
            path: PathBuf::from("/lib/usermaps/7"),
            needs_fix: true,
            description: None,
        };
        assert!(CompatibilityMismatch::from_item(&item).is_some());
        item.needs_fix = false;
        assert!(CompatibilityMismatch::from_item(&item).is_none());
        assert!(item.matches("7"));
        assert!(!item.matches("8"));
    }
}
