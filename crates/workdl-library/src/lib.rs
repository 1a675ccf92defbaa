//! Library reconciler for workdl.
//!
//! Scans installed workshop items, detects folders that break the naming
//! convention the game's compatibility layer expects, and renames them.
#![deny(unused_crate_dependencies)]

pub mod fixer;
pub mod naming;
pub mod scan;
mod service;

pub use fixer::fix_items;
pub use naming::{DeclaredFolderName, FolderNamingConvention, NamingInput, WorkshopIdFolder};
pub use scan::{METADATA_FILE, ZONE_DIR, folder_size, read_metadata, scan_library};
pub use service::LibraryService;
