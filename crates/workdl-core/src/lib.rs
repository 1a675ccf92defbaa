//! Core domain types and ports for the workdl download engine.
//!
//! This crate holds everything the engine crates agree on: workshop item
//! identifiers, the download session model, library items, settings, the
//! error taxonomy and the port traits adapters implement. It performs no
//! subprocess or network I/O.
#![deny(unused_crate_dependencies)]

pub mod errors;
pub mod format;
pub mod item;
pub mod library;
pub mod paths;
pub mod ports;
pub mod session;
pub mod settings;
pub mod settings_store;

// Re-export commonly used types for convenience
pub use errors::{EngineError, EngineResult, ErrorKind};
pub use format::{format_bytes, format_speed};
pub use item::{STEAM_APP_ID, WorkshopItemId, extract_workshop_id, extract_workshop_ids};
pub use library::{
    CompatibilityMismatch, FixFailure, FixReport, FixSelection, FixedItem, ItemKind, LibraryItem,
    WorkshopMetadata,
};
pub use paths::{PathError, default_settings_path, ensure_directory, verify_writable};
pub use ports::{
    DetailsError, EngineEvent, EngineEventEmitter, InMemorySettingsRepository, LibraryPort,
    NoopEmitter, NoopWorkshopDetails, SettingsRepository, WorkshopDetails, WorkshopDetailsPort,
};
pub use session::{DownloadPhase, DownloadSessionView, DownloadStatus, ProgressEvent};
pub use settings::{Settings, SettingsError, SettingsUpdate, validate_settings};
pub use settings_store::JsonFileSettingsRepository;

// Silence unused dev-dependency warnings
#[cfg(test)]
use tokio_test as _;
