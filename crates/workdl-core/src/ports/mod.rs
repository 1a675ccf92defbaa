//! Port definitions (trait abstractions) for external systems.
//!
//! The engine depends on these traits, never on concrete adapters. Each port
//! ships a trivial implementation (no-op or in-memory) for tests and CLI use.

pub mod event_emitter;
pub mod library;
pub mod settings_repository;
pub mod workshop_details;

pub use event_emitter::{EngineEvent, EngineEventEmitter, NoopEmitter};
pub use library::LibraryPort;
pub use settings_repository::{InMemorySettingsRepository, SettingsRepository};
pub use workshop_details::{DetailsError, NoopWorkshopDetails, WorkshopDetails, WorkshopDetailsPort};
