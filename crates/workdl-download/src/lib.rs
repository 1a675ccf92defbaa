//! Download engine for workdl.
//!
//! - `parser` - pure fetch tool output parser
//! - `tracker` - single download session state machine behind a `watch` channel
//! - `supervisor` - fetch subprocess lifecycle, sampling and exit classification
//! - `install` - copy fetched content into the game library
//! - `queue` - pure FIFO of pending items
//! - `engine` - the `DownloadEngine` aggregate tying everything together

pub mod install;
pub mod parser;
pub mod queue;
pub mod supervisor;
pub mod tracker;

mod engine;

pub use engine::{
    DEFAULT_TERMINAL_RESET_GRACE, DownloadEngine, EngineConfig, EngineDeps, LaunchAck,
    ProcessAck, StartAck, WorkshopInfo, game_executable_candidates,
};
pub use install::{InstallError, InstalledItem, install_item};
pub use parser::{ParserState, parse_line};
pub use queue::{DownloadQueue, EnqueueResult, QueueSnapshot};
pub use supervisor::{FetchOutcome, FetchRequest, StagingLayout, Supervisor, SupervisorHandle};
pub use tracker::{StatusTracker, StatusTransition};
