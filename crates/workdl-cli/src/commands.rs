//! Commands enum and subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand};
use workdl_axum::bootstrap::{DEFAULT_HOST, DEFAULT_PORT};

/// Default address of a running `workdl serve`.
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:5000";

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP API server
    Serve {
        /// Address to bind
        #[arg(long, env = "WORKDL_HOST", default_value = DEFAULT_HOST)]
        host: String,
        /// Port to listen on
        #[arg(long, env = "WORKDL_PORT", default_value_t = DEFAULT_PORT)]
        port: u16,
        /// Allowed CORS origin (repeatable; all origins when omitted)
        #[arg(long = "allow-origin")]
        allow_origins: Vec<String>,
    },

    /// Download and install one workshop item
    Download {
        /// Workshop item id or link
        item: String,
    },

    /// Manage the download queue of a running server
    Queue {
        /// Base URL of the workdl server
        #[arg(long, env = "WORKDL_SERVER", default_value = DEFAULT_SERVER_URL, global = true)]
        server: String,
        #[command(subcommand)]
        command: QueueCommand,
    },

    /// Inspect and repair installed items
    Library {
        #[command(subcommand)]
        command: LibraryCommand,
    },

    /// View or change settings
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// Launch the game with its configured parameters
    Launch,
}

#[derive(Subcommand)]
pub enum QueueCommand {
    /// Add ids or workshop links to the queue
    Add {
        /// Ids or links; separators inside one argument are fine too
        #[arg(required = true)]
        items: Vec<String>,
    },
    /// Show pending items
    List,
    /// Remove every pending item
    Clear,
    /// Remove one pending item
    Remove {
        /// Workshop item id or link
        item: String,
    },
    /// Start processing the queue
    Run {
        /// Show progress until the queue is drained
        #[arg(short, long)]
        follow: bool,
    },
}

#[derive(Subcommand)]
pub enum LibraryCommand {
    /// List installed items
    List,
    /// Delete an installed item
    Remove {
        /// Workshop item id, link or folder name
        item: String,
    },
    /// List items whose folder name breaks the naming convention
    Mismatches,
    /// Rename mismatched folders
    Fix {
        /// Workshop item ids to fix
        ids: Vec<String>,
        /// Fix every mismatched item
        #[arg(long, conflicts_with = "ids")]
        all: bool,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current settings
    Show,
    /// Update settings
    Set(SetArgs),
    /// Print the settings file location
    Path,
}

/// Settings to change; omitted flags keep their current values.
#[derive(Args, Debug, Default)]
pub struct SetArgs {
    /// Game installation directory
    #[arg(long)]
    pub install_dir: Option<PathBuf>,
    /// SteamCMD executable or its directory
    #[arg(long)]
    pub fetch_tool: Option<PathBuf>,
    /// Game executable name (without .exe)
    #[arg(long)]
    pub game_executable: Option<String>,
    /// Parameters passed to the game on launch
    #[arg(long, allow_hyphen_values = true)]
    pub launch_parameters: Option<String>,
    /// Keep processing the queue after each item
    #[arg(long, value_name = "BOOL")]
    pub continuous: Option<bool>,
    /// Delete staged content after installing
    #[arg(long, value_name = "BOOL")]
    pub clean_on_finish: Option<bool>,
    /// Skip queued items that are already installed
    #[arg(long, value_name = "BOOL")]
    pub skip_installed: Option<bool>,
    /// Seconds before a fetch is abandoned
    #[arg(long, value_name = "SECS")]
    pub fetch_timeout: Option<u64>,
    /// Seconds between the stop signal and a forced kill
    #[arg(long, value_name = "SECS")]
    pub stop_grace: Option<u64>,
}
