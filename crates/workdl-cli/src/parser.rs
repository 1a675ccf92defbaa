//! Main CLI parser and top-level argument handling.

use std::path::PathBuf;

use clap::Parser;

use crate::commands::Commands;

/// Download, install and manage Steam Workshop items through SteamCMD.
#[derive(Parser)]
#[command(name = "workdl")]
#[command(about = "Download and manage Steam Workshop items with SteamCMD")]
#[command(version)]
pub struct Cli {
    /// Settings file to use instead of the default location
    #[arg(long = "config", global = true, env = "WORKDL_SETTINGS")]
    pub config: Option<PathBuf>,

    /// Enable verbose/debug output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}
