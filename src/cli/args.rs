//! Command-line argument definitions

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tunnel_profiles::Setting;

use tunnel_profiles::constants::config::SETTINGS_FILE_ENV;

/// Manage saved proxy server profiles and the active connection settings
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Settings file (default: <config dir>/tunnel-profiles/settings.json)
    #[arg(short = 'f', long, value_name = "PATH", env = SETTINGS_FILE_ENV, global = true)]
    pub settings_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List saved profiles
    List,
    /// Add a profile, or replace the one with the same name
    Add {
        name: String,
        /// Host, optionally with a :port suffix (stripped)
        host: String,
        password: String,
    },
    /// Change a saved profile in place, keeping its position
    Edit {
        name: String,
        /// New name for the profile
        #[arg(long)]
        rename: Option<String>,
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        password: Option<String>,
    },
    /// Delete a saved profile
    Remove { name: String },
    /// Apply a saved profile to the active connection
    Use { name: String },
    /// Apply the next profile in rotation
    Next,
    /// Save the active host and password as a profile
    SaveCurrent {
        /// Defaults to a timestamp-based name
        name: Option<String>,
    },
    /// Show the active connection settings
    Show,
    /// Print one setting
    Get { setting: Setting },
    /// Change one setting
    Set { setting: Setting, value: String },
    /// Restore a setting (or all of them) to its default
    Reset {
        #[arg(required_unless_present = "all")]
        setting: Option<Setting>,
        #[arg(long, conflicts_with = "setting")]
        all: bool,
    },
    /// Import profiles from a JSON or name|host|password file
    Import { file: PathBuf },
    /// Print saved profiles as JSON
    Export,
}
