#![forbid(unsafe_code)]

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, error, Level as TraceLevel};
use tracing_subscriber::FmtSubscriber;

use cli::args::Args;
use cli::commands::handle_command;
use tunnel_profiles::{JsonFileStore, ProfileStore};

fn init_logging() -> Result<()> {
    // Parse log level from environment variable
    let log_level = match std::env::var("LOG_LEVEL")
        .unwrap_or_else(|_| "info".to_string())
        .to_lowercase()
        .as_str()
    {
        "trace" => TraceLevel::TRACE,
        "debug" => TraceLevel::DEBUG,
        "warn" => TraceLevel::WARN,
        "error" => TraceLevel::ERROR,
        _ => TraceLevel::INFO,
    };

    // stdout carries command output
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber).context("Failed to install log subscriber")
}

fn run(args: Args) -> Result<()> {
    let path = args.settings_file.unwrap_or_else(JsonFileStore::default_path);
    debug!(path = %path.display(), "Using settings file");

    let store = ProfileStore::open(JsonFileStore::new(&path))
        .with_context(|| format!("Failed to open settings at {}", path.display()))?;

    handle_command(&store, args.command)
}

fn main() {
    let args = Args::parse();

    if let Err(e) = init_logging() {
        eprintln!("{e:#}");
    }

    if let Err(e) = run(args) {
        error!("{e:#}");
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
