//! Screenhue CLI
//!
//! Samples the screen, reduces it to one color, and streams it.
//!
//! # Usage
//!
//! ```bash
//! # Stream colors over HTTP (server-sent events)
//! screenhue serve --port 8080
//!
//! # Print colors in the terminal
//! screenhue watch --rate 4
//!
//! # Time each reduction algorithm
//! screenhue bench -n 20
//! ```

mod commands;
mod config_file;
mod server;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use screenhue_core::error::ScreenhueError;
use std::path::PathBuf;
use tracing::{Level, warn};
use tracing_subscriber::EnvFilter;

use config_file::ConfigFile;

/// Screenhue - the screen's color, as a stream
#[derive(Parser)]
#[command(name = "screenhue")]
#[command(author = "GhostKellz")]
#[command(version)]
#[command(about = "Sample the screen, reduce it to one color, and stream it", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Config file to use instead of the default location
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Subcommand to run
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the color stream over HTTP
    Serve(commands::ServeArgs),

    /// Print colors to the terminal as they are sampled
    Watch(commands::WatchArgs),

    /// Capture a single color
    Sample(commands::SampleArgs),

    /// Time capture and each reduction algorithm
    Bench(commands::BenchArgs),

    /// Manage the configuration file
    Config(commands::ConfigArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config.clone().unwrap_or_else(ConfigFile::default_path);

    // The config command must work even when the file is broken.
    let config = match cli.command {
        Commands::Config(_) => ConfigFile::default(),
        _ => ConfigFile::load_from(&config_path)?,
    };

    // Set up logging based on verbosity, falling back to the config file
    let configured = config.logging.level.parse::<Level>();
    let level = match cli.verbose {
        0 => *configured.as_ref().unwrap_or(&Level::WARN),
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(
                format!("screenhue={}", level)
                    .parse()
                    .context("Invalid log directive")?,
            ),
        )
        .with_target(false)
        .init();

    if configured.is_err() {
        warn!(
            "Unknown log level '{}' in config, using {}",
            config.logging.level, level
        );
    }

    // Run the appropriate command
    let result = match cli.command {
        Commands::Serve(args) => commands::serve(args, config).await,
        Commands::Watch(args) => commands::watch(args, config).await,
        Commands::Sample(args) => commands::sample(args, config).await,
        Commands::Bench(args) => commands::bench(args, config).await,
        Commands::Config(args) => commands::config(args, &config_path).await,
    };

    if let Err(ref e) = result {
        let hint = e
            .chain()
            .find_map(|cause| cause.downcast_ref::<ScreenhueError>())
            .and_then(ScreenhueError::user_hint);
        if let Some(hint) = hint {
            eprintln!("Hint: {}", hint);
        }
    }

    result
}
