//! Config command - manage configuration files

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use std::path::Path;

use crate::config_file::{ConfigFile, sample_config};

/// Arguments for the config command
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show the path to the config file
    Path,

    /// Show the effective configuration
    Show,

    /// Generate a default config file
    Init {
        /// Force overwrite if file exists
        #[arg(short, long)]
        force: bool,
    },

    /// Print a sample configuration to stdout
    Sample,
}

/// Run config subcommand against the file at `path`
pub async fn config(args: ConfigArgs, path: &Path) -> Result<()> {
    match args.command {
        ConfigCommand::Path => {
            println!("{}", path.display());
            if path.exists() {
                println!("(file exists)");
            } else {
                println!("(file does not exist)");
            }
        }
        ConfigCommand::Show => {
            if !path.exists() {
                println!("No configuration file found at: {}", path.display());
                println!();
                println!("Using default settings. Create a config file with:");
                println!("  screenhue config init");
                println!();
            } else {
                println!("Configuration file: {}\n", path.display());
            }

            // Parsed form, with defaults filled in
            let config = ConfigFile::load_from(path)?;
            print!(
                "{}",
                toml::to_string_pretty(&config).context("Failed to serialize config")?
            );

            let warnings = config.sampling.validate();
            if let Err(e) = config.sampling.validate_strict() {
                println!("\nError: {}", e);
            }
            for warning in warnings {
                println!("\nWarning: {}", warning);
            }
        }
        ConfigCommand::Init { force } => {
            if path.exists() && !force {
                println!("Configuration file already exists: {}", path.display());
                println!();
                println!("Use --force to overwrite, or edit the existing file.");
                return Ok(());
            }

            if let Some(parent) = path.parent() {
                if !parent.exists() {
                    std::fs::create_dir_all(parent).context("Failed to create config directory")?;
                }
            }

            std::fs::write(path, sample_config()).context("Failed to write config file")?;

            println!("Created configuration file: {}", path.display());
            println!();
            println!("Edit this file to customize Screenhue settings.");
        }
        ConfigCommand::Sample => {
            print!("{}", sample_config());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_init_writes_sample_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("screenhue").join("config.toml");

        let init = |force| ConfigArgs {
            command: ConfigCommand::Init { force },
        };

        config(init(false), &path).await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), sample_config());

        std::fs::write(&path, "# edited\n").unwrap();
        config(init(false), &path).await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "# edited\n");

        config(init(true), &path).await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), sample_config());
    }

    #[tokio::test]
    async fn test_show_rejects_broken_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[server]\nport = \"eighty\"\n").unwrap();

        let args = ConfigArgs {
            command: ConfigCommand::Show,
        };
        assert!(config(args, &path).await.is_err());
    }
}
