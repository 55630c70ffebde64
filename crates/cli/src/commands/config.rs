//! Config Command - write or show the run configuration

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Subcommand;

use venmail_e2e_common::RunConfig;

use crate::output::{print_success, OutputFormat};
use crate::settings::GlobalArgs;

#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Write a config file with every default spelled out
    Init {
        /// Destination (defaults to --config)
        #[arg(long)]
        path: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print the effective configuration
    Show,
}

pub async fn execute(cmd: ConfigCommands, global: &GlobalArgs, format: OutputFormat) -> Result<()> {
    match cmd {
        ConfigCommands::Init { path, force } => {
            let path = path.unwrap_or_else(|| global.config.clone());
            if path.exists() && !force {
                bail!("{} already exists (use --force to overwrite)", path.display());
            }
            RunConfig::default()
                .save(&path)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            print_success(&format!("Wrote {}", path.display()));
        }

        ConfigCommands::Show => {
            let config = RunConfig::load(&global.config)?;
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&config)?),
                OutputFormat::Yaml => println!("{}", serde_yaml::to_string(&config)?),
                OutputFormat::Table | OutputFormat::Plain => {
                    println!("{}", toml::to_string_pretty(&config)?)
                }
            }
        }
    }

    Ok(())
}
