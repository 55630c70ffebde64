//! Run settings assembled from the config file, flags and process environment

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use tracing::debug;

use venmail_e2e_common::{
    resolve_environment, CredentialResolver, EnvironmentSources, ResolvedEnvironment, RunConfig,
};

/// Default config file, read when present
pub const DEFAULT_CONFIG_FILE: &str = "venmail-e2e.toml";

/// Flags shared by every command
#[derive(Debug, Clone, Args)]
pub struct GlobalArgs {
    /// Config file
    #[arg(long, env = "E2E_CONFIG", default_value = DEFAULT_CONFIG_FILE, global = true)]
    pub config: PathBuf,

    /// Target environment (staging, production, dev)
    #[arg(short, long = "env", global = true)]
    pub environment: Option<String>,

    /// Override the environment's base URL
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Override the environment's API URL
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Credentials file (defaults to credentials.<env>.toml)
    #[arg(long, global = true)]
    pub credentials: Option<PathBuf>,
}

/// Everything a command needs before touching the UI
#[derive(Debug, Clone)]
pub struct Settings {
    pub config: RunConfig,
    pub env: ResolvedEnvironment,
    pub resolver: CredentialResolver,
}

impl Settings {
    /// Load the config file and resolve environment and credentials.
    ///
    /// Flags beat the config file, which beats process variables.
    pub fn load(args: &GlobalArgs) -> Result<Self> {
        let config = RunConfig::load(&args.config)
            .with_context(|| format!("Failed to load {}", args.config.display()))?;
        Self::from_config(args, config)
    }

    pub fn from_config(args: &GlobalArgs, config: RunConfig) -> Result<Self> {
        let run_override = args.environment.clone().or_else(|| config.environment.clone());
        let sources = EnvironmentSources::from_process(run_override).with_url_overrides(
            args.base_url.clone().or_else(|| config.base_url.clone()),
            args.api_url.clone().or_else(|| config.api_url.clone()),
        );
        let env = resolve_environment(&sources)?;
        debug!("Resolved environment {} at {}", env.environment, env.base_url);

        let file = args
            .credentials
            .clone()
            .or_else(|| config.credentials_file.clone())
            .unwrap_or_else(|| CredentialResolver::default_file(Path::new("."), env.environment));
        let resolver = CredentialResolver::from_process(Some(&file))
            .with_context(|| format!("Failed to read credentials from {}", file.display()))?;

        Ok(Self {
            config,
            env,
            resolver,
        })
    }
}
