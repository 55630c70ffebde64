//! Venmail E2E CLI - Main Entry Point
//!
//! Runs the browser suites against staging, production or a local stack,
//! and offers the checks that help before and after a run.

use clap::{Parser, Subcommand};

use venmail_e2e_cli::commands::{cleanup, config, domains, env, run, validate};
use venmail_e2e_cli::output::OutputFormat;
use venmail_e2e_cli::settings::GlobalArgs;

/// Venmail E2E - browser-driven end-to-end suite for Venmail webmail
#[derive(Parser)]
#[command(name = "venmail-e2e")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    /// Output format
    #[arg(long, default_value = "table", global = true)]
    format: OutputFormat,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the suites in a real browser
    Run(run::RunArgs),

    /// Show the resolved environment and credential presence
    Env,

    /// Parse suites and check credentials without a browser
    Validate(validate::ValidateArgs),

    /// Remove registration test data through the backend
    Cleanup(cleanup::CleanupArgs),

    /// Print candidate domains for the availability check
    Domains(domains::DomainsArgs),

    /// Manage the config file
    #[command(subcommand)]
    Config(config::ConfigCommands),

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Run(args) => run::execute(args, &cli.global, cli.format).await?,
        Commands::Env => env::execute(&cli.global, cli.format).await?,
        Commands::Validate(args) => validate::execute(args, &cli.global, cli.format).await?,
        Commands::Cleanup(args) => cleanup::execute(args, &cli.global, cli.format).await?,
        Commands::Domains(args) => domains::execute(args, cli.format).await?,
        Commands::Config(cmd) => config::execute(cmd, &cli.global, cli.format).await?,
        Commands::Version => {
            println!("venmail-e2e v{}", env!("CARGO_PKG_VERSION"));
            println!("Suite library v{}", venmail_e2e_common::VERSION);
        }
    }

    Ok(())
}
