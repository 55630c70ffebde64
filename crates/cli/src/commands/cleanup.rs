//! Cleanup Command - remove test data left behind by a registration run

use std::time::Duration;

use anyhow::{bail, Result};
use clap::Args;

use venmail_e2e::{CleanupClient, CleanupOutcome, CleanupRequest};

use crate::output::{print_error, print_info, print_success, print_warning, OutputFormat};
use crate::settings::{GlobalArgs, Settings};

#[derive(Debug, Args)]
pub struct CleanupArgs {
    /// Email of the account to remove
    #[arg(long)]
    pub email: String,

    /// Domain registered with the account
    #[arg(long)]
    pub domain: Option<String>,

    /// Company registered with the account
    #[arg(long)]
    pub company: Option<String>,
}

pub async fn execute(args: CleanupArgs, global: &GlobalArgs, format: OutputFormat) -> Result<()> {
    let settings = Settings::load(global)?;
    let timeout = Duration::from_millis(settings.config.timeouts.request_ms);
    let client = CleanupClient::new(&settings.env.api_url, timeout)?;

    let request = CleanupRequest {
        email: args.email,
        domain: args.domain,
        company_name: args.company,
    };
    print_info(&format!("POST {}", client.endpoint()));
    let outcome = client.cleanup(&request).await;

    if matches!(format, OutputFormat::Json) {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    }

    match outcome {
        CleanupOutcome::Cleaned(summary) => {
            print_success(summary.message.as_deref().unwrap_or("Cleaned"));
            Ok(())
        }
        CleanupOutcome::Skipped => {
            print_warning("Nothing to clean up");
            Ok(())
        }
        CleanupOutcome::Rejected { status, body } => {
            print_error(&format!("Cleanup rejected ({}): {}", status, body));
            bail!("cleanup rejected with status {}", status)
        }
        CleanupOutcome::Failed { reason } => {
            print_error(&reason);
            bail!("cleanup request failed")
        }
    }
}
