//! Validate Command - parse suites and check credentials without a browser

use std::collections::BTreeSet;
use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Args;
use serde::Serialize;

use venmail_e2e::scenario::{self, LoadedSuite};
use venmail_e2e_common::Role;

use crate::output::{print_error, print_list, print_success, OutputFormat, TableDisplay};
use crate::settings::{GlobalArgs, Settings};

#[derive(Debug, Args)]
pub struct ValidateArgs {
    /// Scenarios directory
    #[arg(long)]
    pub scenarios: Option<PathBuf>,

    /// Require every known credential, not only the ones the suites use
    #[arg(long)]
    pub all_credentials: bool,
}

#[derive(Serialize)]
struct SuiteDisplay {
    path: String,
    name: String,
    tests: usize,
    roles: Vec<Role>,
    cleanup: bool,
}

impl From<&LoadedSuite> for SuiteDisplay {
    fn from(suite: &LoadedSuite) -> Self {
        Self {
            path: suite.relative_path.clone(),
            name: suite.spec.name.clone(),
            tests: suite.spec.tests.len(),
            roles: suite.spec.required_roles().into_iter().collect(),
            cleanup: suite.spec.cleanup,
        }
    }
}

impl TableDisplay for SuiteDisplay {
    fn headers() -> Vec<&'static str> {
        vec!["Path", "Suite", "Tests", "Roles", "Cleanup"]
    }

    fn row(&self) -> Vec<String> {
        let roles: Vec<&str> = self.roles.iter().map(Role::as_str).collect();
        vec![
            self.path.clone(),
            self.name.clone(),
            self.tests.to_string(),
            if roles.is_empty() { "-".to_string() } else { roles.join(", ") },
            self.cleanup.to_string(),
        ]
    }
}

pub async fn execute(args: ValidateArgs, global: &GlobalArgs, format: OutputFormat) -> Result<()> {
    let settings = Settings::load(global)?;
    let dir = args.scenarios.unwrap_or(settings.config.scenarios_dir);

    let suites = scenario::select(scenario::load_all(&dir)?, &settings.env.allowed_specs)?;
    let displays: Vec<SuiteDisplay> = suites.iter().map(SuiteDisplay::from).collect();
    print_list(&displays, format);

    let credentials = if args.all_credentials {
        settings.resolver.validate_all().map(|_| ())
    } else {
        let roles: BTreeSet<Role> = suites.iter().flat_map(|s| s.spec.required_roles()).collect();
        settings.resolver.resolve_all(roles).map(|_| ())
    };

    match credentials {
        Ok(()) => {
            print_success(&format!(
                "{} suite(s) valid for {}",
                suites.len(),
                settings.env.environment
            ));
            Ok(())
        }
        Err(e) => {
            print_error(&e.to_string());
            bail!("credentials incomplete for {}", settings.env.environment)
        }
    }
}
