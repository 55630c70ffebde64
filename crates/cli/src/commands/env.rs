//! Env Command - show what a run would target

use anyhow::Result;
use serde::Serialize;

use venmail_e2e_common::{SpecSelection, VariablePresence};

use crate::output::{print_header, print_item, print_list, OutputFormat, TableDisplay};
use crate::settings::{GlobalArgs, Settings};

#[derive(Serialize)]
struct EnvironmentDisplay {
    environment: String,
    base_url: String,
    api_url: String,
    suites: String,
    credentials_file: Option<String>,
}

impl TableDisplay for EnvironmentDisplay {
    fn headers() -> Vec<&'static str> {
        vec!["Environment", "Base URL", "API URL", "Suites", "Credentials File"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.environment.clone(),
            self.base_url.clone(),
            self.api_url.clone(),
            self.suites.clone(),
            self.credentials_file.clone().unwrap_or_else(|| "-".to_string()),
        ]
    }
}

#[derive(Serialize)]
struct PresenceDisplay(VariablePresence);

impl TableDisplay for PresenceDisplay {
    fn headers() -> Vec<&'static str> {
        vec!["Variable", "Status"]
    }

    fn row(&self) -> Vec<String> {
        let status = if self.0.present { "set" } else { "not set" };
        vec![self.0.name.clone(), status.to_string()]
    }
}

fn describe_selection(selection: &SpecSelection) -> String {
    match selection {
        SpecSelection::All { pattern } => format!("all ({})", pattern),
        SpecSelection::Allowlist { paths } => paths.join(", "),
    }
}

pub async fn execute(global: &GlobalArgs, format: OutputFormat) -> Result<()> {
    let settings = Settings::load(global)?;

    let display = EnvironmentDisplay {
        environment: settings.env.environment.to_string(),
        base_url: settings.env.base_url.clone(),
        api_url: settings.env.api_url.clone(),
        suites: describe_selection(&settings.env.allowed_specs),
        credentials_file: settings
            .resolver
            .file()
            .filter(|p| p.exists())
            .map(|p| p.display().to_string()),
    };
    let presence: Vec<PresenceDisplay> = settings
        .resolver
        .presence()
        .into_iter()
        .map(PresenceDisplay)
        .collect();

    if matches!(format, OutputFormat::Table | OutputFormat::Plain) {
        print_header("Environment");
    }
    print_item(&display, format);
    print_list(&presence, format);
    Ok(())
}
