//! Target environment selection
//!
//! The environment is chosen from an ordered list of sources, highest first:
//!
//! 1. explicit run-level override (CLI flag or run config)
//! 2. `ENVIRONMENT`
//! 3. `E2E_ENV`
//! 4. `staging`
//!
//! The first non-empty source wins. Base and API URLs come from a static
//! table unless an override URL is supplied. Resolution is a pure function
//! of its inputs.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Primary process variable naming the environment
pub const ENV_VAR_PRIMARY: &str = "ENVIRONMENT";

/// Secondary, alternately-named variable
pub const ENV_VAR_SECONDARY: &str = "E2E_ENV";

/// Explicit base URL override variable
pub const BASE_URL_VAR: &str = "E2E_BASE_URL";

/// Explicit API URL override variable
pub const API_URL_VAR: &str = "E2E_API_URL";

/// Suite pattern used outside production
pub const FULL_SUITE_PATTERN: &str = "**/*.yaml";

/// Suites allowed to run against production. These only read data.
pub const PRODUCTION_ALLOWLIST: &[&str] = &["read-only-prod.yaml", "auth/login.yaml"];

/// Environment a run targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Staging,
    Production,
    Dev,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Staging => "staging",
            Environment::Production => "production",
            Environment::Dev => "dev",
        }
    }

    /// Default web app URL for this environment
    pub fn default_base_url(&self) -> &'static str {
        match self {
            Environment::Staging => "https://app.venmail.io",
            Environment::Production => "https://m.venmail.io",
            Environment::Dev => "http://localhost:3000",
        }
    }

    /// Default backend API URL for this environment
    pub fn default_api_url(&self) -> &'static str {
        match self {
            Environment::Staging => "https://api.app.venmail.io",
            Environment::Production => "https://api.m.venmail.io",
            Environment::Dev => "http://localhost:8000",
        }
    }

    /// Suites that may run in this environment
    pub fn spec_selection(&self) -> SpecSelection {
        match self {
            Environment::Production => SpecSelection::Allowlist {
                paths: PRODUCTION_ALLOWLIST.iter().map(|s| s.to_string()).collect(),
            },
            _ => SpecSelection::All {
                pattern: FULL_SUITE_PATTERN.to_string(),
            },
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "staging" => Ok(Environment::Staging),
            "production" | "prod" => Ok(Environment::Production),
            "dev" | "development" | "local" => Ok(Environment::Dev),
            other => Err(Error::configuration(format!(
                "Unknown environment: {other} (expected staging, production or dev)"
            ))),
        }
    }
}

/// Which suite files a run may execute
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SpecSelection {
    /// Every suite matching a glob, relative to the scenarios directory
    All { pattern: String },
    /// Only the listed suite paths
    Allowlist { paths: Vec<String> },
}

impl SpecSelection {
    /// Whether a suite path (relative, `/`-separated) may run
    pub fn allows(&self, relative_path: &str) -> Result<bool> {
        let normalized = relative_path.replace('\\', "/");
        match self {
            SpecSelection::All { pattern } => {
                let pattern = glob::Pattern::new(pattern).map_err(|e| {
                    Error::configuration(format!("Invalid suite pattern {pattern}: {e}"))
                })?;
                Ok(pattern.matches(&normalized))
            }
            SpecSelection::Allowlist { paths } => Ok(paths.iter().any(|p| *p == normalized)),
        }
    }
}

/// Raw values of every configuration source, in priority order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvironmentSources {
    pub run_override: Option<String>,
    pub primary: Option<String>,
    pub secondary: Option<String>,
    pub base_url_override: Option<String>,
    pub api_url_override: Option<String>,
}

impl EnvironmentSources {
    /// Read the process environment, layering a run-level override on top
    pub fn from_process(run_override: Option<String>) -> Self {
        Self::from_lookup(run_override, |name| std::env::var(name).ok())
    }

    /// Read sources through an arbitrary variable lookup
    pub fn from_lookup<F>(run_override: Option<String>, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            run_override,
            primary: lookup(ENV_VAR_PRIMARY),
            secondary: lookup(ENV_VAR_SECONDARY),
            base_url_override: lookup(BASE_URL_VAR),
            api_url_override: lookup(API_URL_VAR),
        }
    }

    /// Explicit URL overrides win over the process variables
    pub fn with_url_overrides(mut self, base_url: Option<String>, api_url: Option<String>) -> Self {
        if base_url.is_some() {
            self.base_url_override = base_url;
        }
        if api_url.is_some() {
            self.api_url_override = api_url;
        }
        self
    }
}

/// The environment a run targets, with everything derived from it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedEnvironment {
    pub environment: Environment,
    pub base_url: String,
    pub api_url: String,
    pub allowed_specs: SpecSelection,
}

impl ResolvedEnvironment {
    /// Join a path onto the base URL
    pub fn url(&self, path: &str) -> String {
        join_url(&self.base_url, path)
    }

    /// Join a path onto the API URL
    pub fn api(&self, path: &str) -> String {
        join_url(&self.api_url, path)
    }
}

/// Resolve the target environment from its sources.
///
/// Absent sources fall back to `staging`; the only failure is a source that
/// names an unknown environment.
pub fn resolve_environment(sources: &EnvironmentSources) -> Result<ResolvedEnvironment> {
    let chosen = [
        sources.run_override.as_deref(),
        sources.primary.as_deref(),
        sources.secondary.as_deref(),
    ]
    .into_iter()
    .flatten()
    .map(str::trim)
    .find(|value| !value.is_empty());

    let environment = match chosen {
        Some(value) => value.parse()?,
        None => Environment::default(),
    };

    let base_url = non_empty(sources.base_url_override.as_deref())
        .unwrap_or_else(|| environment.default_base_url())
        .trim_end_matches('/')
        .to_string();
    let api_url = non_empty(sources.api_url_override.as_deref())
        .unwrap_or_else(|| environment.default_api_url())
        .trim_end_matches('/')
        .to_string();

    Ok(ResolvedEnvironment {
        environment,
        base_url,
        api_url,
        allowed_specs: environment.spec_selection(),
    })
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn join_url(base: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }
    let base = base.trim_end_matches('/');
    if path.is_empty() {
        base.to_string()
    } else if path.starts_with('/') {
        format!("{base}{path}")
    } else {
        format!("{base}/{path}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn sources(run: Option<&str>, primary: Option<&str>, secondary: Option<&str>) -> EnvironmentSources {
        EnvironmentSources {
            run_override: run.map(String::from),
            primary: primary.map(String::from),
            secondary: secondary.map(String::from),
            ..Default::default()
        }
    }

    #[test_case(None, None, None, Environment::Staging ; "default is staging")]
    #[test_case(Some("dev"), Some("production"), None, Environment::Dev ; "override wins")]
    #[test_case(None, Some("production"), Some("dev"), Environment::Production ; "primary beats secondary")]
    #[test_case(None, None, Some("dev"), Environment::Dev ; "secondary used last")]
    #[test_case(Some(""), Some("  "), Some("production"), Environment::Production ; "empty sources skipped")]
    fn test_source_priority(
        run: Option<&str>,
        primary: Option<&str>,
        secondary: Option<&str>,
        expected: Environment,
    ) {
        let resolved = resolve_environment(&sources(run, primary, secondary)).unwrap();
        assert_eq!(resolved.environment, expected);
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let input = EnvironmentSources {
            primary: Some("production".into()),
            api_url_override: Some("https://api.example.test/".into()),
            ..Default::default()
        };
        let first = resolve_environment(&input).unwrap();
        for _ in 0..5 {
            assert_eq!(resolve_environment(&input).unwrap(), first);
        }
        assert_eq!(first.base_url, "https://m.venmail.io");
        assert_eq!(first.api_url, "https://api.example.test");
    }

    #[test]
    fn test_base_url_override_beats_table() {
        let input = EnvironmentSources {
            primary: Some("staging".into()),
            base_url_override: Some("https://preview.venmail.io".into()),
            ..Default::default()
        };
        let resolved = resolve_environment(&input).unwrap();
        assert_eq!(resolved.base_url, "https://preview.venmail.io");
        assert_eq!(resolved.api_url, "https://api.app.venmail.io");
    }

    #[test]
    fn test_unknown_environment_is_configuration_error() {
        let err = resolve_environment(&sources(Some("qa"), None, None)).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_production_restricts_suites() {
        let selection = Environment::Production.spec_selection();
        assert!(selection.allows("auth/login.yaml").unwrap());
        assert!(selection.allows("read-only-prod.yaml").unwrap());
        assert!(!selection.allows("auth/registration.yaml").unwrap());
        assert!(!selection.allows("emails/compose.yaml").unwrap());
    }

    #[test]
    fn test_staging_allows_everything() {
        let selection = Environment::Staging.spec_selection();
        assert!(selection.allows("auth/registration.yaml").unwrap());
        assert!(selection.allows("business-user/plan-selection.yaml").unwrap());
        assert!(!selection.allows("notes.txt").unwrap());
    }

    #[test]
    fn test_url_join() {
        let resolved = resolve_environment(&EnvironmentSources::default()).unwrap();
        assert_eq!(resolved.url("/login"), "https://app.venmail.io/login");
        assert_eq!(resolved.url("m/all"), "https://app.venmail.io/m/all");
        assert_eq!(
            resolved.api("/api/test/cleanup"),
            "https://api.app.venmail.io/api/test/cleanup"
        );
    }
}
