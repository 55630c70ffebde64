//! Run configuration

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Configuration for one suite run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Explicit environment override (highest priority source)
    pub environment: Option<String>,

    /// Explicit base URL override
    pub base_url: Option<String>,

    /// Explicit API URL override
    pub api_url: Option<String>,

    /// Directory containing suite YAML files
    pub scenarios_dir: PathBuf,

    /// Directory for reports, screenshots and videos
    pub results_dir: PathBuf,

    /// Credentials file (defaults to `credentials.<env>.toml` in the working dir)
    pub credentials_file: Option<PathBuf>,

    /// Re-runs granted to a failing test
    pub retries: u32,

    /// Keep cached sessions alive across suite files
    pub cache_across_suites: bool,

    /// Timeouts
    pub timeouts: TimeoutConfig,

    /// Browser configuration
    pub browser: BrowserConfig,

    /// Domain check retry configuration
    pub domain_retry: DomainRetryConfig,

    /// Artifact configuration
    pub artifacts: ArtifactConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            environment: None,
            base_url: None,
            api_url: None,
            scenarios_dir: PathBuf::from("scenarios"),
            results_dir: PathBuf::from("test-results"),
            credentials_file: None,
            retries: 2,
            cache_across_suites: false,
            timeouts: TimeoutConfig::default(),
            browser: BrowserConfig::default(),
            domain_retry: DomainRetryConfig::default(),
            artifacts: ArtifactConfig::default(),
        }
    }
}

/// Bounds for every suspension point, in milliseconds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Default wait for an element or text
    pub command_ms: u64,

    /// Navigation and page load
    pub page_load_ms: u64,

    /// Outgoing HTTP request (cleanup endpoint)
    pub request_ms: u64,

    /// Waiting on an intercepted response
    pub response_ms: u64,

    /// Landing on the inbox after login
    pub login_landing_ms: u64,

    /// Poll interval for waits
    pub poll_interval_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            command_ms: 10_000,
            page_load_ms: 60_000,
            request_ms: 15_000,
            response_ms: 30_000,
            login_landing_ms: 20_000,
            poll_interval_ms: 100,
        }
    }
}

/// Browser launch configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// chromium, firefox or webkit
    pub kind: String,
    pub headless: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            kind: "chromium".to_string(),
            headless: true,
            viewport_width: 1280,
            viewport_height: 720,
        }
    }
}

/// Defaults for the domain availability check loop
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DomainRetryConfig {
    pub max_attempts: u32,
    pub candidate_count: usize,
    /// Delay after clicking "Check Availability" before reading the page
    pub settle_ms: u64,
}

impl Default for DomainRetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            candidate_count: 10,
            settle_ms: 3_000,
        }
    }
}

/// Failure artifacts
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactConfig {
    pub screenshot_on_failure: bool,
    pub video: bool,
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            screenshot_on_failure: true,
            video: true,
        }
    }
}

impl RunConfig {
    /// Load configuration from file, falling back to defaults when absent
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Directory for failure screenshots
    pub fn screenshots_dir(&self) -> PathBuf {
        self.results_dir.join("screenshots")
    }

    /// Directory for run videos
    pub fn videos_dir(&self) -> PathBuf {
        self.results_dir.join("videos")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = RunConfig::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.retries, 2);
        assert_eq!(config.browser.viewport_width, 1280);
        assert_eq!(config.domain_retry.max_attempts, 10);
        assert!(!config.cache_across_suites);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("e2e.toml");
        std::fs::write(
            &path,
            "environment = \"dev\"\ncache_across_suites = true\n\n[domain_retry]\nmax_attempts = 4\n",
        )
        .unwrap();

        let config = RunConfig::load(&path).unwrap();
        assert_eq!(config.environment.as_deref(), Some("dev"));
        assert!(config.cache_across_suites);
        assert_eq!(config.domain_retry.max_attempts, 4);
        assert_eq!(config.domain_retry.settle_ms, 3_000);
        assert_eq!(config.timeouts.login_landing_ms, 20_000);
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/e2e.toml");
        let mut config = RunConfig::default();
        config.retries = 0;
        config.save(&path).unwrap();
        assert_eq!(RunConfig::load(&path).unwrap().retries, 0);
    }
}
