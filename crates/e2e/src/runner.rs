//! Suite runner: discovers suites, drives the browser and writes the report

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use venmail_e2e_common::{CredentialResolver, ResolvedEnvironment, Role, RunConfig, SpecSelection};

use crate::browser::{Browser, BrowserLauncher};
use crate::cleanup::{CleanupClient, CleanupOutcome};
use crate::context::{RunState, TestContext};
use crate::error::E2eResult;
use crate::executor::execute_step;
use crate::page::{PageContext, Timeouts};
use crate::playwright::{PlaywrightConfig, PlaywrightLauncher};
use crate::retry::RetryReport;
use crate::scenario::{self, LoadedSuite, TestCase};
use crate::session::{SessionCache, SessionScope};

/// Narrows which suites and tests run
#[derive(Debug, Clone, Default)]
pub struct SuiteFilter {
    /// Glob over suite paths relative to the scenarios directory
    pub pattern: Option<String>,
    /// Suite or test tag
    pub tag: Option<String>,
    /// Substring of the test name
    pub test_name: Option<String>,
}

impl SuiteFilter {
    fn allows_suite(&self, suite: &LoadedSuite) -> E2eResult<bool> {
        if let Some(pattern) = &self.pattern {
            let selection = SpecSelection::All {
                pattern: pattern.clone(),
            };
            if !selection.allows(&suite.relative_path)? {
                return Ok(false);
            }
        }
        Ok(match &self.tag {
            Some(tag) => suite.spec.has_tag(tag) || suite.spec.tests.iter().any(|t| t.tags.contains(tag)),
            None => true,
        })
    }

    fn allows_test(&self, suite: &LoadedSuite, test: &TestCase) -> bool {
        let by_name = self
            .test_name
            .as_ref()
            .map(|n| test.name.contains(n.as_str()))
            .unwrap_or(true);
        let by_tag = match &self.tag {
            Some(tag) => suite.spec.has_tag(tag) || test.tags.contains(tag),
            None => true,
        };
        by_name && by_tag
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestStatus {
    Passed,
    Failed,
    Skipped,
}

/// Result of running a single test
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResult {
    pub name: String,
    pub status: TestStatus,
    pub attempts: u32,
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain_check: Option<RetryReport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cleanup: Option<CleanupOutcome>,
}

impl TestResult {
    fn skipped(name: &str) -> Self {
        Self {
            name: name.to_string(),
            status: TestStatus::Skipped,
            attempts: 0,
            duration_ms: 0,
            error: None,
            screenshot: None,
            domain_check: None,
            cleanup: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteResult {
    pub name: String,
    pub path: String,
    pub tests: Vec<TestResult>,
}

/// Result of a whole run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub environment: String,
    pub base_url: String,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    /// Set when a fatal error stopped the run early
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aborted: Option<String>,
    pub suites: Vec<SuiteResult>,
}

impl RunReport {
    fn new(env: &ResolvedEnvironment) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            environment: env.environment.to_string(),
            base_url: env.base_url.clone(),
            started_at: Utc::now(),
            duration_ms: 0,
            total: 0,
            passed: 0,
            failed: 0,
            skipped: 0,
            aborted: None,
            suites: Vec::new(),
        }
    }

    fn tally(&mut self, duration: Duration) {
        let tests = self.suites.iter().flat_map(|s| s.tests.iter());
        let (mut passed, mut failed, mut skipped) = (0, 0, 0);
        for test in tests {
            match test.status {
                TestStatus::Passed => passed += 1,
                TestStatus::Failed => failed += 1,
                TestStatus::Skipped => skipped += 1,
            }
        }
        self.passed = passed;
        self.failed = failed;
        self.skipped = skipped;
        self.total = passed + failed + skipped;
        self.duration_ms = duration.as_millis() as u64;
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0 || self.aborted.is_some()
    }

    /// Plain-text summary, one line per test
    pub fn summary(&self) -> String {
        let mut out = format!(
            "Run {} against {} ({})\n",
            self.run_id, self.environment, self.base_url
        );
        for suite in &self.suites {
            out.push_str(&format!("\n{} [{}]\n", suite.name, suite.path));
            for test in &suite.tests {
                let mark = match test.status {
                    TestStatus::Passed => "✓",
                    TestStatus::Failed => "✗",
                    TestStatus::Skipped => "-",
                };
                out.push_str(&format!("  {} {} ({} ms)", mark, test.name, test.duration_ms));
                if test.attempts > 1 {
                    out.push_str(&format!(" after {} attempts", test.attempts));
                }
                out.push('\n');
                if let Some(error) = &test.error {
                    out.push_str(&format!("      {}\n", error));
                }
            }
        }
        if let Some(reason) = &self.aborted {
            out.push_str(&format!("\nRun aborted: {}\n", reason));
        }
        out.push_str(&format!(
            "\n{} passed, {} failed, {} skipped ({} ms)\n",
            self.passed, self.failed, self.skipped, self.duration_ms
        ));
        out
    }
}

/// File name for a failure screenshot; re-runs get an attempt suffix
pub fn failure_screenshot_name(suite: &str, test: &str, attempt: u32) -> String {
    let clean = |s: &str| s.replace(['/', '\\', ' '], "-");
    if attempt > 1 {
        format!("{}_{}_FAILED (attempt {}).png", clean(suite), clean(test), attempt)
    } else {
        format!("{}_{}_FAILED.png", clean(suite), clean(test))
    }
}

/// Runs suites sequentially in one browser
pub struct SuiteRunner {
    config: RunConfig,
    env: Arc<ResolvedEnvironment>,
    resolver: CredentialResolver,
    launcher: Arc<dyn BrowserLauncher>,
    filter: SuiteFilter,
}

impl SuiteRunner {
    pub fn new(
        config: RunConfig,
        env: ResolvedEnvironment,
        resolver: CredentialResolver,
        launcher: Arc<dyn BrowserLauncher>,
    ) -> Self {
        Self {
            config,
            env: Arc::new(env),
            resolver,
            launcher,
            filter: SuiteFilter::default(),
        }
    }

    /// Runner driving a real Playwright browser
    pub fn with_playwright(
        config: RunConfig,
        env: ResolvedEnvironment,
        resolver: CredentialResolver,
    ) -> E2eResult<Self> {
        let video_dir = config.artifacts.video.then(|| config.videos_dir());
        let playwright = PlaywrightConfig::from_run(
            &env.base_url,
            &config.browser,
            &config.timeouts,
            video_dir,
        )?;
        let launcher = Arc::new(PlaywrightLauncher::new(playwright));
        Ok(Self::new(config, env, resolver, launcher))
    }

    pub fn with_filter(mut self, filter: SuiteFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn environment(&self) -> &ResolvedEnvironment {
        &self.env
    }

    /// Suites the environment and filter allow, sorted by path
    pub fn discover(&self) -> E2eResult<Vec<LoadedSuite>> {
        let all = scenario::load_all(&self.config.scenarios_dir)?;
        let allowed = scenario::select(all, &self.env.allowed_specs)?;
        let mut suites = Vec::with_capacity(allowed.len());
        for suite in allowed {
            if self.filter.allows_suite(&suite)? {
                suites.push(suite);
            }
        }
        Ok(suites)
    }

    /// Run every selected suite.
    ///
    /// Credentials for every referenced role are resolved before the browser
    /// starts; a missing one ends the run without touching the UI.
    pub async fn run(&self) -> E2eResult<RunReport> {
        let start = Instant::now();
        let suites = self.discover()?;

        let roles: BTreeSet<Role> = suites.iter().flat_map(|s| s.spec.required_roles()).collect();
        let credentials = self.resolver.resolve_all(roles)?;

        info!("Environment: {}", self.env.environment);
        info!("Base URL: {}", self.env.base_url);
        for presence in self.resolver.presence() {
            info!(
                "  {}: {}",
                presence.name,
                if presence.present { "set" } else { "not set" }
            );
        }
        info!("Running {} suite(s)...", suites.len());

        let mut report = RunReport::new(&self.env);
        if suites.is_empty() {
            warn!("No suites selected in {}", self.config.scenarios_dir.display());
            report.tally(start.elapsed());
            return Ok(report);
        }

        let screenshots_dir = self.config.screenshots_dir();
        std::fs::create_dir_all(&screenshots_dir)?;

        let cleanup = if suites.iter().any(|s| s.spec.cleanup) {
            let timeout = Duration::from_millis(self.config.timeouts.request_ms);
            Some(CleanupClient::new(&self.env.api_url, timeout)?)
        } else {
            None
        };

        let scope = if self.config.cache_across_suites {
            SessionScope::Run
        } else {
            SessionScope::Suite
        };
        let run = RunState {
            env: self.env.clone(),
            credentials: Arc::new(credentials),
            sessions: Arc::new(SessionCache::new(scope)),
            domain_retry: self.config.domain_retry.clone(),
            screenshots_dir,
        };

        let browser = self.launcher.launch().await?;
        let page = PageContext::new(
            browser.clone(),
            self.env.base_url.clone(),
            Timeouts::from(&self.config.timeouts),
        );

        'suites: for suite in &suites {
            info!("Suite: {} ({})", suite.spec.name, suite.relative_path);
            let mut result = SuiteResult {
                name: suite.spec.name.clone(),
                path: suite.relative_path.clone(),
                tests: Vec::new(),
            };

            for test in &suite.spec.tests {
                if !self.filter.allows_test(suite, test) {
                    continue;
                }
                if test.skipped_in(self.env.environment) {
                    info!("- {} (skipped)", test.name);
                    result.tests.push(TestResult::skipped(&test.name));
                    continue;
                }

                match self
                    .run_test(suite, test, browser.as_ref(), &page, &run, cleanup.as_ref())
                    .await
                {
                    Ok(test_result) => result.tests.push(test_result),
                    Err(fatal) => {
                        error!("Run aborted: {}", fatal);
                        report.aborted = Some(fatal.to_string());
                        report.suites.push(result);
                        break 'suites;
                    }
                }
            }

            run.sessions.end_suite();
            report.suites.push(result);
        }

        if let Err(e) = browser.close().await {
            warn!("Browser did not close cleanly: {}", e);
        }

        report.tally(start.elapsed());
        info!(
            "Test Results: {} passed, {} failed, {} skipped ({} ms)",
            report.passed, report.failed, report.skipped, report.duration_ms
        );
        Ok(report)
    }

    /// Run one test with its retries. `Err` means the whole run must stop.
    async fn run_test(
        &self,
        suite: &LoadedSuite,
        test: &TestCase,
        browser: &dyn Browser,
        page: &PageContext,
        run: &RunState,
        cleanup: Option<&CleanupClient>,
    ) -> E2eResult<TestResult> {
        let start = Instant::now();
        let max_attempts = self.config.retries + 1;
        let mut last = TestResult::skipped(&test.name);

        for attempt in 1..=max_attempts {
            debug!("{} attempt {}/{}", test.name, attempt, max_attempts);
            let mut ctx = TestContext::new(page.clone(), run.clone());

            let outcome = match browser.reset().await {
                Ok(()) => self.run_steps(&mut ctx, suite, test).await,
                Err(e) => Err(e),
            };

            let cleanup_outcome = match cleanup {
                Some(client) if suite.spec.cleanup => {
                    Some(client.cleanup(&ctx.cleanup_request()).await)
                }
                _ => None,
            };

            last = TestResult {
                name: test.name.clone(),
                status: TestStatus::Passed,
                attempts: attempt,
                duration_ms: start.elapsed().as_millis() as u64,
                error: None,
                screenshot: None,
                domain_check: ctx.last_retry.take(),
                cleanup: cleanup_outcome,
            };

            match outcome {
                Ok(()) => {
                    info!("✓ {} ({} ms)", test.name, last.duration_ms);
                    return Ok(last);
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    last.status = TestStatus::Failed;
                    last.error = Some(e.to_string());
                    last.screenshot = self.capture_failure(page, suite, test, attempt, &run.screenshots_dir).await;
                    if attempt < max_attempts {
                        warn!("✗ {} attempt {} failed, retrying: {}", test.name, attempt, e);
                    } else {
                        error!("✗ {} - {}", test.name, e);
                    }
                }
            }
        }

        Ok(last)
    }

    async fn run_steps(&self, ctx: &mut TestContext, suite: &LoadedSuite, test: &TestCase) -> E2eResult<()> {
        for step in suite.spec.before_each.iter().chain(test.steps.iter()) {
            execute_step(ctx, step).await?;
        }
        Ok(())
    }

    async fn capture_failure(
        &self,
        page: &PageContext,
        suite: &LoadedSuite,
        test: &TestCase,
        attempt: u32,
        dir: &Path,
    ) -> Option<PathBuf> {
        if !self.config.artifacts.screenshot_on_failure {
            return None;
        }
        let path = dir.join(failure_screenshot_name(&suite.spec.name, &test.name, attempt));
        match page.screenshot(&path).await {
            Ok(()) => Some(path),
            Err(e) => {
                warn!("Failure screenshot not taken: {}", e);
                None
            }
        }
    }

    /// Write `test-results.json` and `summary.txt` into the results directory
    pub fn write_report(&self, report: &RunReport) -> E2eResult<PathBuf> {
        write_report(&self.config.results_dir, report)
    }
}

pub fn write_report(dir: &Path, report: &RunReport) -> E2eResult<PathBuf> {
    std::fs::create_dir_all(dir)?;

    let path = dir.join("test-results.json");
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(&path, json)?;
    std::fs::write(dir.join("summary.txt"), report.summary())?;

    info!("Results written to: {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_screenshot_name() {
        assert_eq!(
            failure_screenshot_name("Auth / Login", "bad password", 1),
            "Auth---Login_bad-password_FAILED.png"
        );
        assert_eq!(
            failure_screenshot_name("Auth / Login", "bad password", 3),
            "Auth---Login_bad-password_FAILED (attempt 3).png"
        );
    }

    #[test]
    fn test_report_tally_and_summary() {
        let env = venmail_e2e_common::resolve_environment(&Default::default()).unwrap();
        let mut report = RunReport::new(&env);
        let mut failed = TestResult::skipped("b");
        failed.status = TestStatus::Failed;
        failed.attempts = 3;
        failed.error = Some("boom".into());
        let mut passed = TestResult::skipped("a");
        passed.status = TestStatus::Passed;
        passed.attempts = 1;
        report.suites.push(SuiteResult {
            name: "Login".into(),
            path: "auth/login.yaml".into(),
            tests: vec![passed, failed, TestResult::skipped("c")],
        });
        report.tally(Duration::from_millis(1500));

        assert_eq!((report.total, report.passed, report.failed, report.skipped), (3, 1, 1, 1));
        assert!(report.has_failures());
        let summary = report.summary();
        assert!(summary.contains("✗ b"));
        assert!(summary.contains("after 3 attempts"));
        assert!(summary.contains("1 passed, 1 failed, 1 skipped"));
    }

    #[test]
    fn test_write_report_files() {
        let dir = tempfile::tempdir().unwrap();
        let env = venmail_e2e_common::resolve_environment(&Default::default()).unwrap();
        let report = RunReport::new(&env);
        let path = write_report(dir.path(), &report).unwrap();

        let parsed: RunReport = serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(parsed.environment, "staging");
        assert!(dir.path().join("summary.txt").exists());
    }

    #[test]
    fn test_filter_by_tag_and_name() {
        let yaml = "name: Login\ntags: [auth]\ntests:\n  - name: good login\n    steps: []\n  - name: bad login\n    tags: [negative]\n    steps: []\n";
        let suite = LoadedSuite {
            relative_path: "auth/login.yaml".into(),
            path: PathBuf::from("auth/login.yaml"),
            spec: scenario::SuiteSpec::from_yaml(yaml).unwrap(),
        };

        let by_tag = SuiteFilter {
            tag: Some("negative".into()),
            ..Default::default()
        };
        assert!(by_tag.allows_suite(&suite).unwrap());
        assert!(!by_tag.allows_test(&suite, &suite.spec.tests[0]));
        assert!(by_tag.allows_test(&suite, &suite.spec.tests[1]));

        let by_pattern = SuiteFilter {
            pattern: Some("admin/**".into()),
            ..Default::default()
        };
        assert!(!by_pattern.allows_suite(&suite).unwrap());

        let by_name = SuiteFilter {
            test_name: Some("good".into()),
            ..Default::default()
        };
        assert!(by_name.allows_test(&suite, &suite.spec.tests[0]));
        assert!(!by_name.allows_test(&suite, &suite.spec.tests[1]));
    }
}
