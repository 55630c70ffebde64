//! Run Command - execute the selected suites in a real browser

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tracing::info;

use venmail_e2e::runner::{RunReport, TestStatus};
use venmail_e2e::{SuiteFilter, SuiteRunner};
use venmail_e2e_common::RunConfig;

use crate::output::{print_error, print_header, print_list, OutputFormat, TableDisplay};
use crate::settings::{GlobalArgs, Settings};

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Glob over suite paths, relative to the scenarios directory
    #[arg(short, long)]
    pub pattern: Option<String>,

    /// Only suites or tests carrying this tag
    #[arg(short, long)]
    pub tag: Option<String>,

    /// Only tests whose name contains this text
    #[arg(short = 'g', long = "grep")]
    pub test_name: Option<String>,

    /// Scenarios directory
    #[arg(long)]
    pub scenarios: Option<PathBuf>,

    /// Results directory
    #[arg(long)]
    pub results: Option<PathBuf>,

    /// Re-runs granted to a failing test
    #[arg(long)]
    pub retries: Option<u32>,

    /// Browser engine (chromium, firefox, webkit)
    #[arg(long)]
    pub browser: Option<String>,

    /// Show the browser window
    #[arg(long)]
    pub headed: bool,

    /// Do not record videos
    #[arg(long)]
    pub no_video: bool,

    /// Keep sessions cached across suite files
    #[arg(long)]
    pub cache_across_suites: bool,
}

impl RunArgs {
    fn apply(&self, config: &mut RunConfig) {
        if let Some(dir) = &self.scenarios {
            config.scenarios_dir = dir.clone();
        }
        if let Some(dir) = &self.results {
            config.results_dir = dir.clone();
        }
        if let Some(retries) = self.retries {
            config.retries = retries;
        }
        if let Some(browser) = &self.browser {
            config.browser.kind = browser.clone();
        }
        if self.headed {
            config.browser.headless = false;
        }
        if self.no_video {
            config.artifacts.video = false;
        }
        if self.cache_across_suites {
            config.cache_across_suites = true;
        }
    }

    fn filter(&self) -> SuiteFilter {
        SuiteFilter {
            pattern: self.pattern.clone(),
            tag: self.tag.clone(),
            test_name: self.test_name.clone(),
        }
    }
}

/// One test as a table row
#[derive(Serialize)]
struct TestRow {
    suite: String,
    test: String,
    status: TestStatus,
    attempts: u32,
    duration_ms: u64,
    error: String,
}

impl TableDisplay for TestRow {
    fn headers() -> Vec<&'static str> {
        vec!["Suite", "Test", "Status", "Attempts", "Duration", "Error"]
    }

    fn row(&self) -> Vec<String> {
        let status = match self.status {
            TestStatus::Passed => "passed".green().to_string(),
            TestStatus::Failed => "failed".red().to_string(),
            TestStatus::Skipped => "skipped".dimmed().to_string(),
        };
        vec![
            self.suite.clone(),
            self.test.clone(),
            status,
            self.attempts.to_string(),
            format!("{} ms", self.duration_ms),
            self.error.chars().take(80).collect(),
        ]
    }
}

fn rows(report: &RunReport) -> Vec<TestRow> {
    report
        .suites
        .iter()
        .flat_map(|suite| {
            suite.tests.iter().map(move |test| TestRow {
                suite: suite.name.clone(),
                test: test.name.clone(),
                status: test.status,
                attempts: test.attempts,
                duration_ms: test.duration_ms,
                error: test.error.clone().unwrap_or_default(),
            })
        })
        .collect()
}

pub async fn execute(args: RunArgs, global: &GlobalArgs, format: OutputFormat) -> Result<()> {
    let mut settings = Settings::load(global)?;
    args.apply(&mut settings.config);

    let runner = SuiteRunner::with_playwright(settings.config, settings.env, settings.resolver)?
        .with_filter(args.filter());
    let report = runner.run().await?;
    let path = runner.write_report(&report)?;
    info!("Report: {}", path.display());

    match format {
        OutputFormat::Table | OutputFormat::Plain => {
            print_header(&format!(
                "Venmail E2E - {} ({})",
                report.environment, report.base_url
            ));
            print_list(&rows(&report), format);
            let totals = format!(
                "{} passed, {} failed, {} skipped in {} ms",
                report.passed, report.failed, report.skipped, report.duration_ms
            );
            if report.has_failures() {
                println!("{}", totals.red().bold());
            } else {
                println!("{}", totals.green().bold());
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Yaml => println!("{}", serde_yaml::to_string(&report)?),
    }

    if let Some(reason) = &report.aborted {
        print_error(&format!("Run aborted: {}", reason));
        bail!("run aborted");
    }
    if report.has_failures() {
        bail!("{} test(s) failed", report.failed);
    }
    Ok(())
}
