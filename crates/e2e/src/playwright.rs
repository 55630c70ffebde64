//! Playwright browser automation
//!
//! A small node script is written to a temp dir and kept running for the
//! whole run. Commands go to it as JSON lines on stdin and each gets exactly
//! one JSON line back on stdout, so one page (and its cookies) survives
//! across every step of a suite.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command as TokioCommand};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use venmail_e2e_common::config::{BrowserConfig, TimeoutConfig};

use crate::browser::{Browser, BrowserLauncher, Cookie, InterceptId, InterceptedResponse, Locator};
use crate::error::{E2eError, E2eResult};

const BRIDGE_SCRIPT: &str = r#"
const readline = require('readline');
const pw = require(require.resolve('playwright', { paths: [process.cwd()] }));
const config = JSON.parse(process.argv[2]);

(async () => {
  const browser = await pw[config.browser].launch({ headless: config.headless });
  const options = { viewport: { width: config.width, height: config.height } };
  if (config.videoDir) {
    options.recordVideo = { dir: config.videoDir, size: { width: config.width, height: config.height } };
  }
  const context = await browser.newContext(options);
  const page = await context.newPage();
  page.on('pageerror', err => process.stderr.write('[pageerror] ' + err.message + '\n'));

  const intercepts = new Map();
  const first = sel => page.locator(sel).first();

  const handlers = {
    goto: a => page.goto(a.url, { timeout: a.timeout, waitUntil: 'load' }).then(() => null),
    url: () => page.url(),
    click: a => first(a.selector).click({ force: a.force, timeout: a.timeout }).then(() => null),
    fill: a => first(a.selector).fill(a.text, { timeout: a.timeout }).then(() => null),
    clear: a => first(a.selector).fill('', { timeout: a.timeout }).then(() => null),
    check: a => first(a.selector).check({ timeout: a.timeout }).then(() => null),
    hover: a => first(a.selector).hover({ timeout: a.timeout }).then(() => null),
    visible: a => first(a.selector).isVisible(),
    enabled: async a => (await page.locator(a.selector).count()) > 0 && first(a.selector).isEnabled(),
    count: a => page.locator(a.selector).count(),
    text: async a => (await page.locator(a.selector).count()) > 0 ? first(a.selector).textContent() : null,
    body: () => page.locator('body').innerText(),
    validationMessage: async a => (await page.locator(a.selector).count()) > 0
      ? first(a.selector).evaluate(el => el.validationMessage || null)
      : null,
    cookies: () => context.cookies(),
    setCookies: a => context.addCookies(a.cookies.map(c => c.domain
      ? c
      : { name: c.name, value: c.value, url: config.baseUrl })).then(() => null),
    clearCookies: () => context.clearCookies().then(() => null),
    intercept: a => {
      const re = new RegExp(a.pattern);
      const pending = page
        .waitForResponse(r => r.request().method() === a.method && re.test(r.url()), { timeout: a.timeout })
        .then(r => ({ url: r.url(), status: r.status() }));
      pending.catch(() => {});
      intercepts.set(a.intercept, pending);
      return null;
    },
    waitIntercept: async a => {
      const pending = intercepts.get(a.intercept);
      if (!pending) throw new Error('unknown intercept ' + a.intercept);
      intercepts.delete(a.intercept);
      return pending;
    },
    screenshot: a => page.screenshot({ path: a.path, fullPage: a.fullPage }).then(() => null),
    close: async () => { await context.close(); await browser.close(); return null; },
  };

  send({ id: 0, ok: true, result: 'ready' });

  let queue = Promise.resolve();
  readline.createInterface({ input: process.stdin }).on('line', line => {
    queue = queue.then(async () => {
      let msg;
      try { msg = JSON.parse(line); } catch (e) { return; }
      const handler = handlers[msg.op];
      try {
        if (!handler) throw new Error('unknown op ' + msg.op);
        send({ id: msg.id, ok: true, result: (await handler(msg)) ?? null });
      } catch (e) {
        send({ id: msg.id, ok: false, error: e.message });
      }
      if (msg.op === 'close') process.exit(0);
    });
  });
})().catch(e => {
  send({ id: 0, ok: false, error: e.message });
  process.exit(1);
});

function send(msg) { process.stdout.write(JSON.stringify(msg) + '\n'); }
"#;

/// Browser engine
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BrowserKind {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl BrowserKind {
    fn as_str(&self) -> &'static str {
        match self {
            BrowserKind::Chromium => "chromium",
            BrowserKind::Firefox => "firefox",
            BrowserKind::Webkit => "webkit",
        }
    }
}

impl FromStr for BrowserKind {
    type Err = E2eError;

    fn from_str(s: &str) -> E2eResult<Self> {
        match s.to_ascii_lowercase().as_str() {
            "chromium" | "chrome" => Ok(BrowserKind::Chromium),
            "firefox" => Ok(BrowserKind::Firefox),
            "webkit" | "safari" => Ok(BrowserKind::Webkit),
            other => Err(E2eError::Playwright(format!("Unsupported browser: {}", other))),
        }
    }
}

/// Configuration for Playwright
#[derive(Debug, Clone)]
pub struct PlaywrightConfig {
    pub base_url: String,
    pub browser: BrowserKind,
    pub headless: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,
    /// Record video of the run into this directory
    pub video_dir: Option<PathBuf>,
    /// Directory node resolves the `playwright` package from
    pub working_dir: PathBuf,
    /// Per-command timeout handed to Playwright
    pub command_timeout: Duration,
    pub page_load_timeout: Duration,
}

impl Default for PlaywrightConfig {
    fn default() -> Self {
        Self {
            base_url: "https://app.venmail.io".to_string(),
            browser: BrowserKind::Chromium,
            headless: true,
            viewport_width: 1280,
            viewport_height: 720,
            video_dir: None,
            working_dir: PathBuf::from("."),
            command_timeout: Duration::from_secs(10),
            page_load_timeout: Duration::from_secs(60),
        }
    }
}

impl PlaywrightConfig {
    /// Build from the run configuration
    pub fn from_run(
        base_url: &str,
        browser: &BrowserConfig,
        timeouts: &TimeoutConfig,
        video_dir: Option<PathBuf>,
    ) -> E2eResult<Self> {
        Ok(Self {
            base_url: base_url.to_string(),
            browser: browser.kind.parse()?,
            headless: browser.headless,
            viewport_width: browser.viewport_width,
            viewport_height: browser.viewport_height,
            video_dir,
            working_dir: std::env::current_dir()?,
            command_timeout: Duration::from_millis(timeouts.command_ms),
            page_load_timeout: Duration::from_millis(timeouts.page_load_ms),
        })
    }

    /// Longest a single bridge round trip may take
    fn response_deadline(&self) -> Duration {
        self.command_timeout.max(self.page_load_timeout) + Duration::from_secs(5)
    }
}

/// Check if Playwright is installed
pub fn check_playwright_installed() -> E2eResult<()> {
    let output = Command::new("npx")
        .args(["playwright", "--version"])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();

    match output {
        Ok(status) if status.success() => Ok(()),
        _ => Err(E2eError::PlaywrightNotFound),
    }
}

/// Launches [`PlaywrightBrowser`] instances
#[derive(Debug, Clone)]
pub struct PlaywrightLauncher {
    config: PlaywrightConfig,
}

impl PlaywrightLauncher {
    pub fn new(config: PlaywrightConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl BrowserLauncher for PlaywrightLauncher {
    async fn launch(&self) -> E2eResult<Arc<dyn Browser>> {
        let browser = PlaywrightBrowser::launch(self.config.clone()).await?;
        Ok(Arc::new(browser))
    }
}

#[derive(Debug, Deserialize)]
struct BridgeResponse {
    id: u64,
    ok: bool,
    #[serde(default)]
    result: Value,
    #[serde(default)]
    error: Option<String>,
}

struct BridgeIo {
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
}

impl BridgeIo {
    async fn read_response(&mut self) -> E2eResult<BridgeResponse> {
        loop {
            let line = self.stdout.next_line().await?.ok_or(E2eError::BridgeClosed)?;
            match serde_json::from_str::<BridgeResponse>(&line) {
                Ok(response) => return Ok(response),
                Err(_) => debug!("[bridge] {}", line),
            }
        }
    }
}

/// A live Playwright page driven over the bridge
pub struct PlaywrightBrowser {
    io: Mutex<BridgeIo>,
    child: Mutex<Child>,
    next_id: AtomicU64,
    config: PlaywrightConfig,
    _script_dir: tempfile::TempDir,
}

impl PlaywrightBrowser {
    /// Start node with the bridge script and wait for the page to be ready
    pub async fn launch(config: PlaywrightConfig) -> E2eResult<Self> {
        check_playwright_installed()?;

        if let Some(dir) = &config.video_dir {
            std::fs::create_dir_all(dir)?;
        }

        let script_dir = tempfile::tempdir()?;
        let script_path = script_dir.path().join("bridge.js");
        std::fs::write(&script_path, BRIDGE_SCRIPT)?;

        let launch_args = json!({
            "browser": config.browser.as_str(),
            "headless": config.headless,
            "width": config.viewport_width,
            "height": config.viewport_height,
            "videoDir": config.video_dir.as_ref().map(|p| p.to_string_lossy().to_string()),
            "baseUrl": config.base_url,
        });

        debug!("Starting Playwright bridge: {}", script_path.display());

        let mut child = TokioCommand::new("node")
            .arg(&script_path)
            .arg(launch_args.to_string())
            .current_dir(&config.working_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| E2eError::Playwright("bridge stdin unavailable".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| E2eError::Playwright("bridge stdout unavailable".to_string()))?;

        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!("[browser] {}", line);
                }
            });
        }

        let mut io = BridgeIo {
            stdin,
            stdout: BufReader::new(stdout).lines(),
        };

        let ready = tokio::time::timeout(config.response_deadline(), io.read_response())
            .await
            .map_err(|_| E2eError::Playwright("bridge did not start in time".to_string()))??;
        if !ready.ok {
            return Err(E2eError::Playwright(format!(
                "browser launch failed: {}",
                ready.error.unwrap_or_default()
            )));
        }

        info!(
            "Launched {} ({}x{}, headless: {})",
            config.browser.as_str(),
            config.viewport_width,
            config.viewport_height,
            config.headless
        );

        Ok(Self {
            io: Mutex::new(io),
            child: Mutex::new(child),
            next_id: AtomicU64::new(1),
            config,
            _script_dir: script_dir,
        })
    }

    async fn request(&self, op: &str, mut args: Value) -> E2eResult<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        if let Value::Object(map) = &mut args {
            map.insert("id".to_string(), json!(id));
            map.insert("op".to_string(), json!(op));
        }

        let mut io = self.io.lock().await;
        let mut line = args.to_string();
        line.push('\n');
        io.stdin
            .write_all(line.as_bytes())
            .await
            .map_err(|_| E2eError::BridgeClosed)?;
        io.stdin.flush().await.map_err(|_| E2eError::BridgeClosed)?;

        let deadline = self.config.response_deadline();
        loop {
            let response = tokio::time::timeout(deadline, io.read_response())
                .await
                .map_err(|_| E2eError::Timeout {
                    what: format!("browser command {}", op),
                    after_ms: deadline.as_millis() as u64,
                })??;

            if response.id != id {
                warn!("Discarding stale bridge response {}", response.id);
                continue;
            }
            if response.ok {
                return Ok(response.result);
            }
            return Err(E2eError::Playwright(format!(
                "{} failed: {}",
                op,
                response.error.unwrap_or_default()
            )));
        }
    }

    async fn request_as<T: DeserializeOwned>(&self, op: &str, args: Value) -> E2eResult<T> {
        let value = self.request(op, args).await?;
        Ok(serde_json::from_value(value)?)
    }

    fn timeout_ms(&self) -> u64 {
        self.config.command_timeout.as_millis() as u64
    }
}

/// Convert a Playwright URL glob (`**/password**`) to a regex
pub fn url_glob_to_regex(glob: &str) -> String {
    let mut pattern = String::from("^");
    let mut rest = glob;
    while !rest.is_empty() {
        if let Some(stripped) = rest.strip_prefix("**") {
            pattern.push_str(".*");
            rest = stripped;
        } else if let Some(stripped) = rest.strip_prefix('*') {
            pattern.push_str("[^/]*");
            rest = stripped;
        } else {
            let next = rest.find('*').unwrap_or(rest.len());
            pattern.push_str(&regex::escape(&rest[..next]));
            rest = &rest[next..];
        }
    }
    pattern.push('$');
    pattern
}

#[async_trait]
impl Browser for PlaywrightBrowser {
    async fn goto(&self, url: &str) -> E2eResult<()> {
        debug!("goto {}", url);
        let timeout = self.config.page_load_timeout.as_millis() as u64;
        self.request("goto", json!({ "url": url, "timeout": timeout })).await?;
        Ok(())
    }

    async fn current_url(&self) -> E2eResult<String> {
        self.request_as("url", json!({})).await
    }

    async fn click(&self, locator: &Locator, force: bool) -> E2eResult<()> {
        self.request(
            "click",
            json!({ "selector": locator.to_playwright(), "force": force, "timeout": self.timeout_ms() }),
        )
        .await?;
        Ok(())
    }

    async fn fill(&self, locator: &Locator, text: &str) -> E2eResult<()> {
        self.request(
            "fill",
            json!({ "selector": locator.to_playwright(), "text": text, "timeout": self.timeout_ms() }),
        )
        .await?;
        Ok(())
    }

    async fn clear(&self, locator: &Locator) -> E2eResult<()> {
        self.request(
            "clear",
            json!({ "selector": locator.to_playwright(), "timeout": self.timeout_ms() }),
        )
        .await?;
        Ok(())
    }

    async fn check(&self, locator: &Locator) -> E2eResult<()> {
        self.request(
            "check",
            json!({ "selector": locator.to_playwright(), "timeout": self.timeout_ms() }),
        )
        .await?;
        Ok(())
    }

    async fn hover(&self, locator: &Locator) -> E2eResult<()> {
        self.request(
            "hover",
            json!({ "selector": locator.to_playwright(), "timeout": self.timeout_ms() }),
        )
        .await?;
        Ok(())
    }

    async fn is_visible(&self, locator: &Locator) -> E2eResult<bool> {
        self.request_as("visible", json!({ "selector": locator.to_playwright() }))
            .await
    }

    async fn is_enabled(&self, locator: &Locator) -> E2eResult<bool> {
        self.request_as("enabled", json!({ "selector": locator.to_playwright() }))
            .await
    }

    async fn count(&self, locator: &Locator) -> E2eResult<usize> {
        self.request_as("count", json!({ "selector": locator.to_playwright() }))
            .await
    }

    async fn text_of(&self, locator: &Locator) -> E2eResult<Option<String>> {
        self.request_as("text", json!({ "selector": locator.to_playwright() }))
            .await
    }

    async fn body_text(&self) -> E2eResult<String> {
        self.request_as("body", json!({})).await
    }

    async fn validation_message(&self, locator: &Locator) -> E2eResult<Option<String>> {
        self.request_as(
            "validationMessage",
            json!({ "selector": locator.to_playwright() }),
        )
        .await
    }

    async fn cookies(&self) -> E2eResult<Vec<Cookie>> {
        self.request_as("cookies", json!({})).await
    }

    async fn set_cookies(&self, cookies: &[Cookie]) -> E2eResult<()> {
        self.request("setCookies", json!({ "cookies": cookies })).await?;
        Ok(())
    }

    async fn clear_cookies(&self) -> E2eResult<()> {
        self.request("clearCookies", json!({})).await?;
        Ok(())
    }

    async fn intercept(&self, method: &str, url_glob: &str, timeout: Duration) -> E2eResult<InterceptId> {
        let id = InterceptId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.request(
            "intercept",
            json!({
                "intercept": id.0,
                "method": method.to_ascii_uppercase(),
                "pattern": url_glob_to_regex(url_glob),
                "timeout": timeout.as_millis() as u64,
            }),
        )
        .await?;
        Ok(id)
    }

    async fn wait_for_intercept(&self, id: InterceptId) -> E2eResult<InterceptedResponse> {
        self.request_as("waitIntercept", json!({ "intercept": id.0 }))
            .await
    }

    async fn screenshot(&self, path: &Path, full_page: bool) -> E2eResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        self.request(
            "screenshot",
            json!({ "path": path.to_string_lossy(), "fullPage": full_page }),
        )
        .await?;
        Ok(())
    }

    async fn close(&self) -> E2eResult<()> {
        let result = self.request("close", json!({})).await;
        let mut child = self.child.lock().await;
        match tokio::time::timeout(Duration::from_secs(10), child.wait()).await {
            Ok(Ok(status)) => debug!("Playwright bridge exited: {}", status),
            _ => {
                warn!("Playwright bridge did not exit, killing it");
                child.kill().await?;
            }
        }
        result.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("**/password**", "https://api.venmail.io/api/user/password", true ; "password endpoint")]
    #[test_case("**/password**", "https://api.venmail.io/api/user/profile", false ; "other endpoint")]
    #[test_case("**/api/*/cleanup", "https://x.io/api/test/cleanup", true ; "single segment")]
    #[test_case("**/api/*/cleanup", "https://x.io/api/a/b/cleanup", false ; "single star stops at slash")]
    fn test_url_glob(glob: &str, url: &str, matches: bool) {
        let re = regex::Regex::new(&url_glob_to_regex(glob)).unwrap();
        assert_eq!(re.is_match(url), matches);
    }

    #[test]
    fn test_browser_kind_parse() {
        assert_eq!("Chromium".parse::<BrowserKind>().unwrap(), BrowserKind::Chromium);
        assert_eq!("webkit".parse::<BrowserKind>().unwrap(), BrowserKind::Webkit);
        assert!("lynx".parse::<BrowserKind>().is_err());
    }

    #[test]
    fn test_config_from_run() {
        let config = PlaywrightConfig::from_run(
            "https://app.venmail.io",
            &BrowserConfig::default(),
            &TimeoutConfig::default(),
            None,
        )
        .unwrap();
        assert_eq!(config.command_timeout, Duration::from_secs(10));
        assert_eq!(config.response_deadline(), Duration::from_secs(65));
    }
}
