//! Shared page context: navigation, bounded waits and assertions
//!
//! Every wait polls the browser until one of a set of observable
//! conditions holds or the timeout elapses. Page objects build on these
//! primitives instead of sleeping for fixed durations.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use regex::Regex;
use tokio::time::Instant;
use tracing::debug;

use venmail_e2e_common::config::TimeoutConfig;

use crate::browser::{Browser, Locator};
use crate::error::{E2eError, E2eResult};

/// Resolved wait bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub command: Duration,
    pub page_load: Duration,
    pub response: Duration,
    pub login_landing: Duration,
    pub poll_interval: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self::from(&TimeoutConfig::default())
    }
}

impl From<&TimeoutConfig> for Timeouts {
    fn from(config: &TimeoutConfig) -> Self {
        Self {
            command: Duration::from_millis(config.command_ms),
            page_load: Duration::from_millis(config.page_load_ms),
            response: Duration::from_millis(config.response_ms),
            login_landing: Duration::from_millis(config.login_landing_ms),
            poll_interval: Duration::from_millis(config.poll_interval_ms.max(1)),
        }
    }
}

/// An observable UI state
#[derive(Debug, Clone)]
pub enum Condition {
    Visible(Locator),
    Hidden(Locator),
    /// At least one match in the DOM, visible or not
    Present(Locator),
    Absent(Locator),
    Enabled(Locator),
    Disabled(Locator),
    TextVisible(String),
    UrlContains(String),
    UrlMatches(Regex),
    LocatorText { locator: Locator, text: String },
    /// Page text contains at least one of the markers
    BodyContainsAny(Vec<String>),
}

impl Condition {
    pub fn visible(css: &str) -> Self {
        Condition::Visible(Locator::css(css))
    }

    pub fn text(text: impl Into<String>) -> Self {
        Condition::TextVisible(text.into())
    }

    pub fn url_contains(fragment: impl Into<String>) -> Self {
        Condition::UrlContains(fragment.into())
    }

    pub fn describe(&self) -> String {
        match self {
            Condition::Visible(l) => format!("{} visible", l.describe()),
            Condition::Hidden(l) => format!("{} hidden", l.describe()),
            Condition::Present(l) => format!("{} present", l.describe()),
            Condition::Absent(l) => format!("{} absent", l.describe()),
            Condition::Enabled(l) => format!("{} enabled", l.describe()),
            Condition::Disabled(l) => format!("{} disabled", l.describe()),
            Condition::TextVisible(t) => format!("text \"{}\" visible", t),
            Condition::UrlContains(f) => format!("URL containing \"{}\"", f),
            Condition::UrlMatches(re) => format!("URL matching /{}/", re.as_str()),
            Condition::LocatorText { locator, text } => {
                format!("{} containing \"{}\"", locator.describe(), text)
            }
            Condition::BodyContainsAny(markers) => format!("page text containing any of {:?}", markers),
        }
    }
}

/// Browser plus everything page objects need to drive it
#[derive(Clone)]
pub struct PageContext {
    browser: Arc<dyn Browser>,
    base_url: String,
    timeouts: Timeouts,
}

impl PageContext {
    pub fn new(browser: Arc<dyn Browser>, base_url: impl Into<String>, timeouts: Timeouts) -> Self {
        Self {
            browser,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeouts,
        }
    }

    pub fn browser(&self) -> &dyn Browser {
        self.browser.as_ref()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeouts(&self) -> &Timeouts {
        &self.timeouts
    }

    /// Absolute URL for an app path
    pub fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") || path == "about:blank" {
            path.to_string()
        } else if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    pub async fn visit(&self, path: &str) -> E2eResult<()> {
        self.browser.goto(&self.url(path)).await
    }

    pub async fn current_url(&self) -> E2eResult<String> {
        self.browser.current_url().await
    }

    pub async fn body_text(&self) -> E2eResult<String> {
        self.browser.body_text().await
    }

    async fn holds(&self, condition: &Condition) -> E2eResult<bool> {
        let b = &self.browser;
        Ok(match condition {
            Condition::Visible(l) => b.is_visible(l).await?,
            Condition::Hidden(l) => !b.is_visible(l).await?,
            Condition::Present(l) => b.count(l).await? > 0,
            Condition::Absent(l) => b.count(l).await? == 0,
            Condition::Enabled(l) => b.is_enabled(l).await?,
            Condition::Disabled(l) => b.count(l).await? > 0 && !b.is_enabled(l).await?,
            Condition::TextVisible(t) => b.is_visible(&Locator::Text(t.clone())).await?,
            Condition::UrlContains(f) => b.current_url().await?.contains(f.as_str()),
            Condition::UrlMatches(re) => re.is_match(&b.current_url().await?),
            Condition::LocatorText { locator, text } => b
                .text_of(locator)
                .await?
                .map(|content| content.contains(text.as_str()))
                .unwrap_or(false),
            Condition::BodyContainsAny(markers) => {
                let body = b.body_text().await?;
                markers.iter().any(|m| body.contains(m.as_str()))
            }
        })
    }

    /// Wait until any condition holds, returning its index
    pub async fn wait_for_any(&self, conditions: &[Condition], timeout: Duration) -> E2eResult<usize> {
        let deadline = Instant::now() + timeout;
        loop {
            for (index, condition) in conditions.iter().enumerate() {
                if self.holds(condition).await? {
                    return Ok(index);
                }
            }
            if Instant::now() >= deadline {
                let what = conditions
                    .iter()
                    .map(Condition::describe)
                    .collect::<Vec<_>>()
                    .join(" or ");
                return Err(E2eError::Timeout {
                    what,
                    after_ms: timeout.as_millis() as u64,
                });
            }
            tokio::time::sleep(self.timeouts.poll_interval).await;
        }
    }

    pub async fn wait_for(&self, condition: Condition, timeout: Duration) -> E2eResult<()> {
        self.wait_for_any(std::slice::from_ref(&condition), timeout)
            .await
            .map(|_| ())
    }

    /// Whether the condition comes to hold within the timeout
    pub async fn appears_within(&self, condition: Condition, timeout: Duration) -> E2eResult<bool> {
        match self.wait_for(condition, timeout).await {
            Ok(()) => Ok(true),
            Err(E2eError::Timeout { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Assert a condition within the default command timeout
    pub async fn expect(&self, condition: Condition) -> E2eResult<()> {
        self.expect_within(condition, self.timeouts.command).await
    }

    /// Assert a condition, reporting what was observed instead on failure
    pub async fn expect_within(&self, condition: Condition, timeout: Duration) -> E2eResult<()> {
        match self.wait_for(condition.clone(), timeout).await {
            Ok(()) => Ok(()),
            Err(E2eError::Timeout { after_ms, .. }) => {
                let observed = self.observe(&condition, after_ms).await;
                Err(E2eError::assertion(condition.describe(), observed))
            }
            Err(e) => Err(e),
        }
    }

    async fn observe(&self, condition: &Condition, after_ms: u64) -> String {
        match condition {
            Condition::UrlContains(_) | Condition::UrlMatches(_) => match self.current_url().await {
                Ok(url) => format!("URL {}", url),
                Err(e) => e.to_string(),
            },
            Condition::LocatorText { locator, .. } => match self.browser.text_of(locator).await {
                Ok(Some(text)) => format!("\"{}\"", text.trim()),
                Ok(None) => format!("{} not found", locator.describe()),
                Err(e) => e.to_string(),
            },
            _ => format!("not met after {} ms", after_ms),
        }
    }

    /// Fill an input once it is visible
    pub async fn type_into(&self, locator: &Locator, text: &str) -> E2eResult<()> {
        debug!("type into {}", locator.describe());
        self.expect(Condition::Visible(locator.clone())).await?;
        self.browser.fill(locator, text).await
    }

    /// Click once the target is visible and enabled
    pub async fn click(&self, locator: &Locator) -> E2eResult<()> {
        debug!("click {}", locator.describe());
        self.expect(Condition::Visible(locator.clone())).await?;
        self.expect(Condition::Enabled(locator.clone())).await?;
        self.browser.click(locator, false).await
    }

    /// Click without actionability checks, once the target exists
    pub async fn force_click(&self, locator: &Locator) -> E2eResult<()> {
        debug!("force click {}", locator.describe());
        self.expect(Condition::Present(locator.clone())).await?;
        self.browser.click(locator, true).await
    }

    pub async fn check(&self, locator: &Locator) -> E2eResult<()> {
        self.expect(Condition::Present(locator.clone())).await?;
        self.browser.check(locator).await
    }

    /// Fixed delay for UI effects that have no observable completion signal
    pub async fn settle(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    pub async fn screenshot(&self, path: &Path) -> E2eResult<()> {
        self.browser.screenshot(path, true).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_condition_descriptions() {
        assert_eq!(
            Condition::url_contains("m/all").describe(),
            "URL containing \"m/all\""
        );
        assert_eq!(
            Condition::visible("#password").describe(),
            "`#password` visible"
        );
    }

    #[test]
    fn test_timeouts_from_config() {
        let timeouts = Timeouts::default();
        assert_eq!(timeouts.login_landing, Duration::from_secs(20));
        assert_eq!(timeouts.poll_interval, Duration::from_millis(100));
    }
}
