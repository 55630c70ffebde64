//! Browser capability consumed by page objects
//!
//! The automation harness is treated as a black box that executes one
//! command at a time. Everything above this trait (waits, sessions, retry
//! loops) is expressed in terms of these primitives so it can be exercised
//! against a scripted fake.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::E2eResult;

/// How to find an element
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "by", content = "value", rename_all = "snake_case")]
pub enum Locator {
    /// CSS selector; the first match is used
    Css(String),
    /// Any element whose text contains the string
    Text(String),
    /// Element whose whole text equals the string
    ExactText(String),
    /// Element matching a CSS selector whose text contains the string
    CssWithText { css: String, text: String },
    /// The n-th (zero based) match of a CSS selector
    Nth { css: String, index: usize },
    /// The last match of a CSS selector
    Last(String),
}

impl Locator {
    pub fn css(selector: impl Into<String>) -> Self {
        Locator::Css(selector.into())
    }

    pub fn text(text: impl Into<String>) -> Self {
        Locator::Text(text.into())
    }

    /// `<button>` containing the text
    pub fn button(text: impl Into<String>) -> Self {
        Locator::CssWithText {
            css: "button".to_string(),
            text: text.into(),
        }
    }

    pub fn nth(css: impl Into<String>, index: usize) -> Self {
        Locator::Nth {
            css: css.into(),
            index,
        }
    }

    pub fn last(css: impl Into<String>) -> Self {
        Locator::Last(css.into())
    }

    /// Selector string in Playwright's selector syntax
    pub fn to_playwright(&self) -> String {
        match self {
            Locator::Css(css) => css.clone(),
            Locator::Text(text) => format!("text={}", text),
            Locator::ExactText(text) => format!("text=\"{}\"", escape_quotes(text)),
            Locator::CssWithText { css, text } => {
                format!("{}:has-text(\"{}\")", css, escape_quotes(text))
            }
            Locator::Nth { css, index } => format!("{} >> nth={}", css, index),
            Locator::Last(css) => format!("{} >> nth=-1", css),
        }
    }

    /// Human-readable form for logs and assertion messages
    pub fn describe(&self) -> String {
        match self {
            Locator::Css(css) => format!("`{}`", css),
            Locator::Text(text) => format!("text \"{}\"", text),
            Locator::ExactText(text) => format!("exact text \"{}\"", text),
            Locator::CssWithText { css, text } => format!("`{}` containing \"{}\"", css, text),
            Locator::Nth { css, index } => format!("`{}`[{}]", css, index),
            Locator::Last(css) => format!("last `{}`", css),
        }
    }
}

fn escape_quotes(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

/// A browser cookie
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cookie {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub domain: String,
    #[serde(default = "default_cookie_path")]
    pub path: String,
    #[serde(default)]
    pub http_only: bool,
    #[serde(default)]
    pub secure: bool,
}

fn default_cookie_path() -> String {
    "/".to_string()
}

impl Cookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            domain: domain.into(),
            path: default_cookie_path(),
            http_only: false,
            secure: false,
        }
    }
}

/// Handle to a registered network intercept
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InterceptId(pub u64);

/// Response observed by an intercept
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterceptedResponse {
    pub url: String,
    pub status: u16,
}

impl InterceptedResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Primitive browser operations.
///
/// Queries (`is_visible`, `count`, `text_of`, ...) never wait; waiting is
/// layered on top by [`crate::page::PageContext`]. Actions may fail with a
/// driver error if the target is missing.
#[async_trait]
pub trait Browser: Send + Sync {
    /// Navigate to an absolute URL and wait for the load event
    async fn goto(&self, url: &str) -> E2eResult<()>;

    async fn current_url(&self) -> E2eResult<String>;

    async fn click(&self, locator: &Locator, force: bool) -> E2eResult<()>;

    /// Replace the content of an input
    async fn fill(&self, locator: &Locator, text: &str) -> E2eResult<()>;

    async fn clear(&self, locator: &Locator) -> E2eResult<()>;

    async fn check(&self, locator: &Locator) -> E2eResult<()>;

    async fn hover(&self, locator: &Locator) -> E2eResult<()>;

    async fn is_visible(&self, locator: &Locator) -> E2eResult<bool>;

    async fn is_enabled(&self, locator: &Locator) -> E2eResult<bool>;

    async fn count(&self, locator: &Locator) -> E2eResult<usize>;

    /// Text content of the first match, `None` when nothing matches
    async fn text_of(&self, locator: &Locator) -> E2eResult<Option<String>>;

    /// Visible text of the whole page
    async fn body_text(&self) -> E2eResult<String>;

    /// Native form validation message of an input, if any
    async fn validation_message(&self, locator: &Locator) -> E2eResult<Option<String>>;

    async fn cookies(&self) -> E2eResult<Vec<Cookie>>;

    async fn set_cookies(&self, cookies: &[Cookie]) -> E2eResult<()>;

    async fn clear_cookies(&self) -> E2eResult<()>;

    /// Start listening for a response; must be called before the action
    /// that triggers the request
    async fn intercept(&self, method: &str, url_glob: &str, timeout: Duration) -> E2eResult<InterceptId>;

    async fn wait_for_intercept(&self, id: InterceptId) -> E2eResult<InterceptedResponse>;

    async fn screenshot(&self, path: &Path, full_page: bool) -> E2eResult<()>;

    /// Drop cookies and leave the current page, isolating the next test
    async fn reset(&self) -> E2eResult<()> {
        self.clear_cookies().await?;
        self.goto("about:blank").await
    }

    async fn close(&self) -> E2eResult<()>;
}

/// Creates a browser for a run
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self) -> E2eResult<Arc<dyn Browser>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(Locator::css("#email"), "#email" ; "css")]
    #[test_case(Locator::text("Users"), "text=Users" ; "text")]
    #[test_case(Locator::ExactText("Cc".into()), "text=\"Cc\"" ; "exact text")]
    #[test_case(Locator::button("Check Availability"), "button:has-text(\"Check Availability\")" ; "button")]
    #[test_case(Locator::nth(".peer", 2), ".peer >> nth=2" ; "nth")]
    #[test_case(Locator::last("input[type=\"password\"]"), "input[type=\"password\"] >> nth=-1" ; "last")]
    fn test_playwright_selectors(locator: Locator, expected: &str) {
        assert_eq!(locator.to_playwright(), expected);
    }

    #[test]
    fn test_button_text_quotes_escaped() {
        let locator = Locator::button("Say \"hi\"");
        assert_eq!(locator.to_playwright(), "button:has-text(\"Say \\\"hi\\\"\")");
    }

    #[test]
    fn test_cookie_from_playwright_json() {
        let json = r#"{"name":"session","value":"abc","domain":"app.venmail.io","path":"/","expires":-1,"httpOnly":true,"secure":true,"sameSite":"Lax"}"#;
        let cookie: Cookie = serde_json::from_str(json).unwrap();
        assert_eq!(cookie.name, "session");
        assert!(cookie.http_only);
    }
}
