//! Scripted stand-in for the webmail UI
//!
//! Implements just enough of the login form and the business wizard, from
//! personal details to plan selection, for the orchestration layer to be
//! exercised without a real browser.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use venmail_e2e::browser::{Browser, BrowserLauncher, Cookie, InterceptId, InterceptedResponse, Locator};
use venmail_e2e::page::{PageContext, Timeouts};
use venmail_e2e::pages::business::{DOMAIN_OPTION_TEXTS, HOSTING_PROMPT, PLAN_PAGE_TEXTS};
use venmail_e2e::pages::{DomainOption, HostingOption};
use venmail_e2e::{E2eError, E2eResult};
use venmail_e2e_common::CredentialResolver;

pub const BASE_URL: &str = "http://venmail.test";
pub const NORMAL_EMAIL: &str = "jane@venmail.test";
pub const NORMAL_PASSWORD: &str = "correct-horse";
pub const ADMIN_EMAIL: &str = "root@venmail.test";
pub const ADMIN_PASSWORD: &str = "admin-pass";

pub const NO_ACCOUNT: &str = "No account found with this email address";
pub const WRONG_PASSWORD: &str = "The provided password is incorrect";
pub const WEAK_PASSWORD: &str = "Your password must be at least 8 characters";

const DETAILS_FIELDS: [&str; 3] = ["#first_name", "#last_name", "#email"];
const DETAILS_CONTINUE: &str = ".space-y-4 > .flex";

#[derive(Debug, Default)]
struct State {
    url: String,
    fields: HashMap<String, String>,
    password_step: bool,
    error: Option<String>,
    cookies: Vec<Cookie>,
    domain_message: Option<String>,
    found_domain: bool,
    checked: HashSet<String>,
    domain_option: Option<DomainOption>,
    hosting: Option<HostingOption>,
}

/// Fake webmail app behind the [`Browser`] trait
pub struct FakeWebmail {
    state: Mutex<State>,
    accounts: HashMap<String, String>,
    available_domains: HashSet<String>,
    /// Successful password submissions
    pub logins: AtomicUsize,
    pub domain_checks: Mutex<Vec<String>>,
    pub screenshots: Mutex<Vec<PathBuf>>,
}

impl FakeWebmail {
    pub fn new() -> Self {
        Self::with_available_domains(Vec::<String>::new())
    }

    pub fn with_available_domains<I, S>(domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let accounts = HashMap::from([
            (NORMAL_EMAIL.to_string(), NORMAL_PASSWORD.to_string()),
            (ADMIN_EMAIL.to_string(), ADMIN_PASSWORD.to_string()),
        ]);
        Self {
            state: Mutex::new(State {
                url: "about:blank".to_string(),
                ..Default::default()
            }),
            accounts,
            available_domains: domains.into_iter().map(Into::into).collect(),
            logins: AtomicUsize::new(0),
            domain_checks: Mutex::new(Vec::new()),
            screenshots: Mutex::new(Vec::new()),
        }
    }

    pub fn login_count(&self) -> usize {
        self.logins.load(Ordering::SeqCst)
    }

    pub fn checked_domains(&self) -> Vec<String> {
        self.domain_checks.lock().clone()
    }

    fn path(url: &str) -> &str {
        url.strip_prefix(BASE_URL).unwrap_or(url)
    }

    fn on(state: &State, path: &str) -> bool {
        Self::path(&state.url).starts_with(path)
    }

    fn has_session(state: &State) -> bool {
        state.cookies.iter().any(|c| c.name == "session" && !c.value.is_empty())
    }

    pub fn chosen_domain_option(&self) -> Option<DomainOption> {
        self.state.lock().domain_option
    }

    pub fn chosen_hosting(&self) -> Option<HostingOption> {
        self.state.lock().hosting
    }

    fn field<'s>(state: &'s State, css: &str) -> &'s str {
        state.fields.get(css).map(String::as_str).unwrap_or("")
    }

    fn weak_password(state: &State) -> bool {
        let password = Self::field(state, "#password");
        !password.is_empty() && password.len() < 8
    }

    fn visible(state: &State, locator: &Locator) -> bool {
        let login = Self::on(state, "/login");
        let details = Self::on(state, "/register/details");
        let choose = Self::on(state, "/register/choose-domain");
        let domain = Self::on(state, "/register/domain");
        let password = Self::on(state, "/register/password");
        let company = Self::on(state, "/register/company");
        let hosting = Self::on(state, "/register/hosting");
        match locator {
            Locator::Css(css) => match css.as_str() {
                "#email" => login || details,
                "#first_name" | "#last_name" | DETAILS_CONTINUE => details,
                "#password" => (login && state.password_step) || password,
                ".bg-primary-600" => login,
                ".text-red-500 > p" => state.error.is_some(),
                "#domain" => domain,
                "#organization" | "#default-checkbox" => company,
                _ => false,
            },
            Locator::CssWithText { css, text } if css == "button" => match text.as_str() {
                "Check Availability" => domain,
                "Continue" => (domain && state.found_domain) || password || company || hosting,
                other if DomainOption::ALL.iter().any(|o| o.button_text() == other) => choose,
                other if HostingOption::ALL.iter().any(|o| o.button_text() == other) => hosting,
                _ => false,
            },
            Locator::Text(text) | Locator::ExactText(text) => Self::body(state).contains(text.as_str()),
            _ => false,
        }
    }

    /// Continue buttons stay disabled until their step is complete
    fn enabled(state: &State, locator: &Locator) -> bool {
        if !Self::visible(state, locator) {
            return false;
        }
        match locator {
            Locator::Css(css) if css == DETAILS_CONTINUE => {
                DETAILS_FIELDS.iter().all(|f| !Self::field(state, f).is_empty())
            }
            Locator::CssWithText { text, .. } if text == "Continue" => {
                if Self::on(state, "/register/password") {
                    Self::field(state, "#password").len() >= 8
                } else if Self::on(state, "/register/company") {
                    !Self::field(state, "#organization").is_empty()
                        && state.checked.contains("#default-checkbox")
                } else if Self::on(state, "/register/hosting") {
                    state.hosting.is_some()
                } else {
                    true
                }
            }
            _ => true,
        }
    }

    fn advance(state: &mut State, path: &str) {
        state.url = format!("{}{}", BASE_URL, path);
        state.domain_message = None;
    }

    fn body(state: &State) -> String {
        let mut parts = Vec::new();
        if Self::on(state, "/login") {
            parts.push("Sign in to Venmail".to_string());
        }
        if Self::on(state, "/m/all") {
            parts.push("Inbox".to_string());
        }
        if Self::on(state, "/register/details") {
            parts.push("Tell us about yourself".to_string());
        }
        if Self::on(state, "/register/choose-domain") {
            parts.extend(DOMAIN_OPTION_TEXTS.iter().map(|t| t.to_string()));
        }
        if Self::on(state, "/register/domain") {
            parts.push("Enter your domain".to_string());
        }
        if Self::on(state, "/register/password") {
            parts.push("Create a password".to_string());
            if Self::weak_password(state) {
                parts.push(WEAK_PASSWORD.to_string());
            }
        }
        if Self::on(state, "/register/company") {
            parts.push("Company information".to_string());
        }
        if Self::on(state, "/register/hosting") {
            parts.push(HOSTING_PROMPT.to_string());
        }
        if Self::on(state, "/register/plans") {
            parts.extend(PLAN_PAGE_TEXTS.iter().map(|t| t.to_string()));
        }
        parts.extend(state.error.clone());
        parts.extend(state.domain_message.clone());
        parts.join("\n")
    }

    fn submit_login(&self, state: &mut State) {
        let email = state.fields.get("#email").cloned().unwrap_or_default();
        if !state.password_step {
            if self.accounts.contains_key(&email) {
                state.password_step = true;
                state.error = None;
            } else {
                state.error = Some(NO_ACCOUNT.to_string());
            }
            return;
        }

        let password = state.fields.get("#password").cloned().unwrap_or_default();
        if self.accounts.get(&email) == Some(&password) {
            let n = self.logins.fetch_add(1, Ordering::SeqCst) + 1;
            state.cookies.retain(|c| c.name != "session");
            state.cookies.push(Cookie::new("session", format!("token-{}", n), "venmail.test"));
            state.error = None;
            state.password_step = false;
            state.url = format!("{}/m/all", BASE_URL);
        } else {
            state.error = Some(WRONG_PASSWORD.to_string());
        }
    }

    fn check_domain(&self, state: &mut State) {
        let domain = state.fields.get("#domain").cloned().unwrap_or_default();
        self.domain_checks.lock().push(domain.clone());
        if self.available_domains.contains(&domain) {
            state.found_domain = true;
            state.domain_message = Some(format!("We found your domain {}", domain));
        } else {
            state.found_domain = false;
            state.domain_message = Some("This domain is not available for registration".to_string());
        }
    }
}

#[async_trait]
impl Browser for FakeWebmail {
    async fn goto(&self, url: &str) -> E2eResult<()> {
        let mut state = self.state.lock();
        state.fields.clear();
        state.password_step = false;
        state.error = None;
        state.domain_message = None;
        state.found_domain = false;
        state.checked.clear();
        state.hosting = None;
        state.url = url.to_string();
        if Self::on(&state, "/m/all") && !Self::has_session(&state) {
            state.url = format!("{}/login", BASE_URL);
        }
        Ok(())
    }

    async fn current_url(&self) -> E2eResult<String> {
        Ok(self.state.lock().url.clone())
    }

    async fn click(&self, locator: &Locator, _force: bool) -> E2eResult<()> {
        let mut state = self.state.lock();
        if !Self::enabled(&state, locator) {
            return Err(E2eError::Playwright(format!("{} not clickable", locator.describe())));
        }
        match locator {
            Locator::Css(css) if css == ".bg-primary-600" => self.submit_login(&mut state),
            Locator::Css(css) if css == DETAILS_CONTINUE => Self::advance(&mut state, "/register/choose-domain"),
            Locator::CssWithText { text, .. } if text == "Check Availability" => self.check_domain(&mut state),
            Locator::CssWithText { text, .. } if text == "Continue" => {
                let next = if Self::on(&state, "/register/password") {
                    "/register/company"
                } else if Self::on(&state, "/register/company") {
                    "/register/hosting"
                } else if Self::on(&state, "/register/hosting") {
                    "/register/plans"
                } else {
                    "/register/password"
                };
                Self::advance(&mut state, next);
            }
            Locator::CssWithText { text, .. } => {
                if let Some(option) = DomainOption::ALL.into_iter().find(|o| o.button_text() == text) {
                    state.domain_option = Some(option);
                    Self::advance(&mut state, "/register/domain");
                } else if let Some(option) = HostingOption::ALL.into_iter().find(|o| o.button_text() == text) {
                    state.hosting = Some(option);
                }
            }
            _ => {}
        }
        Ok(())
    }

    async fn fill(&self, locator: &Locator, text: &str) -> E2eResult<()> {
        if let Locator::Css(css) = locator {
            self.state.lock().fields.insert(css.clone(), text.to_string());
        }
        Ok(())
    }

    async fn clear(&self, locator: &Locator) -> E2eResult<()> {
        if let Locator::Css(css) = locator {
            self.state.lock().fields.remove(css);
        }
        Ok(())
    }

    async fn check(&self, locator: &Locator) -> E2eResult<()> {
        if let Locator::Css(css) = locator {
            self.state.lock().checked.insert(css.clone());
        }
        Ok(())
    }

    async fn hover(&self, _locator: &Locator) -> E2eResult<()> {
        Ok(())
    }

    async fn is_visible(&self, locator: &Locator) -> E2eResult<bool> {
        Ok(Self::visible(&self.state.lock(), locator))
    }

    async fn is_enabled(&self, locator: &Locator) -> E2eResult<bool> {
        Ok(Self::enabled(&self.state.lock(), locator))
    }

    async fn count(&self, locator: &Locator) -> E2eResult<usize> {
        Ok(usize::from(Self::visible(&self.state.lock(), locator)))
    }

    async fn text_of(&self, locator: &Locator) -> E2eResult<Option<String>> {
        let state = self.state.lock();
        Ok(match locator {
            Locator::Css(css) if css == ".text-red-500 > p" => state.error.clone(),
            _ => None,
        })
    }

    async fn body_text(&self) -> E2eResult<String> {
        Ok(Self::body(&self.state.lock()))
    }

    async fn validation_message(&self, _locator: &Locator) -> E2eResult<Option<String>> {
        Ok(None)
    }

    async fn cookies(&self) -> E2eResult<Vec<Cookie>> {
        Ok(self.state.lock().cookies.clone())
    }

    async fn set_cookies(&self, cookies: &[Cookie]) -> E2eResult<()> {
        let mut state = self.state.lock();
        for cookie in cookies {
            state.cookies.retain(|c| c.name != cookie.name);
            state.cookies.push(cookie.clone());
        }
        Ok(())
    }

    async fn clear_cookies(&self) -> E2eResult<()> {
        self.state.lock().cookies.clear();
        Ok(())
    }

    async fn intercept(&self, _method: &str, _url_glob: &str, _timeout: Duration) -> E2eResult<InterceptId> {
        Ok(InterceptId(1))
    }

    async fn wait_for_intercept(&self, _id: InterceptId) -> E2eResult<InterceptedResponse> {
        Err(E2eError::Playwright("no network in the fake browser".into()))
    }

    async fn screenshot(&self, path: &Path, _full_page: bool) -> E2eResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, b"")?;
        self.screenshots.lock().push(path.to_path_buf());
        Ok(())
    }

    async fn close(&self) -> E2eResult<()> {
        Ok(())
    }
}

/// Hands out the same fake browser and counts launches
pub struct FakeLauncher {
    pub browser: Arc<FakeWebmail>,
    pub launches: AtomicUsize,
}

impl FakeLauncher {
    pub fn new(browser: Arc<FakeWebmail>) -> Self {
        Self {
            browser,
            launches: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl BrowserLauncher for FakeLauncher {
    async fn launch(&self) -> E2eResult<Arc<dyn Browser>> {
        self.launches.fetch_add(1, Ordering::SeqCst);
        let browser: Arc<dyn Browser> = self.browser.clone();
        Ok(browser)
    }
}

/// Page context over the fake with short timeouts
pub fn page_for(browser: Arc<FakeWebmail>) -> PageContext {
    let timeouts = Timeouts {
        command: Duration::from_secs(2),
        page_load: Duration::from_secs(5),
        response: Duration::from_secs(5),
        login_landing: Duration::from_secs(20),
        poll_interval: Duration::from_millis(50),
    };
    PageContext::new(browser, BASE_URL, timeouts)
}

/// Resolver holding the normal and admin identities
pub fn resolver() -> CredentialResolver {
    CredentialResolver::from_map(BTreeMap::from([
        ("NORMAL_USER_EMAIL".to_string(), NORMAL_EMAIL.to_string()),
        ("NORMAL_USER_PASSWORD".to_string(), NORMAL_PASSWORD.to_string()),
        ("ADMIN_EMAIL".to_string(), ADMIN_EMAIL.to_string()),
        ("ADMIN_PASSWORD".to_string(), ADMIN_PASSWORD.to_string()),
    ]))
}
