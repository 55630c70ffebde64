//! Authenticated session cache
//!
//! Logging in through the UI is slow, so the cookie jar produced by a
//! successful login is captured and replayed into later tests that use the
//! same identity in the same environment. A cached entry is only trusted
//! after its validity check passes; otherwise it is dropped and the login
//! runs again.

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use venmail_e2e_common::{Credential, Environment};

use crate::browser::Cookie;
use crate::error::{E2eError, E2eResult};
use crate::page::{Condition, PageContext};
use crate::pages::login::{LoginPage, INBOX_FRAGMENT};

/// Cookie the webmail app sets once authenticated
pub const SESSION_COOKIE: &str = "session";

/// Identity plus environment; sessions never cross either
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionKey {
    pub identity: String,
    pub environment: Environment,
}

impl SessionKey {
    pub fn new(credential: &Credential, environment: Environment) -> Self {
        Self {
            identity: credential.identity_key(),
            environment,
        }
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let email = self.identity.split('#').next().unwrap_or_default();
        write!(f, "{}@{}", email, self.environment)
    }
}

/// How long cached sessions live
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionScope {
    /// Dropped at the end of each suite file
    #[default]
    Suite,
    /// Kept for the whole run
    Run,
}

/// Creates and validates one kind of session
#[async_trait]
pub trait SessionProcedure: Send + Sync {
    /// Establish the session from scratch
    async fn create(&self, page: &PageContext) -> E2eResult<()>;

    /// Check that the browser currently holds a usable session
    async fn validate(&self, page: &PageContext) -> E2eResult<bool>;

    fn describe(&self) -> String;
}

/// What `with_session` had to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionOutcome {
    /// No entry existed; `create` ran
    Created,
    /// The cached entry was replayed and validated
    Restored,
    /// The cached entry failed validation; `create` ran again
    Recreated,
}

#[derive(Debug, Clone)]
struct SessionEntry {
    cookies: Vec<Cookie>,
}

/// Run-wide cache of established sessions
#[derive(Debug, Default)]
pub struct SessionCache {
    entries: Mutex<HashMap<SessionKey, SessionEntry>>,
    scope: SessionScope,
}

impl SessionCache {
    pub fn new(scope: SessionScope) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            scope,
        }
    }

    pub fn scope(&self) -> SessionScope {
        self.scope
    }

    pub fn contains(&self, key: &SessionKey) -> bool {
        self.entries.lock().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn invalidate(&self, key: &SessionKey) -> bool {
        self.entries.lock().remove(key).is_some()
    }

    /// Called between suite files
    pub fn end_suite(&self) {
        if self.scope == SessionScope::Suite {
            let mut entries = self.entries.lock();
            if !entries.is_empty() {
                debug!("Dropping {} suite-scoped session(s)", entries.len());
                entries.clear();
            }
        }
    }

    /// Make sure the browser holds the session for `key`.
    ///
    /// `create` runs on a miss, or when a cached entry fails `validate`.
    /// A failed `create` leaves nothing cached.
    pub async fn with_session(
        &self,
        key: &SessionKey,
        procedure: &dyn SessionProcedure,
        page: &PageContext,
    ) -> E2eResult<SessionOutcome> {
        let cached = self.entries.lock().get(key).cloned();

        let outcome = match cached {
            Some(entry) => {
                debug!("Restoring session {} ({} cookies)", key, entry.cookies.len());
                let browser = page.browser();
                browser.clear_cookies().await?;
                browser.set_cookies(&entry.cookies).await?;

                if procedure.validate(page).await? {
                    info!("Session restored: {}", key);
                    return Ok(SessionOutcome::Restored);
                }

                warn!("Cached session {} failed validation, logging in again", key);
                self.invalidate(key);
                browser.clear_cookies().await?;
                SessionOutcome::Recreated
            }
            None => SessionOutcome::Created,
        };

        info!("Creating session {} via {}", key, procedure.describe());
        procedure.create(page).await?;

        let cookies = page.browser().cookies().await?;
        if !procedure.validate(page).await? {
            return Err(E2eError::assertion(
                format!("valid session after {}", procedure.describe()),
                "session check failed right after creation",
            ));
        }

        self.entries
            .lock()
            .insert(key.clone(), SessionEntry { cookies });
        Ok(outcome)
    }
}

/// Logs in through the UI and recognises the session by its cookie
pub struct LoginProcedure {
    credential: Credential,
    cookie_name: String,
}

impl LoginProcedure {
    pub fn new(credential: Credential) -> Self {
        Self {
            credential,
            cookie_name: SESSION_COOKIE.to_string(),
        }
    }

    pub fn with_cookie_name(mut self, name: impl Into<String>) -> Self {
        self.cookie_name = name.into();
        self
    }
}

#[async_trait]
impl SessionProcedure for LoginProcedure {
    async fn create(&self, page: &PageContext) -> E2eResult<()> {
        let login = LoginPage::new(page);
        login.visit().await?;
        login.login_as(&self.credential).await?;
        login.verify_dashboard().await
    }

    async fn validate(&self, page: &PageContext) -> E2eResult<bool> {
        let cookies = page.browser().cookies().await?;
        Ok(cookies
            .iter()
            .any(|c| c.name == self.cookie_name && !c.value.is_empty()))
    }

    fn describe(&self) -> String {
        format!("login as {}", self.credential.masked_email())
    }
}

/// Establish (or restore) the session and open the inbox
pub async fn login_with_session(
    cache: &SessionCache,
    credential: &Credential,
    environment: Environment,
    page: &PageContext,
) -> E2eResult<SessionOutcome> {
    let key = SessionKey::new(credential, environment);
    let procedure = LoginProcedure::new(credential.clone());
    let outcome = cache.with_session(&key, &procedure, page).await?;
    page.visit(&format!("/{}", INBOX_FRAGMENT)).await?;
    page.expect_within(
        Condition::url_contains(INBOX_FRAGMENT),
        page.timeouts().login_landing,
    )
    .await?;
    Ok(outcome)
}
