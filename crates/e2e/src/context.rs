//! Per-test context
//!
//! A fresh [`TestContext`] is built for every test attempt, so nothing a
//! test generates or stores leaks into the next one. The only shared state
//! is the session cache and the read-only environment and credentials.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use venmail_e2e_common::{Credential, DomainRetryConfig, Error as ConfigError, ResolvedEnvironment, Role};

use crate::cleanup::CleanupRequest;
use crate::data::TestData;
use crate::error::{E2eError, E2eResult};
use crate::page::PageContext;
use crate::retry::RetryReport;
use crate::session::SessionCache;

static TEMPLATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{\{\s*([a-z_]+)\.([A-Za-z0-9_]+)\s*\}\}").expect("Failed to compile template regex")
});

/// Roles referenced by `{{role.field}}` templates in the text
pub fn template_roles(text: &str) -> BTreeSet<Role> {
    TEMPLATE
        .captures_iter(text)
        .filter_map(|c| c[1].parse::<Role>().ok())
        .collect()
}

/// Shared, read-only run state handed to every test
#[derive(Clone)]
pub struct RunState {
    pub env: Arc<ResolvedEnvironment>,
    pub credentials: Arc<BTreeMap<Role, Credential>>,
    pub sessions: Arc<SessionCache>,
    pub domain_retry: DomainRetryConfig,
    /// Where `screenshot` steps and failure captures land
    pub screenshots_dir: PathBuf,
}

pub struct TestContext {
    pub page: PageContext,
    pub run: RunState,
    pub data: TestData,
    /// Values stored by earlier steps of the same test
    pub vars: BTreeMap<String, String>,
    /// Last domain check, kept for the report
    pub last_retry: Option<RetryReport>,
}

impl TestContext {
    pub fn new(page: PageContext, run: RunState) -> Self {
        let data = TestData::generate(run.domain_retry.candidate_count);
        Self::with_data(page, run, data)
    }

    pub fn with_data(page: PageContext, run: RunState, data: TestData) -> Self {
        Self {
            page,
            run,
            data,
            vars: BTreeMap::new(),
            last_retry: None,
        }
    }

    pub fn env(&self) -> &ResolvedEnvironment {
        &self.run.env
    }

    pub fn sessions(&self) -> &SessionCache {
        &self.run.sessions
    }

    pub fn credential(&self, role: Role) -> E2eResult<&Credential> {
        self.run.credentials.get(&role).ok_or_else(|| {
            let vars = role.variables();
            E2eError::Config(ConfigError::MissingCredentials {
                missing: vec![vars.email.to_string(), vars.password.to_string()],
            })
        })
    }

    /// Expand `{{namespace.field}}` templates
    pub fn render(&self, template: &str) -> E2eResult<String> {
        let mut failure = None;
        let rendered = TEMPLATE.replace_all(template, |caps: &Captures| {
            match self.lookup(&caps[1], &caps[2]) {
                Ok(value) => value,
                Err(e) => {
                    failure.get_or_insert(e);
                    String::new()
                }
            }
        });
        match failure {
            Some(e) => Err(e),
            None => Ok(rendered.into_owned()),
        }
    }

    fn lookup(&self, namespace: &str, field: &str) -> E2eResult<String> {
        let unknown = || E2eError::SpecParse(format!("Unknown template value {{{{{}.{}}}}}", namespace, field));

        match namespace {
            "data" => self.data.field(field).ok_or_else(unknown),
            "vars" => self.vars.get(field).cloned().ok_or_else(unknown),
            "env" => match field {
                "name" => Ok(self.env().environment.to_string()),
                "base_url" => Ok(self.env().base_url.clone()),
                "api_url" => Ok(self.env().api_url.clone()),
                _ => Err(unknown()),
            },
            role => {
                let role: Role = role.parse().map_err(|_| unknown())?;
                let credential = self.credential(role)?;
                match field {
                    "email" => Ok(credential.email.clone()),
                    "password" => Ok(credential.password.clone()),
                    "masked_email" => Ok(credential.masked_email()),
                    "first_name" => Ok(credential.first_name.clone().unwrap_or_else(|| self.data.first_name.clone())),
                    "last_name" => Ok(credential.last_name.clone().unwrap_or_else(|| self.data.last_name.clone())),
                    _ => Err(unknown()),
                }
            }
        }
    }

    /// Cleanup request for what this test registered
    pub fn cleanup_request(&self) -> CleanupRequest {
        let mut request = CleanupRequest::from(&self.data);
        if let Some(domain) = self.last_retry.as_ref().and_then(|r| r.found()) {
            request.domain = Some(domain.to_string());
        }
        request
    }
}
