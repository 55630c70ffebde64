//! Declarative YAML scenario suites
//!
//! A suite file holds shared `before_each` steps and a list of tests. Steps
//! are either browser primitives or named flows backed by the page objects.
//! String values may contain `{{namespace.field}}` templates that are
//! expanded per test (see [`crate::context::TestContext::render`]).

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use venmail_e2e_common::{Environment, Role, SpecSelection};

use crate::context::template_roles;
use crate::error::{E2eError, E2eResult};
use crate::pages::{DomainOption, HostingOption, NewUser, Plan};

/// One suite file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteSpec {
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub tags: Vec<String>,

    /// Remove registered data after every test of this suite
    #[serde(default)]
    pub cleanup: bool,

    /// Steps run before every test
    #[serde(default)]
    pub before_each: Vec<Step>,

    pub tests: Vec<TestCase>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestCase {
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub skip: bool,

    /// Environments where this test is reported as skipped
    #[serde(default)]
    pub skip_in: Vec<Environment>,

    #[serde(default)]
    pub tags: Vec<String>,

    pub steps: Vec<Step>,
}

impl TestCase {
    pub fn skipped_in(&self, environment: Environment) -> bool {
        self.skip || self.skip_in.contains(&environment)
    }
}

/// Element state checked by `expect`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementState {
    #[default]
    Visible,
    Hidden,
    Present,
    Absent,
    Enabled,
    Disabled,
}

/// A single step
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    /// Visit a path relative to the base URL
    Navigate {
        url: String,
        #[serde(default)]
        wait_for: Option<String>,
    },

    /// Click by CSS selector, by visible text, or by both
    Click {
        #[serde(default)]
        selector: Option<String>,
        #[serde(default)]
        text: Option<String>,
        /// Skip the visibility and enabled checks
        #[serde(default)]
        force: bool,
    },

    Fill {
        selector: String,
        value: String,
    },

    Check {
        selector: String,
    },

    Expect {
        #[serde(default)]
        selector: Option<String>,
        #[serde(default)]
        text: Option<String>,
        #[serde(default)]
        state: ElementState,
        #[serde(default)]
        timeout_ms: Option<u64>,
    },

    ExpectText {
        text: String,
        #[serde(default)]
        timeout_ms: Option<u64>,
    },

    ExpectUrl {
        contains: String,
        #[serde(default)]
        timeout_ms: Option<u64>,
    },

    /// Native form validation message is non-empty
    ExpectValidationMessage {
        selector: String,
    },

    /// Fixed delay (use sparingly)
    Sleep {
        ms: u64,
    },

    Screenshot {
        name: String,
    },

    Log {
        message: String,
    },

    /// Establish or restore the role's session, then open the inbox
    LoginSession {
        role: Role,
    },

    /// Full login through the form, no caching
    Login {
        #[serde(default)]
        role: Option<Role>,
        #[serde(default)]
        email: Option<String>,
        #[serde(default)]
        password: Option<String>,
    },

    VisitLogin,

    EnterEmail {
        email: String,
    },

    EnterPassword {
        password: String,
    },

    SubmitLogin,

    ExpectLoginError {
        message: String,
    },

    ExpectDashboard,

    ExpectPasswordStepHidden,

    /// Personal sign-up with generated data
    RegisterPersonal,

    ExpectRegistrationSuccess,

    /// Business sign-up up to the domain step
    StartBusinessRegistration {
        #[serde(default)]
        domain_option: DomainOption,
    },

    /// Business sign-up up to the personal details step, or with
    /// `with_details` on to the domain choice
    OpenBusinessSignUp {
        #[serde(default)]
        with_details: bool,
    },

    /// Continue on the personal details step
    ExpectDetailsContinue {
        enabled: bool,
    },

    /// Both domain choices and their descriptions
    ExpectDomainOptions,

    SelectDomainOption {
        option: DomainOption,
    },

    /// Domain availability check with retry over generated candidates
    CheckDomains {
        #[serde(default)]
        count: Option<usize>,
        #[serde(default)]
        max_attempts: Option<u32>,
        /// Fail the test when no candidate is found
        #[serde(default)]
        require_found: bool,
    },

    /// Single domain check, no retry
    CheckDomain {
        domain: String,
    },

    ExpectDomainNotAvailable,

    /// Type the business password without submitting; defaults to the generated one
    FillBusinessPassword {
        #[serde(default)]
        password: Option<String>,
    },

    ExpectPasswordRequirements,

    /// Generated business password, then on to the company step
    CreateBusinessPassword,

    /// Company name and terms without submitting
    FillCompanyInfo {
        #[serde(default)]
        agree_to_terms: bool,
    },

    /// Company name and terms, then on to the hosting step
    EnterCompanyInfo {
        #[serde(default = "default_true")]
        agree_to_terms: bool,
    },

    /// Continue on the business wizard steps after the domain
    ExpectContinue {
        enabled: bool,
    },

    /// Hosting prompt with both hosting choices
    ExpectHostingOptions,

    SelectHosting {
        hosting: HostingOption,
    },

    /// Password, company info and hosting
    CompleteBusinessDetails {
        #[serde(default)]
        hosting: HostingOption,
        #[serde(default = "default_true")]
        agree_to_terms: bool,
    },

    VerifyPlanSelection,

    SelectPlan {
        plan: Plan,
    },

    ExpectWelcome,

    ExpectPaymentPage,

    OpenComposer,

    Compose {
        to: String,
        #[serde(default)]
        cc: Option<String>,
        #[serde(default)]
        bcc: Option<String>,
        subject: String,
        body: String,
    },

    ExpectEmailSent,

    /// Avatar menu, profile, password tab
    OpenPasswordSettings,

    ChangePassword {
        #[serde(default)]
        current: String,
        #[serde(default)]
        new: String,
        /// Defaults to `new`
        #[serde(default)]
        confirm: Option<String>,
        /// Require the endpoint to succeed and the success toast to show
        #[serde(default)]
        expect_success: bool,
    },

    OpenForgotPassword,

    RequestPasswordReset {
        email: String,
    },

    /// Success message, given literally or as the role's masked email
    ExpectResetMessage {
        #[serde(default)]
        message: Option<String>,
        #[serde(default)]
        masked_email_of: Option<Role>,
    },

    ExpectResetError {
        message: String,
    },

    AdminOpenUsers,

    AdminAddUser {
        user: NewUser,
    },

    AdminDeleteUser {
        name: String,
    },
}

fn default_true() -> bool {
    true
}

impl Step {
    /// Action name as written in YAML
    pub fn name(&self) -> String {
        serde_json::to_value(self)
            .ok()
            .and_then(|v| v.get("action").and_then(|a| a.as_str().map(String::from)))
            .unwrap_or_else(|| "unknown".to_string())
    }

    /// Roles this step needs credentials for
    pub fn roles(&self) -> BTreeSet<Role> {
        let mut roles = match self {
            Step::LoginSession { role } => BTreeSet::from([*role]),
            Step::Login { role: Some(role), .. } => BTreeSet::from([*role]),
            Step::ExpectResetMessage {
                masked_email_of: Some(role),
                ..
            } => BTreeSet::from([*role]),
            _ => BTreeSet::new(),
        };
        if let Ok(text) = serde_json::to_string(self) {
            roles.extend(template_roles(&text));
        }
        roles
    }

    /// Structural checks that serde cannot express
    pub fn validate(&self) -> Result<(), String> {
        match self {
            Step::Click {
                selector: None,
                text: None,
                ..
            } => Err("click needs a selector or a text".into()),
            Step::Expect {
                selector: None,
                text: None,
                ..
            } => Err("expect needs a selector or a text".into()),
            Step::Expect {
                selector: None,
                state,
                ..
            } if *state != ElementState::Visible => {
                Err("a text-only expect can only check visibility".into())
            }
            Step::Login {
                role: None,
                email,
                password,
            } if email.is_none() || password.is_none() => {
                Err("login needs a role or both email and password".into())
            }
            Step::ExpectResetMessage {
                message: None,
                masked_email_of: None,
            } => Err("expect_reset_message needs a message or masked_email_of".into()),
            Step::CheckDomains {
                max_attempts: Some(0),
                require_found: true,
                ..
            } => Err("check_domains cannot require a result with zero attempts".into()),
            _ => Ok(()),
        }
    }
}

impl SuiteSpec {
    pub fn from_yaml(yaml: &str) -> E2eResult<Self> {
        let suite: Self = serde_yaml::from_str(yaml)?;
        suite.validate()?;
        Ok(suite)
    }

    pub fn from_file(path: &Path) -> E2eResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
            .map_err(|e| E2eError::SpecParse(format!("{}: {}", path.display(), e)))
    }

    fn validate(&self) -> E2eResult<()> {
        let before = self.before_each.iter().map(|s| ("before_each", s));
        let tests = self
            .tests
            .iter()
            .flat_map(|t| t.steps.iter().map(move |s| (t.name.as_str(), s)));

        for (owner, step) in before.chain(tests) {
            step.validate()
                .map_err(|reason| E2eError::SpecParse(format!("{} / {}: {}", self.name, owner, reason)))?;
        }
        Ok(())
    }

    /// Every role referenced by any step of the suite
    pub fn required_roles(&self) -> BTreeSet<Role> {
        self.before_each
            .iter()
            .chain(self.tests.iter().flat_map(|t| t.steps.iter()))
            .flat_map(|s| s.roles())
            .collect()
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// A suite together with where it came from
#[derive(Debug, Clone)]
pub struct LoadedSuite {
    /// Path relative to the scenarios directory, with `/` separators
    pub relative_path: String,
    pub path: PathBuf,
    pub spec: SuiteSpec,
}

/// Load every suite under `dir`, sorted by relative path
pub fn load_all(dir: &Path) -> E2eResult<Vec<LoadedSuite>> {
    if !dir.is_dir() {
        return Err(E2eError::SpecParse(format!(
            "Scenarios directory not found: {}",
            dir.display()
        )));
    }

    let mut suites = Vec::new();
    for entry in walkdir::WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| {
            e.path()
                .extension()
                .map(|ext| ext == "yaml" || ext == "yml")
                .unwrap_or(false)
        })
    {
        let relative_path = entry
            .path()
            .strip_prefix(dir)
            .unwrap_or(entry.path())
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        suites.push(LoadedSuite {
            spec: SuiteSpec::from_file(entry.path())?,
            path: entry.path().to_path_buf(),
            relative_path,
        });
    }

    suites.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
    Ok(suites)
}

/// Keep only the suites the environment allows
pub fn select(suites: Vec<LoadedSuite>, selection: &SpecSelection) -> E2eResult<Vec<LoadedSuite>> {
    let mut allowed = Vec::with_capacity(suites.len());
    for suite in suites {
        if selection.allows(&suite.relative_path)? {
            allowed.push(suite);
        }
    }
    Ok(allowed)
}
