//! Business sign-up wizard
//!
//! Extends the personal wizard (by composition) with domain choice,
//! domain availability check, company information, email hosting and plan
//! selection.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::browser::Locator;
use crate::error::E2eResult;
use crate::page::{Condition, PageContext};
use crate::pages::registration::RegistrationPage;
use crate::retry::{
    CandidateProbe, MarkerClassifier, MarkerSet, ProbeObservation, RetryOutcome, RetryReport,
    RetryableCheck, DOMAIN_FOUND_MARKER,
};

const DOMAIN_FIELD: &str = "#domain";
const ORGANIZATION_FIELD: &str = "#organization";
const TERMS_CHECKBOX: &str = "#default-checkbox";

pub const CHECK_AVAILABILITY: &str = "Check Availability";
pub const CONTINUE: &str = "Continue";
pub const HOSTING_PROMPT: &str = "Choose how you want to host email data";
pub const WELCOME_TITLE: &str = "Welcome to Venmail";
pub const WELCOME_SUBTITLE: &str = "Let's help you setup your account";
pub const PLAN_BENEFITS_LINK: &str = "See our detailed pricing and benefits";

/// Labels and descriptions on the domain choice step
pub const DOMAIN_OPTION_TEXTS: &[&str] = &[
    "Use my existing domain",
    "Connect a domain you already own",
    "Buy a new domain",
    "Free domain for business plans or higher",
];

/// Any of these on the password step means the requirements were shown
pub const PASSWORD_HINTS: &[&str] = &["password", "Password"];

/// Texts that must be on the plan selection step
pub const PLAN_PAGE_TEXTS: &[&str] = &[
    "Monthly",
    "Solo Founder",
    "Perfect for solo founders",
    "Up to 10 users included",
    "$0",
    "Startup",
    "Premium email suite for SMEs",
    "Unlimited users included",
    "$7",
    "Business",
    "Essential tools for small teams",
    "$23.5",
    "Enterprise",
    "Tailored plans for larger companies",
];

static PAYMENT_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new("payment|checkout|stripe").expect("Failed to compile payment URL regex"));

/// Default settle delay between clicking "Check Availability" and reading the page
pub const DOMAIN_CHECK_SETTLE: Duration = Duration::from_millis(3_000);

/// Where the business domain comes from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DomainOption {
    #[default]
    Existing,
    New,
}

impl DomainOption {
    pub const ALL: [DomainOption; 2] = [DomainOption::Existing, DomainOption::New];

    pub fn button_text(&self) -> &'static str {
        match self {
            DomainOption::Existing => "Use my existing domain",
            DomainOption::New => "Buy a new domain",
        }
    }
}

/// Email hosting choice
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HostingOption {
    /// Mail data hosted by Venmail
    #[default]
    #[serde(alias = "self")]
    Venmail,
    /// Customer-provided storage
    #[serde(alias = "cloud")]
    OwnStorage,
}

impl HostingOption {
    pub const ALL: [HostingOption; 2] = [HostingOption::Venmail, HostingOption::OwnStorage];

    pub fn button_text(&self) -> &'static str {
        match self {
            HostingOption::Venmail => "Cloud Hosting (Venmail",
            HostingOption::OwnStorage => "Bring your own storage",
        }
    }
}

/// Pricing plans, numbered as on the page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Plan {
    SoloFounder,
    Startup,
    Business,
    Enterprise,
}

impl Plan {
    pub fn number(&self) -> u8 {
        match self {
            Plan::SoloFounder => 1,
            Plan::Startup => 2,
            Plan::Business => 3,
            Plan::Enterprise => 4,
        }
    }

    /// Free plans land on the welcome screen, paid ones on payment
    pub fn is_free(&self) -> bool {
        matches!(self, Plan::SoloFounder)
    }
}

impl TryFrom<u8> for Plan {
    type Error = String;

    fn try_from(n: u8) -> Result<Self, Self::Error> {
        match n {
            1 => Ok(Plan::SoloFounder),
            2 => Ok(Plan::Startup),
            3 => Ok(Plan::Business),
            4 => Ok(Plan::Enterprise),
            other => Err(format!("plan must be 1-4, got {}", other)),
        }
    }
}

impl From<Plan> for u8 {
    fn from(plan: Plan) -> u8 {
        plan.number()
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Plan::SoloFounder => "Solo Founder",
            Plan::Startup => "Startup",
            Plan::Business => "Business",
            Plan::Enterprise => "Enterprise",
        };
        f.write_str(name)
    }
}

/// Types a candidate into the domain field and reads the page after the
/// availability check settles
pub struct DomainCheckProbe<'a> {
    page: &'a PageContext,
    markers: MarkerSet,
    settle: Duration,
}

impl<'a> DomainCheckProbe<'a> {
    pub fn new(page: &'a PageContext, settle: Duration) -> Self {
        Self {
            page,
            markers: MarkerSet::domain_check(),
            settle,
        }
    }

    pub fn with_markers(mut self, markers: MarkerSet) -> Self {
        self.markers = markers;
        self
    }
}

#[async_trait]
impl CandidateProbe for DomainCheckProbe<'_> {
    async fn probe(&mut self, candidate: &str) -> E2eResult<ProbeObservation> {
        self.page
            .type_into(&Locator::css(DOMAIN_FIELD), candidate)
            .await?;
        self.page.click(&Locator::button(CHECK_AVAILABILITY)).await?;
        self.page.settle(self.settle).await;
        let text = self.page.body_text().await?;
        Ok(self.markers.observe(&text))
    }
}

pub struct BusinessRegistrationPage<'a> {
    registration: RegistrationPage<'a>,
}

impl<'a> BusinessRegistrationPage<'a> {
    pub fn new(page: &'a PageContext) -> Self {
        Self {
            registration: RegistrationPage::new(page),
        }
    }

    /// The personal wizard steps shared with business sign-up
    pub fn registration(&self) -> &RegistrationPage<'a> {
        &self.registration
    }

    fn page(&self) -> &'a PageContext {
        self.registration.page()
    }

    pub fn domain_field(&self) -> Locator {
        Locator::css(DOMAIN_FIELD)
    }

    pub fn continue_button(&self) -> Locator {
        Locator::button(CONTINUE)
    }

    pub fn domain_option_button(&self, option: DomainOption) -> Locator {
        Locator::button(option.button_text())
    }

    pub fn hosting_button(&self, option: HostingOption) -> Locator {
        Locator::button(option.button_text())
    }

    /// Visit, start sign-up and pick business, leaving personal details empty
    pub async fn open(&self) -> E2eResult<()> {
        self.registration.visit().await?;
        self.registration.start_sign_up().await?;
        self.registration.select_business_account().await
    }

    /// Visit, start sign-up, pick business and fill personal details
    pub async fn start(&self, first_name: &str, last_name: &str, email: &str) -> E2eResult<()> {
        self.open().await?;
        self.registration
            .enter_personal_details(first_name, last_name, email)
            .await
    }

    /// Continue on the personal details step is only usable once every field is filled
    pub async fn verify_details_continue(&self, enabled: bool) -> E2eResult<()> {
        let button = self.registration.details_continue_button();
        self.page().expect(enabled_condition(button, enabled)).await
    }

    pub async fn verify_continue(&self, enabled: bool) -> E2eResult<()> {
        self.page()
            .expect(enabled_condition(self.continue_button(), enabled))
            .await
    }

    /// Both domain choices and their descriptions are shown
    pub async fn verify_domain_options(&self) -> E2eResult<()> {
        for option in DomainOption::ALL {
            self.page()
                .expect(Condition::Visible(self.domain_option_button(option)))
                .await?;
        }
        for text in DOMAIN_OPTION_TEXTS {
            self.page().expect(Condition::text(*text)).await?;
        }
        Ok(())
    }

    pub async fn select_domain_option(&self, option: DomainOption) -> E2eResult<()> {
        info!("Selecting domain option {:?}", option);
        self.page()
            .click(&self.domain_option_button(option))
            .await?;
        self.page()
            .expect(Condition::Visible(self.domain_field()))
            .await
    }

    /// Single domain check, no retry
    pub async fn enter_and_check_domain(&self, domain: &str, settle: Duration) -> E2eResult<()> {
        self.page().type_into(&self.domain_field(), domain).await?;
        self.page()
            .click(&Locator::button(CHECK_AVAILABILITY))
            .await?;
        self.page().settle(settle).await;
        Ok(())
    }

    pub async fn verify_domain_found(&self, domain: &str) -> E2eResult<()> {
        self.page()
            .expect(Condition::text(format!("{} {}", DOMAIN_FOUND_MARKER, domain)))
            .await
    }

    /// Any of the domain failure texts is accepted
    pub async fn verify_domain_not_available(&self) -> E2eResult<()> {
        self.page()
            .expect(Condition::BodyContainsAny(MarkerSet::domain_check().failures))
            .await
    }

    /// Try candidates until one is found in the provider or attempts run out.
    ///
    /// On success the wizard is advanced past the domain step. Exhaustion
    /// is returned in the report and left for the caller to judge.
    pub async fn check_domain_with_retry(
        &self,
        candidates: &[String],
        max_attempts: u32,
        settle: Duration,
    ) -> E2eResult<RetryReport> {
        let check = RetryableCheck::new(candidates.iter().cloned(), max_attempts);
        let mut probe = DomainCheckProbe::new(self.page(), settle);
        let report = check.run(&mut probe, &MarkerClassifier).await?;

        match &report.outcome {
            RetryOutcome::Found { candidate, .. } => {
                self.verify_domain_found(candidate).await?;
                self.page().click(&self.continue_button()).await?;
                self.page()
                    .expect(Condition::Visible(self.registration.password_field()))
                    .await?;
            }
            RetryOutcome::Exhausted { attempts } => {
                warn!(
                    "No domain found after {} attempts; domain verification may be unavailable in this environment",
                    attempts
                );
            }
            RetryOutcome::Aborted { candidate, reason, .. } => {
                warn!("Domain check aborted at {}: {}", candidate, reason);
            }
        }

        Ok(report)
    }

    /// Type the business password without moving on
    pub async fn fill_business_password(&self, password: &str) -> E2eResult<()> {
        self.page()
            .type_into(&self.registration.password_field(), password)
            .await
    }

    pub async fn verify_password_requirements(&self) -> E2eResult<()> {
        let hints = PASSWORD_HINTS.iter().map(|h| h.to_string()).collect();
        self.page().expect(Condition::BodyContainsAny(hints)).await
    }

    pub async fn create_business_password(&self, password: &str) -> E2eResult<()> {
        self.fill_business_password(password).await?;
        self.page().click(&self.continue_button()).await?;
        self.page().expect(Condition::visible(ORGANIZATION_FIELD)).await
    }

    /// Fill the company step without submitting it
    pub async fn fill_company_info(&self, company_name: &str, agree_to_terms: bool) -> E2eResult<()> {
        self.page()
            .type_into(&Locator::css(ORGANIZATION_FIELD), company_name)
            .await?;
        if agree_to_terms {
            self.page().check(&Locator::css(TERMS_CHECKBOX)).await?;
        }
        Ok(())
    }

    pub async fn enter_company_info(&self, company_name: &str, agree_to_terms: bool) -> E2eResult<()> {
        self.fill_company_info(company_name, agree_to_terms).await?;
        self.page().click(&self.continue_button()).await?;
        self.page().expect(Condition::text(HOSTING_PROMPT)).await
    }

    /// The hosting prompt with both hosting choices
    pub async fn verify_hosting_options(&self) -> E2eResult<()> {
        self.page().expect(Condition::text(HOSTING_PROMPT)).await?;
        for option in HostingOption::ALL {
            self.page()
                .expect(Condition::Visible(self.hosting_button(option)))
                .await?;
        }
        Ok(())
    }

    pub async fn select_email_hosting(&self, option: HostingOption) -> E2eResult<()> {
        info!("Selecting hosting {:?}", option);
        self.page().expect(Condition::text(HOSTING_PROMPT)).await?;
        self.page()
            .click(&self.hosting_button(option))
            .await?;
        self.page().click(&self.continue_button()).await?;
        self.page().expect(Condition::text(PLAN_PAGE_TEXTS[0])).await
    }

    pub async fn verify_plan_selection_page(&self) -> E2eResult<()> {
        for text in PLAN_PAGE_TEXTS {
            self.page().expect(Condition::text(*text)).await?;
        }
        Ok(())
    }

    pub async fn select_plan(&self, plan: Plan) -> E2eResult<()> {
        info!("Selecting plan {} ({})", plan.number(), plan);
        self.page()
            .click(&Locator::css(format!("#plan-{}", plan.number())))
            .await?;
        self.page().click(&self.continue_button()).await
    }

    pub async fn view_plan_benefits(&self) -> E2eResult<()> {
        self.page().click(&Locator::text(PLAN_BENEFITS_LINK)).await
    }

    pub async fn verify_welcome_message(&self) -> E2eResult<()> {
        let landing = self.page().timeouts().login_landing;
        self.page()
            .expect_within(Condition::text(WELCOME_TITLE), landing)
            .await?;
        self.page().expect(Condition::text(WELCOME_SUBTITLE)).await
    }

    pub async fn verify_payment_page(&self) -> E2eResult<()> {
        self.page()
            .expect_within(
                Condition::UrlMatches(PAYMENT_URL.clone()),
                self.page().timeouts().login_landing,
            )
            .await
    }
}

fn enabled_condition(locator: Locator, enabled: bool) -> Condition {
    if enabled {
        Condition::Enabled(locator)
    } else {
        Condition::Disabled(locator)
    }
}
