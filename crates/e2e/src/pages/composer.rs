//! Email composer

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::browser::Locator;
use crate::error::E2eResult;
use crate::page::{Condition, PageContext};

const COMPOSE_BUTTON: &str = ".mb-4 > .flex > .inline-flex";
const TO_FIELD: &str = "#composer-recipient-input";
const CC_FIELD: &str = "#composer-cc-input";
const BCC_FIELD: &str = "#composer-bcc-input";
const SUBJECT_FIELD: &str = "#subject";
const BODY_FIELD: &str = ".rsw-ce.w-full.relative.z-10";
const CONFIRMATION_MODAL: &str = "[data-cy=\"send-confirmation-modal\"]";

pub const COMPOSER_TITLE: &str = "NEW MESSAGE";
pub const SENT_MESSAGE: &str = "Email sent successfully";

/// How long the optional confirmation modal gets to show up after Send
const CONFIRMATION_GRACE: Duration = Duration::from_millis(2_000);

/// A message to compose
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutgoingEmail {
    pub to: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bcc: Option<String>,
    pub subject: String,
    pub body: String,
}

pub struct EmailComposerPage<'a> {
    page: &'a PageContext,
}

impl<'a> EmailComposerPage<'a> {
    pub fn new(page: &'a PageContext) -> Self {
        Self { page }
    }

    pub fn cc_field(&self) -> Locator {
        Locator::css(CC_FIELD)
    }

    pub fn bcc_field(&self) -> Locator {
        Locator::css(BCC_FIELD)
    }

    pub async fn click_compose(&self) -> E2eResult<()> {
        self.page.click(&Locator::css(COMPOSE_BUTTON)).await?;
        self.verify_composer_open().await
    }

    pub async fn click_cc_button(&self) -> E2eResult<()> {
        self.page.click(&Locator::ExactText("Cc".into())).await?;
        self.page.expect(Condition::Visible(self.cc_field())).await
    }

    pub async fn click_bcc_button(&self) -> E2eResult<()> {
        self.page.click(&Locator::ExactText("Bcc".into())).await?;
        self.page.expect(Condition::Visible(self.bcc_field())).await
    }

    pub async fn fill_to(&self, email: &str) -> E2eResult<()> {
        self.page.type_into(&Locator::css(TO_FIELD), email).await
    }

    pub async fn fill_cc(&self, email: &str) -> E2eResult<()> {
        self.page.type_into(&self.cc_field(), email).await
    }

    pub async fn fill_bcc(&self, email: &str) -> E2eResult<()> {
        self.page.type_into(&self.bcc_field(), email).await
    }

    pub async fn fill_subject(&self, subject: &str) -> E2eResult<()> {
        self.page.type_into(&Locator::css(SUBJECT_FIELD), subject).await
    }

    pub async fn fill_body(&self, body: &str) -> E2eResult<()> {
        self.page.type_into(&Locator::css(BODY_FIELD), body).await
    }

    pub async fn click_send(&self) -> E2eResult<()> {
        self.page.click(&Locator::button("Send")).await
    }

    /// Confirm the "send anyway" modal if the app raises one
    pub async fn handle_send_confirmation(&self) -> E2eResult<bool> {
        let modal = Locator::css(CONFIRMATION_MODAL);
        if !self
            .page
            .appears_within(Condition::Visible(modal), CONFIRMATION_GRACE)
            .await?
        {
            debug!("No send confirmation modal");
            return Ok(false);
        }
        let confirm = Locator::CssWithText {
            css: format!("{} button", CONFIRMATION_MODAL),
            text: "Send anyway".to_string(),
        };
        self.page.click(&confirm).await?;
        Ok(true)
    }

    pub async fn compose_and_send(&self, email: &OutgoingEmail) -> E2eResult<()> {
        self.click_compose().await?;
        self.fill_to(&email.to).await?;

        if let Some(cc) = email.cc.as_deref().filter(|s| !s.is_empty()) {
            self.click_cc_button().await?;
            self.fill_cc(cc).await?;
        }
        if let Some(bcc) = email.bcc.as_deref().filter(|s| !s.is_empty()) {
            self.click_bcc_button().await?;
            self.fill_bcc(bcc).await?;
        }

        self.fill_subject(&email.subject).await?;
        self.fill_body(&email.body).await?;
        self.click_send().await?;
        self.handle_send_confirmation().await?;
        Ok(())
    }

    pub async fn verify_email_sent(&self) -> E2eResult<()> {
        self.page.expect(Condition::text(SENT_MESSAGE)).await
    }

    pub async fn verify_composer_open(&self) -> E2eResult<()> {
        self.page.expect(Condition::text(COMPOSER_TITLE)).await
    }
}
