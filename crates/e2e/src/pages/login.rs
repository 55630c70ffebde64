//! Login form

use venmail_e2e_common::Credential;

use crate::browser::Locator;
use crate::error::E2eResult;
use crate::page::{Condition, PageContext};

pub const EMAIL_FIELD: &str = "#email";
pub const PASSWORD_FIELD: &str = "#password";
/// The same primary button advances the email step and submits the password
pub const PRIMARY_BUTTON: &str = ".bg-primary-600";
pub const ERROR_MESSAGE: &str = ".text-red-500 > p";

pub const LOGIN_PATH: &str = "/login";
pub const INBOX_FRAGMENT: &str = "m/all";

pub struct LoginPage<'a> {
    page: &'a PageContext,
}

impl<'a> LoginPage<'a> {
    pub fn new(page: &'a PageContext) -> Self {
        Self { page }
    }

    pub fn email_field(&self) -> Locator {
        Locator::css(EMAIL_FIELD)
    }

    pub fn password_field(&self) -> Locator {
        Locator::css(PASSWORD_FIELD)
    }

    pub fn continue_button(&self) -> Locator {
        Locator::css(PRIMARY_BUTTON)
    }

    pub fn error_message(&self) -> Locator {
        Locator::css(ERROR_MESSAGE)
    }

    pub async fn visit(&self) -> E2eResult<()> {
        self.page.visit(LOGIN_PATH).await?;
        self.page
            .expect_within(
                Condition::Visible(self.email_field()),
                self.page.timeouts().page_load,
            )
            .await
    }

    /// Submit the email step; returns once the password field or an error shows
    pub async fn enter_email(&self, email: &str) -> E2eResult<()> {
        self.page.type_into(&self.email_field(), email).await?;
        self.page.click(&self.continue_button()).await?;
        self.page
            .wait_for_any(
                &[
                    Condition::Visible(self.password_field()),
                    Condition::Visible(self.error_message()),
                ],
                self.page.timeouts().command,
            )
            .await?;
        Ok(())
    }

    pub async fn enter_password(&self, password: &str) -> E2eResult<()> {
        self.page.type_into(&self.password_field(), password).await
    }

    /// Submit the password; returns once the inbox loads or an error shows
    pub async fn click_login(&self) -> E2eResult<()> {
        self.page.click(&self.continue_button()).await?;
        self.page
            .wait_for_any(
                &[
                    Condition::url_contains(INBOX_FRAGMENT),
                    Condition::Visible(self.error_message()),
                ],
                self.page.timeouts().login_landing,
            )
            .await?;
        Ok(())
    }

    pub async fn login(&self, email: &str, password: &str) -> E2eResult<()> {
        self.enter_email(email).await?;
        self.enter_password(password).await?;
        self.click_login().await
    }

    pub async fn login_as(&self, credential: &Credential) -> E2eResult<()> {
        self.login(&credential.email, &credential.password).await
    }

    pub async fn verify_error_message(&self, expected: &str) -> E2eResult<()> {
        self.page
            .expect(Condition::LocatorText {
                locator: self.error_message(),
                text: expected.to_string(),
            })
            .await
    }

    pub async fn verify_dashboard(&self) -> E2eResult<()> {
        self.page
            .expect_within(
                Condition::url_contains(INBOX_FRAGMENT),
                self.page.timeouts().login_landing,
            )
            .await
    }

    pub async fn verify_login_page(&self) -> E2eResult<()> {
        self.page.expect(Condition::url_contains(LOGIN_PATH)).await?;
        self.page
            .expect(Condition::Visible(self.continue_button()))
            .await
    }

    pub async fn verify_password_step_not_shown(&self) -> E2eResult<()> {
        self.page
            .expect(Condition::Hidden(self.password_field()))
            .await
    }
}
