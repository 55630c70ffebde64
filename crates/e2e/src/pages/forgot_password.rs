//! Forgot-password form

use crate::browser::Locator;
use crate::error::E2eResult;
use crate::page::{Condition, PageContext};
use crate::pages::login;

const FORGOT_PASSWORD_LINK: &str = "Forgotten your password?";
const BACK_LINK: &str = "Back";
const RESET_BUTTON: &str = ".bg-primary-600";

pub struct ForgotPasswordPage<'a> {
    page: &'a PageContext,
}

impl<'a> ForgotPasswordPage<'a> {
    pub fn new(page: &'a PageContext) -> Self {
        Self { page }
    }

    pub fn email_field(&self) -> Locator {
        Locator::css(login::EMAIL_FIELD)
    }

    pub fn error_message(&self) -> Locator {
        Locator::css(login::ERROR_MESSAGE)
    }

    /// The form is reached through the login page
    pub async fn visit_from_login(&self) -> E2eResult<()> {
        self.page.visit(login::LOGIN_PATH).await?;
        self.page
            .expect_within(
                Condition::Visible(self.email_field()),
                self.page.timeouts().page_load,
            )
            .await
    }

    pub async fn click_forgot_password(&self) -> E2eResult<()> {
        self.page.click(&Locator::text(FORGOT_PASSWORD_LINK)).await?;
        self.verify_forgot_password_page().await
    }

    pub async fn enter_email(&self, email: &str) -> E2eResult<()> {
        self.page.type_into(&self.email_field(), email).await
    }

    /// Submit; the outcome is asserted separately
    pub async fn click_reset_password(&self) -> E2eResult<()> {
        self.page.click(&Locator::css(RESET_BUTTON)).await
    }

    pub async fn request_password_reset(&self, email: &str) -> E2eResult<()> {
        self.enter_email(email).await?;
        self.click_reset_password().await
    }

    pub async fn verify_success_message(&self, expected: &str) -> E2eResult<()> {
        self.page.expect(Condition::text(expected)).await
    }

    pub async fn verify_error_message(&self, expected: &str) -> E2eResult<()> {
        self.page
            .expect(Condition::LocatorText {
                locator: self.error_message(),
                text: expected.to_string(),
            })
            .await
    }

    pub async fn verify_forgot_password_page(&self) -> E2eResult<()> {
        self.page
            .expect(Condition::url_contains("/forgot-password"))
            .await?;
        self.page
            .expect(Condition::Visible(self.email_field()))
            .await
    }

    pub async fn click_back_to_login(&self) -> E2eResult<()> {
        self.page.click(&Locator::text(BACK_LINK)).await?;
        self.page
            .expect(Condition::url_contains(login::LOGIN_PATH))
            .await
    }
}
