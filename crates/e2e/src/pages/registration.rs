//! Personal sign-up wizard
//!
//! Steps run strictly forward: account type, personal details, billing,
//! username, password, date of birth. Each step waits for the next step's
//! first field before returning.

use serde::{Deserialize, Serialize};

use crate::browser::Locator;
use crate::error::E2eResult;
use crate::page::{Condition, PageContext};

const SIGN_UP_BUTTON: &str = ".text-center > .w-full";
const PERSONAL_ACCOUNT: &str = "#personal";
const BUSINESS_ACCOUNT: &str = "#business";
const ACCOUNT_TYPE_CONTINUE: &str = ".space-y-6 > .bg-primary-600";
const FIRST_NAME_FIELD: &str = "#first_name";
const LAST_NAME_FIELD: &str = "#last_name";
const EMAIL_FIELD: &str = "#email";
const DETAILS_CONTINUE: &str = ".space-y-4 > .flex";
const FREE_BILLING: &str = "#free";
const BILLING_CONTINUE: &str = ".space-y-6 > .bg-primary-600";
const USERNAME_FIELD: &str = "#username";
const STEP_CONTINUE: &str = ".space-y-4 > .justify-center";
const PASSWORD_FIELD: &str = "#password";
const DATE_OF_BIRTH_FIELD: &str = "#date_of_birth";
const TERMS_CHECKBOX: &str = "#terms-checkbox";
const SUBMIT_BUTTON: &str = ".disabled\\:opacity-50";

/// Data entered by the personal wizard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonalDetails {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub username: String,
    pub password: String,
    pub date_of_birth: String,
}

pub struct RegistrationPage<'a> {
    page: &'a PageContext,
}

impl<'a> RegistrationPage<'a> {
    pub fn new(page: &'a PageContext) -> Self {
        Self { page }
    }

    pub fn page(&self) -> &'a PageContext {
        self.page
    }

    pub fn first_name_field(&self) -> Locator {
        Locator::css(FIRST_NAME_FIELD)
    }

    pub fn last_name_field(&self) -> Locator {
        Locator::css(LAST_NAME_FIELD)
    }

    pub fn email_field(&self) -> Locator {
        Locator::css(EMAIL_FIELD)
    }

    pub fn details_continue_button(&self) -> Locator {
        Locator::css(DETAILS_CONTINUE)
    }

    pub fn password_field(&self) -> Locator {
        Locator::css(PASSWORD_FIELD)
    }

    /// Sign-up starts from the login page
    pub async fn visit(&self) -> E2eResult<()> {
        self.page.visit("/login").await?;
        self.page
            .expect_within(
                Condition::visible(SIGN_UP_BUTTON),
                self.page.timeouts().page_load,
            )
            .await
    }

    pub async fn start_sign_up(&self) -> E2eResult<()> {
        self.page.click(&Locator::css(SIGN_UP_BUTTON)).await?;
        self.page.expect(Condition::visible(PERSONAL_ACCOUNT)).await
    }

    async fn select_account_type(&self, selector: &str) -> E2eResult<()> {
        self.page.click(&Locator::css(selector)).await?;
        self.page.click(&Locator::css(ACCOUNT_TYPE_CONTINUE)).await?;
        self.page.expect(Condition::visible(FIRST_NAME_FIELD)).await
    }

    pub async fn select_personal_account(&self) -> E2eResult<()> {
        self.select_account_type(PERSONAL_ACCOUNT).await
    }

    pub async fn select_business_account(&self) -> E2eResult<()> {
        self.select_account_type(BUSINESS_ACCOUNT).await
    }

    /// Fill name and email without submitting
    pub async fn fill_personal_details(&self, first_name: &str, last_name: &str, email: &str) -> E2eResult<()> {
        self.page.type_into(&self.first_name_field(), first_name).await?;
        self.page.type_into(&self.last_name_field(), last_name).await?;
        self.page.type_into(&self.email_field(), email).await
    }

    pub async fn enter_personal_details(&self, first_name: &str, last_name: &str, email: &str) -> E2eResult<()> {
        self.fill_personal_details(first_name, last_name, email).await?;
        self.page.click(&self.details_continue_button()).await?;
        self.page
            .expect(Condition::Hidden(self.first_name_field()))
            .await
    }

    pub async fn select_free_billing(&self) -> E2eResult<()> {
        self.page.click(&Locator::css(FREE_BILLING)).await?;
        self.page.click(&Locator::css(BILLING_CONTINUE)).await?;
        self.page.expect(Condition::visible(USERNAME_FIELD)).await
    }

    /// Usernames are validated server side before the password step shows
    pub async fn enter_username(&self, username: &str) -> E2eResult<()> {
        self.page.type_into(&Locator::css(USERNAME_FIELD), username).await?;
        self.page.click(&Locator::css(STEP_CONTINUE)).await?;
        self.page.expect(Condition::visible(PASSWORD_FIELD)).await
    }

    pub async fn enter_password(&self, password: &str) -> E2eResult<()> {
        self.page.type_into(&self.password_field(), password).await?;
        self.page.click(&Locator::css(STEP_CONTINUE)).await?;
        self.page.expect(Condition::visible(DATE_OF_BIRTH_FIELD)).await
    }

    pub async fn enter_date_of_birth(&self, date_of_birth: &str) -> E2eResult<()> {
        self.page
            .type_into(&Locator::css(DATE_OF_BIRTH_FIELD), date_of_birth)
            .await?;
        self.page.check(&Locator::css(TERMS_CHECKBOX)).await?;
        self.page.click(&Locator::css(SUBMIT_BUTTON)).await
    }

    pub async fn complete_registration(&self, details: &PersonalDetails) -> E2eResult<()> {
        self.start_sign_up().await?;
        self.select_personal_account().await?;
        self.enter_personal_details(&details.first_name, &details.last_name, &details.email)
            .await?;
        self.select_free_billing().await?;
        self.enter_username(&details.username).await?;
        self.enter_password(&details.password).await?;
        self.enter_date_of_birth(&details.date_of_birth).await
    }

    pub async fn verify_registration_success(&self) -> E2eResult<()> {
        self.page
            .expect_within(
                Condition::url_contains("/all"),
                self.page.timeouts().login_landing,
            )
            .await
    }

    pub async fn verify_error_message(&self, expected: &str) -> E2eResult<()> {
        self.page.expect(Condition::text(expected)).await
    }
}
