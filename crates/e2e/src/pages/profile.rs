//! Profile settings: password change

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::browser::Locator;
use crate::error::{E2eError, E2eResult};
use crate::page::{Condition, PageContext};

const AVATAR_BUTTON: &str = "button[aria-label=\"Select account\"]";
const CURRENT_PASSWORD: &str = "#current_password";
const NEW_PASSWORD: &str = "#password";
const CONFIRM_PASSWORD: &str = "#password_confirmation";
const SUBMIT_BUTTON: &str = "button[type=\"submit\"]";
const PASSWORD_ENDPOINT: &str = "**/password**";

pub const PASSWORD_UPDATED: &str = "Password updated successfully";
pub const ERROR_CURRENT_MISMATCH: &str =
    "The provided password does not match your current password.";
pub const ERROR_TOO_SHORT: &str = "The password field must be at least 8 characters.";
pub const ERROR_CONFIRMATION_MISMATCH: &str = "The password field confirmation does not match.";
pub const ERROR_CURRENT_REQUIRED: &str = "The current password field is required.";
pub const ERROR_NEW_REQUIRED: &str = "The password field is required.";
pub const ERROR_CONFIRM_REQUIRED: &str = "The password confirmation field is required.";

/// Values typed into the password form; empty fields are left blank
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordChange {
    #[serde(default)]
    pub current: String,
    #[serde(default)]
    pub new: String,
    #[serde(default)]
    pub confirm: String,
}

impl PasswordChange {
    pub fn new(current: impl Into<String>, new: impl Into<String>) -> Self {
        let new = new.into();
        Self {
            current: current.into(),
            confirm: new.clone(),
            new,
        }
    }
}

pub struct ProfilePage<'a> {
    page: &'a PageContext,
}

impl<'a> ProfilePage<'a> {
    pub fn new(page: &'a PageContext) -> Self {
        Self { page }
    }

    pub async fn open_profile_from_avatar(&self) -> E2eResult<()> {
        self.page.force_click(&Locator::css(AVATAR_BUTTON)).await?;
        self.page.click(&Locator::text("Profile")).await?;
        self.page.expect(Condition::url_contains("/profile")).await
    }

    pub async fn go_to_password_tab(&self) -> E2eResult<()> {
        let tab = Locator::CssWithText {
            css: "button[role=\"tab\"]".to_string(),
            text: "Password".to_string(),
        };
        self.page.click(&tab).await?;
        self.page.expect(Condition::visible(CURRENT_PASSWORD)).await
    }

    async fn type_if_set(&self, selector: &str, value: &str) -> E2eResult<()> {
        let locator = Locator::css(selector);
        if value.is_empty() {
            self.page.expect(Condition::Visible(locator.clone())).await?;
            self.page.browser().clear(&locator).await
        } else {
            self.page.type_into(&locator, value).await
        }
    }

    pub async fn fill_form(&self, change: &PasswordChange) -> E2eResult<()> {
        self.type_if_set(CURRENT_PASSWORD, &change.current).await?;
        self.type_if_set(NEW_PASSWORD, &change.new).await?;
        self.type_if_set(CONFIRM_PASSWORD, &change.confirm).await
    }

    /// Submit without waiting, so inline validation can be asserted
    pub async fn click_update_password(&self) -> E2eResult<()> {
        self.page.click(&Locator::css(SUBMIT_BUTTON)).await
    }

    /// Submit and require the password endpoint to answer 200 or 204
    pub async fn submit_and_wait_for_success(&self) -> E2eResult<()> {
        let browser = self.page.browser();
        let intercept = browser
            .intercept("POST", PASSWORD_ENDPOINT, self.page.timeouts().response)
            .await?;
        self.click_update_password().await?;
        let response = browser.wait_for_intercept(intercept).await?;
        info!("Password endpoint answered {}", response.status);
        if matches!(response.status, 200 | 204) {
            Ok(())
        } else {
            Err(E2eError::assertion(
                "password update answered 200 or 204",
                format!("{} from {}", response.status, response.url),
            ))
        }
    }

    pub async fn verify_success(&self) -> E2eResult<()> {
        self.page.expect(Condition::text(PASSWORD_UPDATED)).await
    }

    pub async fn verify_error(&self, message: &str) -> E2eResult<()> {
        self.page.expect(Condition::text(message)).await
    }

    pub async fn change_password_from_inbox(&self, current: &str, new: &str) -> E2eResult<()> {
        self.open_profile_from_avatar().await?;
        self.go_to_password_tab().await?;
        self.fill_form(&PasswordChange::new(current, new)).await?;
        self.submit_and_wait_for_success().await?;
        self.verify_success().await
    }
}
