//! Admin dashboard: user management

use serde::{Deserialize, Serialize};

use crate::browser::Locator;
use crate::error::E2eResult;
use crate::page::{Condition, PageContext};

const BASIC_INFO_INPUTS: &str = ".peer";
const FORCE_CHANGE_CHECKBOX: &str = "[role=\"checkbox\"]";
const PASSWORD_MODE_RADIO: &str = "[role=\"radio\"]";
const PASSWORD_INPUT: &str = "input[type=\"password\"]";

/// A user created through the Add User modal
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub primary_email: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub recovery_email: Option<String>,
    /// Manual password; an auto-generated one is used when absent
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub force_password_change: bool,
}

impl NewUser {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn email(&self) -> String {
        self.primary_email.clone().unwrap_or_else(|| {
            format!("{}.{}@test.com", self.first_name, self.last_name).to_lowercase()
        })
    }

    /// Values for the five basic-info inputs, in page order
    pub fn basic_info(&self) -> [String; 5] {
        [
            self.first_name.clone(),
            self.last_name.clone(),
            self.email(),
            self.department.clone().unwrap_or_else(|| "QA".to_string()),
            self.recovery_email
                .clone()
                .unwrap_or_else(|| "recovery@test.com".to_string()),
        ]
    }
}

pub struct AdminUsersPage<'a> {
    page: &'a PageContext,
}

impl<'a> AdminUsersPage<'a> {
    pub fn new(page: &'a PageContext) -> Self {
        Self { page }
    }

    pub async fn go_to_users_tab(&self) -> E2eResult<()> {
        let tab = Locator::CssWithText {
            css: "a, button, [role=\"tab\"]".to_string(),
            text: "Users".to_string(),
        };
        self.page.force_click(&tab).await?;
        self.page.expect(Condition::Visible(Locator::button("Add User"))).await
    }

    pub async fn open_add_user_modal(&self) -> E2eResult<()> {
        self.page.force_click(&Locator::button("Add User")).await?;
        self.page
            .expect(Condition::Visible(Locator::nth(BASIC_INFO_INPUTS, 0)))
            .await
    }

    pub async fn fill_basic_info(&self, user: &NewUser) -> E2eResult<()> {
        for (index, value) in user.basic_info().iter().enumerate() {
            self.page
                .type_into(&Locator::nth(BASIC_INFO_INPUTS, index), value)
                .await?;
        }
        Ok(())
    }

    pub async fn toggle_force_password_change(&self) -> E2eResult<()> {
        self.page.force_click(&Locator::css(FORCE_CHANGE_CHECKBOX)).await
    }

    pub async fn select_password_generation(&self, auto: bool) -> E2eResult<()> {
        let index = if auto { 0 } else { 1 };
        self.page
            .force_click(&Locator::nth(PASSWORD_MODE_RADIO, index))
            .await
    }

    pub async fn set_manual_password(&self, password: &str) -> E2eResult<()> {
        self.page
            .type_into(&Locator::last(PASSWORD_INPUT), password)
            .await
    }

    pub async fn click_continue(&self) -> E2eResult<()> {
        self.page.force_click(&Locator::button("Continue")).await
    }

    pub async fn confirm_user_name(&self, full_name: &str) -> E2eResult<()> {
        self.page.expect(Condition::text(full_name)).await
    }

    pub async fn click_copy_invite(&self) -> E2eResult<()> {
        self.page.force_click(&Locator::button("Copy Invite")).await?;
        self.page.expect(Condition::text("Copied")).await
    }

    pub async fn click_done(&self) -> E2eResult<()> {
        self.page.force_click(&Locator::button("Done")).await
    }

    /// Run the whole Add User flow and confirm the user is listed
    pub async fn add_user(&self, user: &NewUser) -> E2eResult<()> {
        self.open_add_user_modal().await?;
        self.fill_basic_info(user).await?;
        if user.force_password_change {
            self.toggle_force_password_change().await?;
        }
        match &user.password {
            Some(password) => {
                self.select_password_generation(false).await?;
                self.set_manual_password(password).await?;
            }
            None => self.select_password_generation(true).await?,
        }
        self.click_continue().await?;
        self.confirm_user_name(&user.full_name()).await?;
        self.click_copy_invite().await?;
        self.click_done().await?;
        self.verify_user_in_table(&user.full_name(), &user.email()).await
    }

    pub async fn verify_user_in_table(&self, full_name: &str, email: &str) -> E2eResult<()> {
        self.page.expect(Condition::text(full_name)).await?;
        self.page.expect(Condition::text(email)).await
    }

    pub async fn delete_user(&self, full_name: &str) -> E2eResult<()> {
        let delete = Locator::CssWithText {
            css: format!("tr:has-text(\"{}\") button", full_name.replace('"', "\\\"")),
            text: "Delete".to_string(),
        };
        self.page.force_click(&delete).await?;
        self.page.force_click(&Locator::button("Confirm")).await?;
        self.page
            .expect(Condition::Absent(Locator::text(full_name)))
            .await
    }
}
