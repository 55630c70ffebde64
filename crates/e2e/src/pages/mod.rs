//! Page objects for the webmail UI
//!
//! Each page object borrows a [`PageContext`](crate::page::PageContext) and
//! exposes locators, atomic actions and composite flows. Every action that
//! changes the UI waits on the effect it expects.

pub mod admin_users;
pub mod business;
pub mod composer;
pub mod forgot_password;
pub mod login;
pub mod profile;
pub mod registration;

pub use admin_users::{AdminUsersPage, NewUser};
pub use business::{BusinessRegistrationPage, DomainOption, HostingOption, Plan};
pub use composer::{EmailComposerPage, OutgoingEmail};
pub use forgot_password::ForgotPasswordPage;
pub use login::LoginPage;
pub use profile::{PasswordChange, ProfilePage};
pub use registration::{PersonalDetails, RegistrationPage};
