//! Step execution
//!
//! Maps each declarative [`Step`] onto page-object calls. Template values
//! are expanded against the test's context just before the step runs.

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::browser::Locator;
use crate::context::TestContext;
use crate::data;
use crate::error::{E2eError, E2eResult};
use crate::page::Condition;
use crate::pages::{
    AdminUsersPage, BusinessRegistrationPage, EmailComposerPage, ForgotPasswordPage, LoginPage,
    OutgoingEmail, PasswordChange, PersonalDetails, ProfilePage, RegistrationPage,
};
use crate::retry::RetryOutcome;
use crate::scenario::{ElementState, Step};
use crate::session::login_with_session;

fn render_opt(ctx: &TestContext, value: &Option<String>) -> E2eResult<Option<String>> {
    value.as_deref().map(|v| ctx.render(v)).transpose()
}

fn timeout_or(ms: Option<u64>, default: Duration) -> Duration {
    ms.map(Duration::from_millis).unwrap_or(default)
}

/// Run one step, wrapping failures with the step name
pub async fn execute_step(ctx: &mut TestContext, step: &Step) -> E2eResult<()> {
    debug!("step: {}", step.name());
    run(ctx, step).await.map_err(|e| match e {
        E2eError::UiAssertion { .. } | E2eError::Timeout { .. } | E2eError::Playwright(_) => {
            E2eError::StepFailed {
                step: step.name(),
                reason: e.to_string(),
            }
        }
        other => other,
    })
}

async fn run(ctx: &mut TestContext, step: &Step) -> E2eResult<()> {
    let command = ctx.page.timeouts().command;

    match step {
        Step::Navigate { url, wait_for } => {
            ctx.page.visit(&ctx.render(url)?).await?;
            if let Some(css) = render_opt(ctx, wait_for)? {
                let page_load = ctx.page.timeouts().page_load;
                ctx.page
                    .expect_within(Condition::Visible(Locator::css(css)), page_load)
                    .await?;
            }
        }

        Step::Click {
            selector,
            text,
            force,
        } => {
            let locator = match (render_opt(ctx, selector)?, render_opt(ctx, text)?) {
                (Some(css), Some(text)) => Locator::CssWithText { css, text },
                (Some(css), None) => Locator::css(css),
                (None, Some(text)) => Locator::text(text),
                (None, None) => {
                    return Err(E2eError::SpecParse("click needs a selector or a text".into()))
                }
            };
            if *force {
                ctx.page.force_click(&locator).await?;
            } else {
                ctx.page.click(&locator).await?;
            }
        }

        Step::Fill { selector, value } => {
            let value = ctx.render(value)?;
            let locator = Locator::css(ctx.render(selector)?);
            if value.is_empty() {
                ctx.page.expect(Condition::Visible(locator.clone())).await?;
                ctx.page.browser().clear(&locator).await?;
            } else {
                ctx.page.type_into(&locator, &value).await?;
            }
        }

        Step::Check { selector } => {
            ctx.page.check(&Locator::css(ctx.render(selector)?)).await?;
        }

        Step::Expect {
            selector,
            text,
            state,
            timeout_ms,
        } => {
            let locator = match (render_opt(ctx, selector)?, render_opt(ctx, text)?) {
                (Some(css), Some(text)) => Locator::CssWithText { css, text },
                (Some(css), None) => Locator::css(css),
                (None, Some(text)) => Locator::text(text),
                (None, None) => {
                    return Err(E2eError::SpecParse("expect needs a selector or a text".into()))
                }
            };
            let condition = match state {
                ElementState::Visible => Condition::Visible(locator),
                ElementState::Hidden => Condition::Hidden(locator),
                ElementState::Present => Condition::Present(locator),
                ElementState::Absent => Condition::Absent(locator),
                ElementState::Enabled => Condition::Enabled(locator),
                ElementState::Disabled => Condition::Disabled(locator),
            };
            ctx.page
                .expect_within(condition, timeout_or(*timeout_ms, command))
                .await?;
        }

        Step::ExpectText { text, timeout_ms } => {
            ctx.page
                .expect_within(
                    Condition::text(ctx.render(text)?),
                    timeout_or(*timeout_ms, command),
                )
                .await?;
        }

        Step::ExpectUrl {
            contains,
            timeout_ms,
        } => {
            ctx.page
                .expect_within(
                    Condition::url_contains(ctx.render(contains)?),
                    timeout_or(*timeout_ms, command),
                )
                .await?;
        }

        Step::ExpectValidationMessage { selector } => {
            let locator = Locator::css(ctx.render(selector)?);
            let message = ctx.page.browser().validation_message(&locator).await?;
            match message.filter(|m| !m.is_empty()) {
                Some(m) => debug!("validation message: {}", m),
                None => {
                    return Err(E2eError::assertion(
                        format!("validation message on {}", locator.describe()),
                        "none",
                    ))
                }
            }
        }

        Step::Sleep { ms } => {
            ctx.page.settle(Duration::from_millis(*ms)).await;
        }

        Step::Screenshot { name } => {
            let name = ctx.render(name)?;
            let path = ctx.run.screenshots_dir.join(format!("{}.png", name));
            ctx.page.screenshot(&path).await?;
            info!("Screenshot saved: {}", path.display());
        }

        Step::Log { message } => {
            info!("{}", ctx.render(message)?);
        }

        Step::LoginSession { role } => {
            let credential = ctx.credential(*role)?.clone();
            let environment = ctx.env().environment;
            let outcome =
                login_with_session(ctx.sessions(), &credential, environment, &ctx.page).await?;
            debug!("{} session: {:?}", role, outcome);
        }

        Step::Login {
            role,
            email,
            password,
        } => {
            let (email, password) = match role {
                Some(role) => {
                    let credential = ctx.credential(*role)?;
                    (credential.email.clone(), credential.password.clone())
                }
                None => (
                    render_opt(ctx, email)?.unwrap_or_default(),
                    render_opt(ctx, password)?.unwrap_or_default(),
                ),
            };
            let login = LoginPage::new(&ctx.page);
            login.visit().await?;
            login.login(&email, &password).await?;
            login.verify_dashboard().await?;
        }

        Step::VisitLogin => LoginPage::new(&ctx.page).visit().await?,

        Step::EnterEmail { email } => {
            let email = ctx.render(email)?;
            LoginPage::new(&ctx.page).enter_email(&email).await?;
        }

        Step::EnterPassword { password } => {
            let password = ctx.render(password)?;
            LoginPage::new(&ctx.page).enter_password(&password).await?;
        }

        Step::SubmitLogin => LoginPage::new(&ctx.page).click_login().await?,

        Step::ExpectLoginError { message } => {
            let message = ctx.render(message)?;
            LoginPage::new(&ctx.page)
                .verify_error_message(&message)
                .await?;
        }

        Step::ExpectDashboard => LoginPage::new(&ctx.page).verify_dashboard().await?,

        Step::ExpectPasswordStepHidden => {
            LoginPage::new(&ctx.page)
                .verify_password_step_not_shown()
                .await?
        }

        Step::RegisterPersonal => {
            let details = PersonalDetails {
                first_name: ctx.data.first_name.clone(),
                last_name: ctx.data.last_name.clone(),
                email: ctx.data.email.clone(),
                username: ctx.data.username.clone(),
                password: ctx.data.password.clone(),
                date_of_birth: ctx.data.date_of_birth.clone(),
            };
            let registration = RegistrationPage::new(&ctx.page);
            registration.visit().await?;
            registration.complete_registration(&details).await?;
        }

        Step::ExpectRegistrationSuccess => {
            RegistrationPage::new(&ctx.page)
                .verify_registration_success()
                .await?
        }

        Step::StartBusinessRegistration { domain_option } => {
            let business = BusinessRegistrationPage::new(&ctx.page);
            business
                .start(&ctx.data.first_name, &ctx.data.last_name, &ctx.data.email)
                .await?;
            business.select_domain_option(*domain_option).await?;
        }

        Step::OpenBusinessSignUp { with_details } => {
            let business = BusinessRegistrationPage::new(&ctx.page);
            if *with_details {
                business
                    .start(&ctx.data.first_name, &ctx.data.last_name, &ctx.data.email)
                    .await?;
            } else {
                business.open().await?;
            }
        }

        Step::ExpectDetailsContinue { enabled } => {
            BusinessRegistrationPage::new(&ctx.page)
                .verify_details_continue(*enabled)
                .await?
        }

        Step::ExpectDomainOptions => {
            BusinessRegistrationPage::new(&ctx.page)
                .verify_domain_options()
                .await?
        }

        Step::SelectDomainOption { option } => {
            BusinessRegistrationPage::new(&ctx.page)
                .select_domain_option(*option)
                .await?
        }

        Step::CheckDomains {
            count,
            max_attempts,
            require_found,
        } => {
            if let Some(count) = count.filter(|c| *c != ctx.data.domains.len()) {
                ctx.data.domains = data::random_domain_list(&mut rand::thread_rng(), count);
            }
            let max_attempts = max_attempts.unwrap_or(ctx.run.domain_retry.max_attempts);
            let settle = Duration::from_millis(ctx.run.domain_retry.settle_ms);

            let report = BusinessRegistrationPage::new(&ctx.page)
                .check_domain_with_retry(&ctx.data.domains, max_attempts, settle)
                .await?;

            let outcome = report.outcome.clone();
            if let Some(domain) = report.found() {
                info!("Domain {} found after {} attempt(s)", domain, report.attempts());
                ctx.data.domain = domain.to_string();
            }
            ctx.last_retry = Some(report);

            if *require_found {
                match outcome {
                    RetryOutcome::Found { .. } => {}
                    RetryOutcome::Exhausted { attempts } => {
                        return Err(E2eError::assertion(
                            "a domain found in the provider",
                            format!("none of the candidates after {} attempts", attempts),
                        ))
                    }
                    RetryOutcome::Aborted {
                        candidate, reason, ..
                    } => {
                        return Err(E2eError::assertion(
                            "a domain found in the provider",
                            format!("aborted at {}: {}", candidate, reason),
                        ))
                    }
                }
            }
        }

        Step::CheckDomain { domain } => {
            let domain = ctx.render(domain)?;
            let settle = Duration::from_millis(ctx.run.domain_retry.settle_ms);
            BusinessRegistrationPage::new(&ctx.page)
                .enter_and_check_domain(&domain, settle)
                .await?;
        }

        Step::ExpectDomainNotAvailable => {
            BusinessRegistrationPage::new(&ctx.page)
                .verify_domain_not_available()
                .await?
        }

        Step::FillBusinessPassword { password } => {
            let password = match password {
                Some(p) => ctx.render(p)?,
                None => ctx.data.business_password.clone(),
            };
            BusinessRegistrationPage::new(&ctx.page)
                .fill_business_password(&password)
                .await?
        }

        Step::ExpectPasswordRequirements => {
            BusinessRegistrationPage::new(&ctx.page)
                .verify_password_requirements()
                .await?
        }

        Step::CreateBusinessPassword => {
            BusinessRegistrationPage::new(&ctx.page)
                .create_business_password(&ctx.data.business_password)
                .await?
        }

        Step::FillCompanyInfo { agree_to_terms } => {
            BusinessRegistrationPage::new(&ctx.page)
                .fill_company_info(&ctx.data.company_name, *agree_to_terms)
                .await?
        }

        Step::EnterCompanyInfo { agree_to_terms } => {
            BusinessRegistrationPage::new(&ctx.page)
                .enter_company_info(&ctx.data.company_name, *agree_to_terms)
                .await?
        }

        Step::ExpectContinue { enabled } => {
            BusinessRegistrationPage::new(&ctx.page)
                .verify_continue(*enabled)
                .await?
        }

        Step::ExpectHostingOptions => {
            BusinessRegistrationPage::new(&ctx.page)
                .verify_hosting_options()
                .await?
        }

        Step::SelectHosting { hosting } => {
            BusinessRegistrationPage::new(&ctx.page)
                .select_email_hosting(*hosting)
                .await?
        }

        Step::CompleteBusinessDetails {
            hosting,
            agree_to_terms,
        } => {
            let business = BusinessRegistrationPage::new(&ctx.page);
            business
                .create_business_password(&ctx.data.business_password)
                .await?;
            business
                .enter_company_info(&ctx.data.company_name, *agree_to_terms)
                .await?;
            business.select_email_hosting(*hosting).await?;
        }

        Step::VerifyPlanSelection => {
            BusinessRegistrationPage::new(&ctx.page)
                .verify_plan_selection_page()
                .await?
        }

        Step::SelectPlan { plan } => {
            BusinessRegistrationPage::new(&ctx.page)
                .select_plan(*plan)
                .await?
        }

        Step::ExpectWelcome => {
            BusinessRegistrationPage::new(&ctx.page)
                .verify_welcome_message()
                .await?
        }

        Step::ExpectPaymentPage => {
            BusinessRegistrationPage::new(&ctx.page)
                .verify_payment_page()
                .await?
        }

        Step::OpenComposer => {
            let composer = EmailComposerPage::new(&ctx.page);
            composer.click_compose().await?;
            composer.verify_composer_open().await?;
        }

        Step::Compose {
            to,
            cc,
            bcc,
            subject,
            body,
        } => {
            let email = OutgoingEmail {
                to: ctx.render(to)?,
                cc: render_opt(ctx, cc)?,
                bcc: render_opt(ctx, bcc)?,
                subject: ctx.render(subject)?,
                body: ctx.render(body)?,
            };
            EmailComposerPage::new(&ctx.page)
                .compose_and_send(&email)
                .await?;
        }

        Step::ExpectEmailSent => EmailComposerPage::new(&ctx.page).verify_email_sent().await?,

        Step::OpenPasswordSettings => {
            let profile = ProfilePage::new(&ctx.page);
            profile.open_profile_from_avatar().await?;
            profile.go_to_password_tab().await?;
        }

        Step::ChangePassword {
            current,
            new,
            confirm,
            expect_success,
        } => {
            let new = ctx.render(new)?;
            let change = PasswordChange {
                current: ctx.render(current)?,
                confirm: render_opt(ctx, confirm)?.unwrap_or_else(|| new.clone()),
                new,
            };
            let profile = ProfilePage::new(&ctx.page);
            profile.fill_form(&change).await?;
            if *expect_success {
                profile.submit_and_wait_for_success().await?;
                profile.verify_success().await?;
            } else {
                profile.click_update_password().await?;
            }
        }

        Step::OpenForgotPassword => {
            let forgot = ForgotPasswordPage::new(&ctx.page);
            forgot.visit_from_login().await?;
            forgot.click_forgot_password().await?;
        }

        Step::RequestPasswordReset { email } => {
            let email = ctx.render(email)?;
            ForgotPasswordPage::new(&ctx.page)
                .request_password_reset(&email)
                .await?;
        }

        Step::ExpectResetMessage {
            message,
            masked_email_of,
        } => {
            let forgot = ForgotPasswordPage::new(&ctx.page);
            if let Some(message) = render_opt(ctx, message)? {
                forgot.verify_success_message(&message).await?;
            }
            if let Some(role) = masked_email_of {
                let masked = ctx.credential(*role)?.masked_email();
                forgot.verify_success_message(&masked).await?;
            }
        }

        Step::ExpectResetError { message } => {
            let message = ctx.render(message)?;
            ForgotPasswordPage::new(&ctx.page)
                .verify_error_message(&message)
                .await?;
        }

        Step::AdminOpenUsers => AdminUsersPage::new(&ctx.page).go_to_users_tab().await?,

        Step::AdminAddUser { user } => {
            let mut user = user.clone();
            user.first_name = ctx.render(&user.first_name)?;
            user.last_name = ctx.render(&user.last_name)?;
            user.primary_email = render_opt(ctx, &user.primary_email)?;
            user.department = render_opt(ctx, &user.department)?;
            user.recovery_email = render_opt(ctx, &user.recovery_email)?;
            user.password = render_opt(ctx, &user.password)?;
            AdminUsersPage::new(&ctx.page).add_user(&user).await?;
            ctx.vars.insert("user_name".into(), user.full_name());
            ctx.vars.insert("user_email".into(), user.email());
        }

        Step::AdminDeleteUser { name } => {
            let name = ctx.render(name)?;
            if name.trim().is_empty() {
                warn!("admin_delete_user with an empty name, nothing to delete");
            } else {
                AdminUsersPage::new(&ctx.page).delete_user(&name).await?;
            }
        }
    }

    Ok(())
}
