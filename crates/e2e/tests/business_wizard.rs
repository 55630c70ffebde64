//! Business wizard verbs: option buttons, gated Continue buttons, hosting

mod common;

use std::sync::Arc;
use std::time::Duration;

use test_case::test_case;

use venmail_e2e::pages::{BusinessRegistrationPage, DomainOption, HostingOption};
use venmail_e2e::E2eError;

use common::{page_for, FakeWebmail};

const SETTLE: Duration = Duration::from_millis(3_000);
const BUSINESS_PASSWORD: &str = "SecurePass123!";

#[tokio::test(start_paused = true)]
async fn details_continue_waits_for_every_field() {
    let browser = Arc::new(FakeWebmail::new());
    let page = page_for(browser.clone());
    page.visit("/register/details").await.unwrap();
    let business = BusinessRegistrationPage::new(&page);
    let registration = business.registration();

    business.verify_details_continue(false).await.unwrap();
    page.type_into(&registration.first_name_field(), "Ada").await.unwrap();
    business.verify_details_continue(false).await.unwrap();
    page.type_into(&registration.last_name_field(), "Lovelace").await.unwrap();
    business.verify_details_continue(false).await.unwrap();
    page.type_into(&registration.email_field(), "ada@example.com").await.unwrap();
    business.verify_details_continue(true).await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn disabled_expectation_fails_once_enabled() {
    let browser = Arc::new(FakeWebmail::new());
    let page = page_for(browser.clone());
    page.visit("/register/details").await.unwrap();
    let business = BusinessRegistrationPage::new(&page);

    business
        .registration()
        .fill_personal_details("Ada", "Lovelace", "ada@example.com")
        .await
        .unwrap();

    let err = business.verify_details_continue(false).await.unwrap_err();
    match err {
        E2eError::UiAssertion { expected, .. } => assert!(expected.ends_with("disabled"), "{}", expected),
        other => panic!("unexpected error {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn domain_options_are_both_shown() {
    let browser = Arc::new(FakeWebmail::new());
    let page = page_for(browser.clone());
    page.visit("/register/choose-domain").await.unwrap();

    BusinessRegistrationPage::new(&page)
        .verify_domain_options()
        .await
        .unwrap();
}

#[test_case(DomainOption::Existing ; "existing domain")]
#[test_case(DomainOption::New ; "new domain")]
#[tokio::test(start_paused = true)]
async fn each_domain_option_reveals_the_domain_field(option: DomainOption) {
    let browser = Arc::new(FakeWebmail::new());
    let page = page_for(browser.clone());
    page.visit("/register/choose-domain").await.unwrap();

    BusinessRegistrationPage::new(&page)
        .select_domain_option(option)
        .await
        .unwrap();

    assert_eq!(browser.chosen_domain_option(), Some(option));
    assert!(page.current_url().await.unwrap().ends_with("/register/domain"));
}

#[tokio::test(start_paused = true)]
async fn malformed_domain_is_reported_unavailable() {
    let browser = Arc::new(FakeWebmail::with_available_domains(["venmail-e2e.com"]));
    let page = page_for(browser.clone());
    page.visit("/register/domain").await.unwrap();
    let business = BusinessRegistrationPage::new(&page);

    business
        .enter_and_check_domain("not-a-valid-domain", SETTLE)
        .await
        .unwrap();

    business.verify_domain_not_available().await.unwrap();
    assert_eq!(browser.checked_domains(), ["not-a-valid-domain"]);
}

#[tokio::test(start_paused = true)]
async fn weak_password_keeps_continue_disabled() {
    let browser = Arc::new(FakeWebmail::new());
    let page = page_for(browser.clone());
    page.visit("/register/password").await.unwrap();
    let business = BusinessRegistrationPage::new(&page);

    business.fill_business_password("weak").await.unwrap();
    business.verify_password_requirements().await.unwrap();
    business.verify_continue(false).await.unwrap();
    assert!(page
        .body_text()
        .await
        .unwrap()
        .contains(common::WEAK_PASSWORD));

    business.fill_business_password(BUSINESS_PASSWORD).await.unwrap();
    business.verify_continue(true).await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn company_step_needs_name_and_terms() {
    let browser = Arc::new(FakeWebmail::new());
    let page = page_for(browser.clone());
    page.visit("/register/password").await.unwrap();
    let business = BusinessRegistrationPage::new(&page);

    business.create_business_password(BUSINESS_PASSWORD).await.unwrap();
    business.verify_continue(false).await.unwrap();

    business.fill_company_info("Acme Ltd", false).await.unwrap();
    business.verify_continue(false).await.unwrap();

    business.fill_company_info("Acme Ltd", true).await.unwrap();
    business.verify_continue(true).await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn hosting_step_shows_both_options() {
    let browser = Arc::new(FakeWebmail::new());
    let page = page_for(browser.clone());
    page.visit("/register/company").await.unwrap();
    let business = BusinessRegistrationPage::new(&page);

    business.enter_company_info("Acme Ltd", true).await.unwrap();
    business.verify_hosting_options().await.unwrap();
    business.verify_continue(false).await.unwrap();
}

#[test_case(HostingOption::Venmail ; "venmail hosting")]
#[test_case(HostingOption::OwnStorage ; "own storage")]
#[tokio::test(start_paused = true)]
async fn each_hosting_option_reaches_plan_selection(option: HostingOption) {
    let browser = Arc::new(FakeWebmail::new());
    let page = page_for(browser.clone());
    page.visit("/register/hosting").await.unwrap();
    let business = BusinessRegistrationPage::new(&page);

    business.select_email_hosting(option).await.unwrap();
    business.verify_plan_selection_page().await.unwrap();
    assert_eq!(browser.chosen_hosting(), Some(option));
}

#[tokio::test(start_paused = true)]
async fn new_domain_purchase_runs_to_plan_selection() {
    let browser = Arc::new(FakeWebmail::with_available_domains(["d2.com"]));
    let page = page_for(browser.clone());
    page.visit("/register/choose-domain").await.unwrap();
    let business = BusinessRegistrationPage::new(&page);

    business.select_domain_option(DomainOption::New).await.unwrap();
    let candidates = vec!["d1.com".to_string(), "d2.com".to_string()];
    let report = business
        .check_domain_with_retry(&candidates, 5, SETTLE)
        .await
        .unwrap();
    assert_eq!(report.found(), Some("d2.com"));

    business.create_business_password(BUSINESS_PASSWORD).await.unwrap();
    business.enter_company_info("Acme Ltd", true).await.unwrap();
    business
        .select_email_hosting(HostingOption::OwnStorage)
        .await
        .unwrap();
    business.verify_plan_selection_page().await.unwrap();

    assert_eq!(browser.chosen_domain_option(), Some(DomainOption::New));
    assert!(page.current_url().await.unwrap().ends_with("/register/plans"));
}
