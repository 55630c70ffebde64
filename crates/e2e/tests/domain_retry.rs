//! Retry-driven domain check: boundedness, wrap-around, short-circuit

mod common;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use test_case::test_case;

use venmail_e2e::browser::Locator;
use venmail_e2e::pages::business::DomainCheckProbe;
use venmail_e2e::pages::BusinessRegistrationPage;
use venmail_e2e::retry::{
    CandidateProbe, Classification, MarkerClassifier, MarkerSet, ProbeObservation, RetryOutcome,
    RetryableCheck,
};
use venmail_e2e::E2eResult;

use common::{page_for, FakeWebmail};

/// Reports "found" only for the listed candidates and records every probe
struct AvailableOnly {
    available: Vec<String>,
    probed: Vec<String>,
}

impl AvailableOnly {
    fn new(available: &[&str]) -> Self {
        Self {
            available: available.iter().map(|s| s.to_string()).collect(),
            probed: Vec::new(),
        }
    }
}

#[async_trait]
impl CandidateProbe for AvailableOnly {
    async fn probe(&mut self, candidate: &str) -> E2eResult<ProbeObservation> {
        self.probed.push(candidate.to_string());
        let text = if self.available.iter().any(|a| a == candidate) {
            format!("We found your domain {}", candidate)
        } else {
            "Domain not found".to_string()
        };
        Ok(MarkerSet::domain_check().observe(&text))
    }
}

fn candidates(n: usize) -> Vec<String> {
    (1..=n).map(|i| format!("d{}.com", i)).collect()
}

#[test_case(1, 1 ; "single candidate single attempt")]
#[test_case(1, 7 ; "single candidate many attempts")]
#[test_case(3, 2 ; "fewer attempts than candidates")]
#[test_case(4, 4 ; "equal")]
#[test_case(10, 25 ; "several wraps")]
#[tokio::test]
async fn never_exceeds_max_attempts(len: usize, max_attempts: u32) {
    let check = RetryableCheck::new(candidates(len), max_attempts);
    let mut probe = AvailableOnly::new(&[]);
    let report = check.run(&mut probe, &MarkerClassifier).await.unwrap();

    assert_eq!(report.outcome, RetryOutcome::Exhausted { attempts: max_attempts });
    assert_eq!(probe.probed.len(), max_attempts as usize);
    assert_eq!(report.attempts(), max_attempts);
    assert!(report.history.iter().all(|r| r.classification == Classification::SoftFail));
}

#[tokio::test]
async fn wraps_around_candidate_list() {
    let check = RetryableCheck::new(["d1.com", "d2.com"], 5);
    let mut probe = AvailableOnly::new(&[]);
    let report = check.run(&mut probe, &MarkerClassifier).await.unwrap();

    assert_eq!(probe.probed, ["d1.com", "d2.com", "d1.com", "d2.com", "d1.com"]);
    assert_eq!(report.probed(), ["d1.com", "d2.com", "d1.com", "d2.com", "d1.com"]);
    assert_eq!(report.outcome, RetryOutcome::Exhausted { attempts: 5 });
    assert!(report.found().is_none());
}

#[tokio::test]
async fn found_short_circuits() {
    let check = RetryableCheck::new(["d1.com", "d2.com", "d3.com"], 10);
    let mut probe = AvailableOnly::new(&["d2.com"]);
    let report = check.run(&mut probe, &MarkerClassifier).await.unwrap();

    assert_eq!(
        report.outcome,
        RetryOutcome::Found {
            candidate: "d2.com".into(),
            attempts: 2
        }
    );
    assert_eq!(probe.probed, ["d1.com", "d2.com"]);
}

#[tokio::test]
async fn seventh_of_ten_converges_after_seven_attempts() {
    let list = candidates(10);
    let check = RetryableCheck::new(list.clone(), 10);
    let mut probe = AvailableOnly::new(&[list[6].as_str()]);
    let report = check.run(&mut probe, &MarkerClassifier).await.unwrap();

    assert_eq!(report.found(), Some("d7.com"));
    assert_eq!(report.attempts(), 7);
    assert_eq!(probe.probed.len(), 7);
}

#[tokio::test(start_paused = true)]
async fn probe_drives_domain_field_through_the_page() {
    let list = candidates(10);
    let browser = Arc::new(FakeWebmail::with_available_domains([list[6].clone()]));
    let page = page_for(browser.clone());
    page.visit("/register/domain").await.unwrap();

    let mut probe = DomainCheckProbe::new(&page, Duration::from_millis(3_000));
    let check = RetryableCheck::new(list.clone(), 10);
    let report = check.run(&mut probe, &MarkerClassifier).await.unwrap();

    assert_eq!(report.found(), Some("d7.com"));
    assert_eq!(browser.checked_domains(), list[..7].to_vec());
}

#[tokio::test(start_paused = true)]
async fn business_page_advances_past_domain_step_when_found() {
    let list = candidates(3);
    let browser = Arc::new(FakeWebmail::with_available_domains(["d3.com"]));
    let page = page_for(browser.clone());
    page.visit("/register/domain").await.unwrap();

    let business = BusinessRegistrationPage::new(&page);
    let report = business
        .check_domain_with_retry(&list, 10, Duration::from_millis(3_000))
        .await
        .unwrap();

    assert_eq!(report.attempts(), 3);
    assert!(page.current_url().await.unwrap().ends_with("/register/password"));
    assert!(page
        .browser()
        .is_visible(&Locator::css("#password"))
        .await
        .unwrap());
}

#[tokio::test(start_paused = true)]
async fn business_page_returns_exhaustion_as_value() {
    let list = candidates(2);
    let browser = Arc::new(FakeWebmail::new());
    let page = page_for(browser.clone());
    page.visit("/register/domain").await.unwrap();

    let report = BusinessRegistrationPage::new(&page)
        .check_domain_with_retry(&list, 5, Duration::from_millis(3_000))
        .await
        .unwrap();

    assert_eq!(report.outcome, RetryOutcome::Exhausted { attempts: 5 });
    assert_eq!(browser.checked_domains(), ["d1.com", "d2.com", "d1.com", "d2.com", "d1.com"]);
    assert!(page.current_url().await.unwrap().ends_with("/register/domain"));
}
