//! Cleanup endpoint calls against a mock backend

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use venmail_e2e::cleanup::{CleanupClient, CleanupOutcome, CleanupRequest, CLEANUP_PATH};
use venmail_e2e::TestData;

fn client(server: &MockServer) -> CleanupClient {
    CleanupClient::new(&server.uri(), Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn success_reports_deleted_records() {
    let server = MockServer::start().await;
    let request = CleanupRequest {
        email: "bizuser-1-abc@yopmail.com".into(),
        domain: Some("bluemoonfox.com".into()),
        company_name: Some("Test Company 1".into()),
    };

    Mock::given(method("POST"))
        .and(path(CLEANUP_PATH))
        .and(body_json(json!({
            "email": "bizuser-1-abc@yopmail.com",
            "domain": "bluemoonfox.com",
            "companyName": "Test Company 1"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": "Test data cleaned up",
            "deletedRecords": { "users": 1, "domains": 1, "companies": 1 }
        })))
        .expect(1)
        .mount(&server)
        .await;

    match client(&server).cleanup(&request).await {
        CleanupOutcome::Cleaned(summary) => {
            assert_eq!(summary.message.as_deref(), Some("Test data cleaned up"));
            assert_eq!(summary.deleted_records["users"], 1);
        }
        other => panic!("expected cleaned, got {:?}", other),
    }
}

#[tokio::test]
async fn non_json_success_keeps_body_as_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(CLEANUP_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&server)
        .await;

    let outcome = client(&server)
        .cleanup(&CleanupRequest::for_email("jane@venmail.test"))
        .await;
    assert!(outcome.is_cleaned());
    if let CleanupOutcome::Cleaned(summary) = outcome {
        assert_eq!(summary.message.as_deref(), Some("ok"));
    }
}

#[tokio::test]
async fn server_error_is_reported_not_raised() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(CLEANUP_PATH))
        .respond_with(ResponseTemplate::new(500).set_body_string("cleanup disabled"))
        .mount(&server)
        .await;

    let outcome = client(&server)
        .cleanup(&CleanupRequest::for_email("jane@venmail.test"))
        .await;
    assert_eq!(
        outcome,
        CleanupOutcome::Rejected {
            status: 500,
            body: "cleanup disabled".into()
        }
    );
}

#[tokio::test]
async fn unreachable_backend_is_a_failed_outcome() {
    let client = CleanupClient::new("http://127.0.0.1:9", Duration::from_secs(2)).unwrap();
    let outcome = client
        .cleanup(&CleanupRequest::for_email("jane@venmail.test"))
        .await;
    assert!(matches!(outcome, CleanupOutcome::Failed { .. }));
}

#[test]
fn request_from_generated_data() {
    let mut data = TestData::generate(1);
    let body = serde_json::to_value(CleanupRequest::from(&data)).unwrap();
    assert_eq!(body["email"], data.email.as_str());
    assert_eq!(body["companyName"], data.company_name.as_str());
    assert_eq!(body["domain"], data.domain.as_str());

    data.domain.clear();
    let body = serde_json::to_value(CleanupRequest::from(&data)).unwrap();
    assert!(body.get("domain").is_none());
}
