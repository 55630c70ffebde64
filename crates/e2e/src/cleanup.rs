//! Best-effort removal of data created by registration tests
//!
//! The backend exposes a test-only endpoint that deletes an account, its
//! domain and its company. Cleanup never fails a test: every problem is
//! logged and reported as a value.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::data::TestData;
use crate::error::{E2eError, E2eResult};

pub const CLEANUP_PATH: &str = "/api/test/cleanup";

/// Body of the cleanup request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupRequest {
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
}

impl CleanupRequest {
    pub fn for_email(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            domain: None,
            company_name: None,
        }
    }
}

impl From<&TestData> for CleanupRequest {
    fn from(data: &TestData) -> Self {
        Self {
            email: data.email.clone(),
            domain: Some(data.domain.clone()).filter(|d| !d.is_empty()),
            company_name: Some(data.company_name.clone()),
        }
    }
}

/// What the endpoint reports having removed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupSummary {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub deleted_records: serde_json::Value,
}

/// Result of a cleanup call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CleanupOutcome {
    /// Nothing to clean
    Skipped,
    Cleaned(CleanupSummary),
    /// The endpoint answered with a non-success status
    Rejected { status: u16, body: String },
    /// The request could not be made
    Failed { reason: String },
}

impl CleanupOutcome {
    pub fn is_cleaned(&self) -> bool {
        matches!(self, CleanupOutcome::Cleaned(_))
    }
}

/// HTTP client for the cleanup endpoint
#[derive(Debug, Clone)]
pub struct CleanupClient {
    http: reqwest::Client,
    endpoint: String,
}

impl CleanupClient {
    pub fn new(api_url: &str, timeout: Duration) -> E2eResult<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            endpoint: format!("{}{}", api_url.trim_end_matches('/'), CLEANUP_PATH),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn send(&self, request: &CleanupRequest) -> E2eResult<CleanupOutcome> {
        let response = self.http.post(&self.endpoint).json(request).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if status.is_success() {
            let summary = serde_json::from_str(&body).unwrap_or_else(|_| CleanupSummary {
                message: Some(body),
                ..Default::default()
            });
            Ok(CleanupOutcome::Cleaned(summary))
        } else {
            Ok(CleanupOutcome::Rejected {
                status: status.as_u16(),
                body,
            })
        }
    }

    /// Ask the backend to delete the records; never returns an error
    pub async fn cleanup(&self, request: &CleanupRequest) -> CleanupOutcome {
        if request.email.trim().is_empty() {
            debug!("No test data to clean up");
            return CleanupOutcome::Skipped;
        }

        info!("Cleaning up test data for {}", request.email);
        let outcome = match self.send(request).await {
            Ok(outcome) => outcome,
            Err(e) => CleanupOutcome::Failed {
                reason: E2eError::Cleanup(e.to_string()).to_string(),
            },
        };

        match &outcome {
            CleanupOutcome::Cleaned(summary) => {
                info!("Cleanup successful: {}", summary.deleted_records)
            }
            CleanupOutcome::Rejected { status, body } => {
                warn!("Cleanup response ({}): {}", status, body)
            }
            CleanupOutcome::Failed { reason } => warn!("Cleanup error (non-critical): {}", reason),
            CleanupOutcome::Skipped => {}
        }
        outcome
    }
}
