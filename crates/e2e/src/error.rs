//! Error types for E2E testing

use thiserror::Error;

#[derive(Error, Debug)]
pub enum E2eError {
    #[error(transparent)]
    Config(#[from] venmail_e2e_common::Error),

    #[error("Playwright not found. Install with: npx playwright install")]
    PlaywrightNotFound,

    #[error("Playwright error: {0}")]
    Playwright(String),

    #[error("Browser bridge closed unexpectedly")]
    BridgeClosed,

    #[error("Suite parse error: {0}")]
    SpecParse(String),

    #[error("Step failed: {step} - {reason}")]
    StepFailed { step: String, reason: String },

    #[error("Assertion failed: expected {expected}, observed {observed}")]
    UiAssertion { expected: String, observed: String },

    #[error("Timeout after {after_ms} ms waiting for: {what}")]
    Timeout { what: String, after_ms: u64 },

    #[error("Retry check has no candidates")]
    NoCandidates,

    #[error("Cleanup failed: {0}")]
    Cleanup(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl E2eError {
    /// Errors that end the whole run rather than the current test
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            E2eError::Config(_) | E2eError::PlaywrightNotFound | E2eError::BridgeClosed
        )
    }

    pub fn assertion(expected: impl Into<String>, observed: impl Into<String>) -> Self {
        E2eError::UiAssertion {
            expected: expected.into(),
            observed: observed.into(),
        }
    }
}

pub type E2eResult<T> = Result<T, E2eError>;
