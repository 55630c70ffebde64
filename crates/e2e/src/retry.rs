//! Bounded check-and-retry over a list of candidates
//!
//! A [`RetryableCheck`] feeds candidates to a [`CandidateProbe`] one at a
//! time and classifies each observation. The loop stops on the first
//! `Found`, on an `Abort`, or after `max_attempts` probes in total. When
//! every candidate has been tried the list wraps around to the start.
//!
//! ```text
//!   Idle -> Checking(c) -> Found        -> done
//!                       -> SoftFail     -> Checking(next)
//!                       -> Unexpected   -> Checking(next)
//!                       -> Abort        -> done
//!   attempts == max_attempts            -> Exhausted
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{E2eError, E2eResult};

/// Text shown when a domain is found in the registrar
pub const DOMAIN_FOUND_MARKER: &str = "We found your domain";

/// Texts that mean the domain check failed for this candidate
pub const DOMAIN_FAILURE_MARKERS: &[&str] = &[
    "This domain is not available for registration",
    "Domain not found",
    "not found in your provider",
    "not found",
    "invalid domain",
    "error",
];

/// What a probe saw after checking one candidate
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeObservation {
    pub found_marker_present: bool,
    pub failure_marker_present: bool,
    pub raw_text: String,
}

/// Verdict for one attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "reason", rename_all = "snake_case")]
pub enum Classification {
    Found,
    SoftFail,
    Unexpected,
    /// Stop immediately; retrying cannot help
    Abort(String),
}

/// Maps an observation to a verdict
pub trait OutcomeClassifier: Send + Sync {
    fn classify(&self, candidate: &str, observation: &ProbeObservation) -> Classification;
}

/// Found beats failure; neither marker means the page said something else
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkerClassifier;

impl OutcomeClassifier for MarkerClassifier {
    fn classify(&self, _candidate: &str, observation: &ProbeObservation) -> Classification {
        if observation.found_marker_present {
            Classification::Found
        } else if observation.failure_marker_present {
            Classification::SoftFail
        } else {
            Classification::Unexpected
        }
    }
}

/// Case-sensitive success and failure markers searched for in page text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkerSet {
    pub found: Vec<String>,
    pub failures: Vec<String>,
}

impl MarkerSet {
    pub fn new<F, S>(found: F, failures: S) -> Self
    where
        F: IntoIterator,
        F::Item: Into<String>,
        S: IntoIterator,
        S::Item: Into<String>,
    {
        Self {
            found: found.into_iter().map(Into::into).collect(),
            failures: failures.into_iter().map(Into::into).collect(),
        }
    }

    /// Markers of the domain availability check
    pub fn domain_check() -> Self {
        Self::new([DOMAIN_FOUND_MARKER], DOMAIN_FAILURE_MARKERS.iter().copied())
    }

    pub fn observe(&self, text: &str) -> ProbeObservation {
        ProbeObservation {
            found_marker_present: self.found.iter().any(|m| text.contains(m.as_str())),
            failure_marker_present: self.failures.iter().any(|m| text.contains(m.as_str())),
            raw_text: text.to_string(),
        }
    }
}

impl Default for MarkerSet {
    fn default() -> Self {
        Self::domain_check()
    }
}

/// Performs the side-effecting check for one candidate
#[async_trait]
pub trait CandidateProbe: Send {
    async fn probe(&mut self, candidate: &str) -> E2eResult<ProbeObservation>;
}

/// One probe in the history of a check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub attempt: u32,
    pub candidate: String,
    pub classification: Classification,
}

/// How a check ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RetryOutcome {
    Found { candidate: String, attempts: u32 },
    /// Every attempt was used without a `Found`
    Exhausted { attempts: u32 },
    Aborted { candidate: String, attempts: u32, reason: String },
}

/// Outcome plus every attempt made
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryReport {
    pub outcome: RetryOutcome,
    pub history: Vec<AttemptRecord>,
}

impl RetryReport {
    pub fn attempts(&self) -> u32 {
        self.history.len() as u32
    }

    pub fn found(&self) -> Option<&str> {
        match &self.outcome {
            RetryOutcome::Found { candidate, .. } => Some(candidate),
            _ => None,
        }
    }

    /// Candidates in the order they were probed
    pub fn probed(&self) -> Vec<&str> {
        self.history.iter().map(|r| r.candidate.as_str()).collect()
    }
}

/// Ordered candidates and an attempt budget
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryableCheck {
    candidates: Vec<String>,
    max_attempts: u32,
}

impl RetryableCheck {
    pub fn new<I>(candidates: I, max_attempts: u32) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        Self {
            candidates: candidates.into_iter().map(Into::into).collect(),
            max_attempts,
        }
    }

    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Run the check loop
    pub async fn run(
        &self,
        probe: &mut dyn CandidateProbe,
        classifier: &dyn OutcomeClassifier,
    ) -> E2eResult<RetryReport> {
        if self.candidates.is_empty() {
            return Err(E2eError::NoCandidates);
        }

        let mut history = Vec::new();

        for attempt in 1..=self.max_attempts {
            let candidate = &self.candidates[(attempt as usize - 1) % self.candidates.len()];
            info!("Attempt {}/{}: checking {}", attempt, self.max_attempts, candidate);

            let observation = probe.probe(candidate).await?;
            let classification = classifier.classify(candidate, &observation);
            history.push(AttemptRecord {
                attempt,
                candidate: candidate.clone(),
                classification: classification.clone(),
            });

            match classification {
                Classification::Found => {
                    info!("{} found after {} attempt(s)", candidate, attempt);
                    return Ok(RetryReport {
                        outcome: RetryOutcome::Found {
                            candidate: candidate.clone(),
                            attempts: attempt,
                        },
                        history,
                    });
                }
                Classification::Abort(reason) => {
                    warn!("Aborting check at {}: {}", candidate, reason);
                    return Ok(RetryReport {
                        outcome: RetryOutcome::Aborted {
                            candidate: candidate.clone(),
                            attempts: attempt,
                            reason,
                        },
                        history,
                    });
                }
                Classification::SoftFail => {
                    debug!("{} not found, trying next", candidate);
                }
                Classification::Unexpected => {
                    let excerpt: String = observation.raw_text.chars().take(100).collect();
                    warn!("Unexpected response for {}: {}", candidate, excerpt);
                }
            }
        }

        warn!("Max attempts ({}) reached without a match", self.max_attempts);
        Ok(RetryReport {
            outcome: RetryOutcome::Exhausted {
                attempts: self.max_attempts,
            },
            history,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("We found your domain bluemoonfox.com", Classification::Found ; "found")]
    #[test_case("Domain not found", Classification::SoftFail ; "not found")]
    #[test_case("This domain is not available for registration", Classification::SoftFail ; "unavailable")]
    #[test_case("Something went wrong: error 500", Classification::SoftFail ; "generic error")]
    #[test_case("Checking...", Classification::Unexpected ; "no marker")]
    #[test_case("We found your domain x.com but an error occurred", Classification::Found ; "found wins")]
    fn test_marker_classification(text: &str, expected: Classification) {
        let observation = MarkerSet::domain_check().observe(text);
        assert_eq!(MarkerClassifier.classify("x.com", &observation), expected);
    }

    #[test]
    fn test_markers_are_case_sensitive() {
        let observation = MarkerSet::domain_check().observe("ERROR");
        assert!(!observation.failure_marker_present);
    }

    struct Script(Vec<&'static str>);

    #[async_trait]
    impl CandidateProbe for Script {
        async fn probe(&mut self, _candidate: &str) -> E2eResult<ProbeObservation> {
            let text = if self.0.is_empty() { "" } else { self.0.remove(0) };
            Ok(MarkerSet::domain_check().observe(text))
        }
    }

    struct AbortOnUnexpected;

    impl OutcomeClassifier for AbortOnUnexpected {
        fn classify(&self, candidate: &str, observation: &ProbeObservation) -> Classification {
            match MarkerClassifier.classify(candidate, observation) {
                Classification::Unexpected => Classification::Abort("page changed".into()),
                other => other,
            }
        }
    }

    #[tokio::test]
    async fn test_abort_ends_loop() {
        let check = RetryableCheck::new(["a.com", "b.com", "c.com"], 10);
        let mut probe = Script(vec!["Domain not found", "Loading"]);
        let report = check.run(&mut probe, &AbortOnUnexpected).await.unwrap();
        assert_eq!(
            report.outcome,
            RetryOutcome::Aborted {
                candidate: "b.com".into(),
                attempts: 2,
                reason: "page changed".into()
            }
        );
    }

    #[tokio::test]
    async fn test_empty_candidates_rejected() {
        let check = RetryableCheck::new(Vec::<String>::new(), 3);
        let err = check
            .run(&mut Script(vec![]), &MarkerClassifier)
            .await
            .unwrap_err();
        assert!(matches!(err, E2eError::NoCandidates));
    }

    #[tokio::test]
    async fn test_zero_attempts_is_exhausted_without_probing() {
        let check = RetryableCheck::new(["a.com"], 0);
        let report = check.run(&mut Script(vec![]), &MarkerClassifier).await.unwrap();
        assert_eq!(report.outcome, RetryOutcome::Exhausted { attempts: 0 });
        assert!(report.history.is_empty());
    }
}
