//! Venmail E2E Suite
//!
//! Drives the Venmail webmail UI through a persistent Playwright bridge and
//! runs declarative YAML suites against it:
//! - Resolves the target environment and every credential up front
//! - Reuses authenticated sessions across tests through a session cache
//! - Runs bounded check-and-retry loops (domain availability) as values
//! - Isolates every test behind a fresh context, with retries, failure
//!   screenshots and best-effort cleanup
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   SuiteRunner (Rust)                        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  discover() -> [LoadedSuite]      (env allowlist + filter)  │
//! │  resolve_all(roles)               (fail fast, no browser)   │
//! │  per test:                                                  │
//! │    ├── Browser::reset()                                     │
//! │    ├── TestContext::new()         (fresh TestData)          │
//! │    ├── execute_step(before_each + steps)                    │
//! │    │     ├── page objects  -> PageContext -> dyn Browser    │
//! │    │     ├── login_session -> SessionCache                  │
//! │    │     └── check_domains -> RetryableCheck                │
//! │    ├── screenshot on failure, retry                         │
//! │    └── CleanupClient (suites with cleanup: true)            │
//! ├─────────────────────────────────────────────────────────────┤
//! │  PlaywrightBrowser: node bridge, JSON lines over stdio      │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod browser;
pub mod cleanup;
pub mod context;
pub mod data;
pub mod error;
pub mod executor;
pub mod page;
pub mod pages;
pub mod playwright;
pub mod retry;
pub mod runner;
pub mod scenario;
pub mod session;

pub use browser::{Browser, BrowserLauncher, Cookie, Locator};
pub use cleanup::{CleanupClient, CleanupOutcome, CleanupRequest};
pub use context::{RunState, TestContext};
pub use data::TestData;
pub use error::{E2eError, E2eResult};
pub use page::{Condition, PageContext, Timeouts};
pub use playwright::{PlaywrightConfig, PlaywrightLauncher};
pub use retry::{
    Classification, MarkerClassifier, OutcomeClassifier, RetryOutcome, RetryReport, RetryableCheck,
};
pub use runner::{RunReport, SuiteFilter, SuiteRunner, TestStatus};
pub use scenario::{LoadedSuite, Step, SuiteSpec, TestCase};
pub use session::{SessionCache, SessionKey, SessionOutcome, SessionProcedure, SessionScope};
