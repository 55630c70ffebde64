//! Venmail E2E Common Library
//!
//! Everything a run must know before the first browser command: which
//! environment it targets, which identities it logs in as, and how it is
//! configured.

pub mod config;
pub mod credentials;
pub mod environment;
pub mod error;

// Re-export commonly used types
pub use config::{ArtifactConfig, BrowserConfig, DomainRetryConfig, RunConfig, TimeoutConfig};
pub use credentials::{Credential, CredentialResolver, Role, VariablePresence};
pub use environment::{
    resolve_environment, Environment, EnvironmentSources, ResolvedEnvironment, SpecSelection,
};
pub use error::{Error, Result};

/// Suite version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
