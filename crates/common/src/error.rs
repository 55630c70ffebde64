//! Error types for run configuration

use thiserror::Error;

/// Result type alias using the configuration Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while resolving what a run targets.
///
/// Every variant here is fatal to the run and is raised before the first
/// browser command is issued.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Missing required environment variables: {}", missing.join(", "))]
    MissingCredentials { missing: Vec<String> },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Config write error: {0}")]
    TomlWrite(#[from] toml::ser::Error),
}

impl Error {
    /// Unknown role, environment or other key requested
    pub fn configuration(msg: impl Into<String>) -> Self {
        Error::Configuration(msg.into())
    }

    /// Variables reported as missing, in the order they were checked
    pub fn missing_variables(&self) -> &[String] {
        match self {
            Error::MissingCredentials { missing } => missing,
            _ => &[],
        }
    }
}
