//! Role-based credential resolution
//!
//! One resolver, one ordered source list: process environment variables
//! first, then an optional environment-specific TOML file of the same
//! variable names (`credentials.<environment>.toml`).

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::environment::Environment;
use crate::error::{Error, Result};

/// Every variable a full-suite run needs, in reporting order
pub const REQUIRED_VARIABLES: &[&str] = &[
    "ADMIN_EMAIL",
    "ADMIN_PASSWORD",
    "SALES_EMAIL",
    "SALES_PASSWORD",
    "NORMAL_USER_EMAIL",
    "NORMAL_USER_PASSWORD",
];

/// Named identity a scenario logs in as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Sales,
    #[serde(alias = "normalUser", alias = "normal_user")]
    Normal,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Admin, Role::Sales, Role::Normal];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Sales => "sales",
            Role::Normal => "normal",
        }
    }

    /// Variable names backing this role
    pub fn variables(&self) -> RoleVariables {
        match self {
            Role::Admin => RoleVariables {
                email: "ADMIN_EMAIL",
                password: "ADMIN_PASSWORD",
                first_name: None,
                last_name: None,
            },
            Role::Sales => RoleVariables {
                email: "SALES_EMAIL",
                password: "SALES_PASSWORD",
                first_name: None,
                last_name: None,
            },
            Role::Normal => RoleVariables {
                email: "NORMAL_USER_EMAIL",
                password: "NORMAL_USER_PASSWORD",
                first_name: Some("NORMAL_USER_FIRSTNAME"),
                last_name: Some("NORMAL_USER_LASTNAME"),
            },
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "admin" => Ok(Role::Admin),
            "sales" => Ok(Role::Sales),
            "normal" | "normalUser" | "normal_user" | "normal-user" => Ok(Role::Normal),
            other => Err(Error::configuration(format!("Unknown user role: {other}"))),
        }
    }
}

/// Variable names for one role
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleVariables {
    pub email: &'static str,
    pub password: &'static str,
    pub first_name: Option<&'static str>,
    pub last_name: Option<&'static str>,
}

/// Login credentials for an identity
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub email: String,
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl Credential {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
            first_name: None,
            last_name: None,
        }
    }

    /// Key identifying this credential tuple, without exposing the password
    pub fn identity_key(&self) -> String {
        let digest = Sha256::digest(self.password.as_bytes());
        format!("{}#{}", self.email, hex::encode(digest))
    }

    /// `j***@example.com` style rendering of the email
    pub fn masked_email(&self) -> String {
        mask_email(&self.email)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .finish()
    }
}

/// Mask the local part of an email, keeping its first character
pub fn mask_email(email: &str) -> String {
    match email.split_once('@') {
        Some((local, domain)) => {
            let first: String = local.chars().take(1).collect();
            format!("{first}***@{domain}")
        }
        None => "***".to_string(),
    }
}

/// Presence of one variable, for diagnostics that must not leak values
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariablePresence {
    pub name: String,
    pub present: bool,
}

/// Resolves role credentials from layered sources
#[derive(Debug, Clone, Default)]
pub struct CredentialResolver {
    values: BTreeMap<String, String>,
    file: Option<PathBuf>,
}

impl CredentialResolver {
    /// Build from the process environment and an optional credentials file
    pub fn from_process(file: Option<&Path>) -> Result<Self> {
        Self::from_sources(|name| std::env::var(name).ok(), file)
    }

    /// Build from a variable lookup and an optional credentials file.
    ///
    /// Lookup values take priority; the file only fills in what is absent.
    pub fn from_sources<F>(lookup: F, file: Option<&Path>) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut values = match file {
            Some(path) if path.exists() => {
                debug!("Loading credentials file {}", path.display());
                let content = std::fs::read_to_string(path)?;
                toml::from_str::<BTreeMap<String, String>>(&content)?
            }
            _ => BTreeMap::new(),
        };

        for name in all_variable_names() {
            if let Some(value) = lookup(name).filter(|v| !v.trim().is_empty()) {
                values.insert(name.to_string(), value);
            }
        }

        Ok(Self {
            values,
            file: file.map(Path::to_path_buf),
        })
    }

    /// Build directly from a variable map
    pub fn from_map(values: BTreeMap<String, String>) -> Self {
        Self { values, file: None }
    }

    /// Default credentials file for an environment, inside `dir`
    pub fn default_file(dir: &Path, environment: Environment) -> PathBuf {
        dir.join(format!("credentials.{}.toml", environment.as_str()))
    }

    fn value(&self, name: &str) -> Option<&str> {
        self.values
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }

    /// Resolve a role given by name
    pub fn resolve_named(&self, role: &str) -> Result<Credential> {
        self.resolve(role.parse()?)
    }

    /// Resolve the credential for a role.
    ///
    /// Reports every missing variable for the role, not only the first.
    pub fn resolve(&self, role: Role) -> Result<Credential> {
        let vars = role.variables();
        let missing = self.missing_of(&[vars.email, vars.password]);
        if !missing.is_empty() {
            return Err(Error::MissingCredentials { missing });
        }

        Ok(Credential {
            email: self.value(vars.email).unwrap_or_default().to_string(),
            password: self.value(vars.password).unwrap_or_default().to_string(),
            first_name: vars.first_name.and_then(|n| self.value(n)).map(String::from),
            last_name: vars.last_name.and_then(|n| self.value(n)).map(String::from),
        })
    }

    /// Resolve several roles at once, reporting the union of what is missing
    pub fn resolve_all<I>(&self, roles: I) -> Result<BTreeMap<Role, Credential>>
    where
        I: IntoIterator<Item = Role>,
    {
        let mut resolved = BTreeMap::new();
        let mut missing = Vec::new();
        for role in roles {
            match self.resolve(role) {
                Ok(credential) => {
                    resolved.insert(role, credential);
                }
                Err(Error::MissingCredentials { missing: names }) => {
                    for name in names {
                        if !missing.contains(&name) {
                            missing.push(name);
                        }
                    }
                }
                Err(e) => return Err(e),
            }
        }
        if missing.is_empty() {
            Ok(resolved)
        } else {
            Err(Error::MissingCredentials { missing })
        }
    }

    /// Check every variable a full-suite run needs
    pub fn validate_all(&self) -> Result<()> {
        let missing = self.missing_of(REQUIRED_VARIABLES);
        if missing.is_empty() {
            Ok(())
        } else {
            Err(Error::MissingCredentials { missing })
        }
    }

    /// Presence flags for every known variable
    pub fn presence(&self) -> Vec<VariablePresence> {
        all_variable_names()
            .map(|name| VariablePresence {
                name: name.to_string(),
                present: self.value(name).is_some(),
            })
            .collect()
    }

    /// Credentials file this resolver read, if any
    pub fn file(&self) -> Option<&Path> {
        self.file.as_deref()
    }

    fn missing_of(&self, names: &[&str]) -> Vec<String> {
        names
            .iter()
            .filter(|name| self.value(name).is_none())
            .map(|name| name.to_string())
            .collect()
    }
}

fn all_variable_names() -> impl Iterator<Item = &'static str> {
    Role::ALL.into_iter().flat_map(|role| {
        let vars = role.variables();
        [Some(vars.email), Some(vars.password), vars.first_name, vars.last_name]
            .into_iter()
            .flatten()
    })
}
