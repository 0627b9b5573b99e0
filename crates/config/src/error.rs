//! Configuration errors
//!
//! Every variant is fatal at startup: the daemon refuses to run with a
//! configuration it cannot interpret unambiguously.

use std::fmt;
use std::path::PathBuf;

use certkeeper_common::FlagParseError;
use thiserror::Error;

/// Result type for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Where a domain definition came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainSource {
    /// `DOMAINS` / `SUBDOMAINS` environment variables
    Environment,
    /// A YAML descriptor in the domain directory
    File(PathBuf),
}

impl fmt::Display for DomainSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Environment => write!(f, "environment"),
            Self::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Errors raised while loading settings or building the domain set.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required environment variable is unset or empty
    #[error("{0} variable not set")]
    MissingVariable(&'static str),

    /// Neither `DOMAINS` nor `DOMAIN_DIR` was provided
    #[error("either DOMAINS or DOMAIN_DIR needs to be set")]
    NoDomainSource,

    /// `PLUGIN` does not name a known issuance backend
    #[error("invalid plugin {name:?} (known plugins: {known})")]
    UnknownPlugin { name: String, known: String },

    /// A boolean variable carries an unknown token
    #[error("invalid value for {variable}: {source}")]
    InvalidFlag {
        variable: String,
        #[source]
        source: FlagParseError,
    },

    /// A numeric variable could not be parsed or is out of range
    #[error("invalid value for {variable}: {value:?} ({reason})")]
    InvalidNumber {
        variable: &'static str,
        value: String,
        reason: String,
    },

    /// `DOMAIN_DIR` is set but is not an existing directory
    #[error("could not find {0} or not a directory")]
    DomainDirNotFound(PathBuf),

    /// The domain directory could not be listed
    #[error("failed to list domain directory {path}: {message}")]
    DirectoryScan { path: PathBuf, message: String },

    /// A descriptor file could not be read
    #[error("failed to read {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A descriptor file is not valid YAML
    #[error("failed to parse {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// A descriptor file is valid YAML but has the wrong shape
    #[error("error reading {path}: {message}")]
    Structure { path: PathBuf, message: String },

    /// `CERT_DIR` is not a `live` directory inside a certbot configuration directory
    #[error("invalid CERT_DIR {}: must name the live directory inside certbot's configuration directory", .0.display())]
    InvalidCertDir(PathBuf),

    /// A domain key or subdomain label cannot be used as a name
    #[error("invalid domain name {domain:?} from {origin}: {reason}")]
    InvalidDomain {
        domain: String,
        origin: DomainSource,
        reason: &'static str,
    },

    /// The same domain key is defined by two sources
    #[error("found multiple definitions for {domain} ({first} and {second})")]
    DuplicateDomain {
        domain: String,
        first: DomainSource,
        second: DomainSource,
    },
}

impl ConfigError {
    pub(crate) fn structure(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Structure {
            path: path.into(),
            message: message.into(),
        }
    }
}
