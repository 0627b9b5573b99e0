//! Error types for the renewal engine.
//!
//! None of these abort a cycle. Read failures turn into a renewal, issuance
//! and hook failures are reported and retried on the next cycle, cleanup
//! failures skip the affected directory.

use std::path::PathBuf;

use thiserror::Error;

/// Errors from the certificate directory tree
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StorageError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// A certificate file exists but cannot be used
#[derive(Debug, Error)]
pub enum CertificateReadError {
    /// The file could not be read
    #[error("failed to read certificate {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file does not contain a PEM certificate block
    #[error("no certificate found in PEM data: {0}")]
    Pem(String),

    /// The certificate DER could not be decoded
    #[error("invalid X.509 certificate: {0}")]
    X509(String),

    /// The expiry timestamp is out of range
    #[error("certificate expiry out of range: {0}")]
    Timestamp(i64),
}

/// Generating or writing a self-signed placeholder failed
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("failed to generate placeholder certificate: {0}")]
    Generate(#[from] rcgen::Error),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// The issuance collaborator did not produce a certificate
#[derive(Debug, Error)]
pub enum IssuanceError {
    /// The client process could not be started
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The client exited unsuccessfully
    #[error("{program} exited with {status}")]
    Failed { program: String, status: String },

    /// Any other backend failure
    #[error("issuance failed: {0}")]
    Other(String),
}

/// The post-cycle hook failed
#[derive(Debug, Error)]
pub enum HookError {
    #[error("failed to run hook {command:?}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("hook {command:?} exited with {status}")]
    Failed { command: String, status: String },
}
