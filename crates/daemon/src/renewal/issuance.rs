//! Certificate issuance through an external ACME client
//!
//! The daemon never speaks ACME itself. [`IssuanceBackend`] is the seam; the
//! production implementation runs certbot and treats exit code 0 as success.

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use certkeeper_common::qualify;
use certkeeper_config::{DomainDescriptor, IssuancePlugin};
use tokio::process::Command;
use tracing::{debug, info};

use super::error::IssuanceError;

/// One certificate to obtain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuanceRequest {
    /// Lineage name; the certificate lands in `{cert_root}/{cert_name}`
    pub cert_name: String,
    /// Names to cover, apex first, then subdomains sorted
    pub domains: Vec<String>,
    /// Use the ACME staging environment
    pub staging: bool,
}

impl IssuanceRequest {
    /// Build the request for a domain key.
    ///
    /// Staging is enabled if either the process or the descriptor asks for it.
    pub fn for_domain(domain_key: &str, descriptor: &DomainDescriptor, global_staging: bool) -> Self {
        let mut domains = Vec::with_capacity(descriptor.subdomains.len() + 1);
        domains.push(domain_key.to_string());
        domains.extend(descriptor.subdomains.iter().map(|sub| qualify(sub, domain_key)));

        Self {
            cert_name: domain_key.to_string(),
            domains,
            staging: global_staging || descriptor.staging,
        }
    }
}

/// Something that can obtain a certificate
#[async_trait]
pub trait IssuanceBackend: Send + Sync {
    /// Obtain a certificate for the request, awaiting completion.
    async fn request(&self, request: &IssuanceRequest) -> Result<(), IssuanceError>;
}

/// Runs the certbot binary
#[derive(Debug, Clone)]
pub struct CertbotBackend {
    program: String,
    plugin: IssuancePlugin,
    email: String,
    /// Passed as `--config-dir`; certbot's own default when unset
    config_dir: Option<PathBuf>,
}

impl CertbotBackend {
    pub fn new(program: impl Into<String>, plugin: IssuancePlugin, email: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            plugin,
            email: email.into(),
            config_dir: None,
        }
    }

    /// Point certbot at a configuration directory, so certificates land in
    /// its `live` subdirectory.
    pub fn with_config_dir(mut self, config_dir: impl Into<PathBuf>) -> Self {
        self.config_dir = Some(config_dir.into());
        self
    }

    /// Command line arguments for a request
    pub fn args(&self, request: &IssuanceRequest) -> Vec<String> {
        let mut args: Vec<String> = [
            "certonly",
            self.plugin.certbot_arg(),
            "-n",
            "--agree-tos",
            "--renew-by-default",
            "--text",
            "-m",
        ]
        .iter()
        .map(ToString::to_string)
        .collect();
        args.push(self.email.clone());

        if let Some(config_dir) = &self.config_dir {
            args.push("--config-dir".to_string());
            args.push(config_dir.display().to_string());
        }

        if request.staging {
            args.push("--staging".to_string());
        }

        args.push("--cert-name".to_string());
        args.push(request.cert_name.clone());

        for domain in &request.domains {
            args.push("-d".to_string());
            args.push(domain.clone());
        }
        args
    }
}

#[async_trait]
impl IssuanceBackend for CertbotBackend {
    async fn request(&self, request: &IssuanceRequest) -> Result<(), IssuanceError> {
        let args = self.args(request);
        debug!(program = %self.program, args = ?args, "Running issuance client");

        let status = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .status()
            .await
            .map_err(|source| IssuanceError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !status.success() {
            return Err(IssuanceError::Failed {
                program: self.program.clone(),
                status: status.to_string(),
            });
        }

        info!(
            domain = %request.cert_name,
            names = ?request.domains,
            staging = request.staging,
            "Certificate issued"
        );
        Ok(())
    }
}
