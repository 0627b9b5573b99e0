//! Per-domain evaluation: inspect, decide, bootstrap.

use certkeeper_config::DomainDescriptor;
use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use super::bootstrap::write_placeholder;
use super::decision::{decide, CertificateState, RenewalDecision};
use super::storage::CertificateStorage;

/// Evaluates domain keys against the certificate root.
#[derive(Debug, Clone)]
pub struct RenewalEngine {
    storage: CertificateStorage,
    expiry_window_days: u32,
    global_bootstrap: bool,
}

impl RenewalEngine {
    pub fn new(storage: CertificateStorage, expiry_window_days: u32, global_bootstrap: bool) -> Self {
        Self {
            storage,
            expiry_window_days,
            global_bootstrap,
        }
    }

    pub fn storage(&self) -> &CertificateStorage {
        &self.storage
    }

    /// Read the certificate state for a domain key.
    ///
    /// Read failures are logged and reported as [`CertificateState::Unreadable`].
    pub fn certificate_state(&self, domain_key: &str) -> CertificateState {
        match self.storage.inspect(domain_key) {
            Ok(Some(record)) => CertificateState::Present(record),
            Ok(None) => CertificateState::Missing,
            Err(e) => {
                warn!(domain = %domain_key, error = %e, "Failed to read certificate, renewal required");
                CertificateState::Unreadable
            }
        }
    }

    /// Evaluate one domain key.
    ///
    /// On [`RenewalDecision::BootstrapThenRenew`] a self-signed placeholder is
    /// written before returning. A failed write is logged and the decision is
    /// returned unchanged so issuance still proceeds.
    pub fn assess(&self, domain_key: &str, descriptor: &DomainDescriptor, now: DateTime<Utc>) -> RenewalDecision {
        let state = self.certificate_state(domain_key);
        let allow_bootstrap = self.global_bootstrap || descriptor.chicken_egg;
        let decision = decide(
            domain_key,
            descriptor,
            &state,
            self.expiry_window_days,
            allow_bootstrap,
            now,
        );

        match decision {
            RenewalDecision::NoActionNeeded => {
                info!(domain = %domain_key, "Certificate is valid, no action needed");
            }
            RenewalDecision::RenewRequired(reason) => {
                info!(domain = %domain_key, reason = ?reason, "Certificate needs renewal: {}", reason);
            }
            RenewalDecision::BootstrapThenRenew => {
                info!(domain = %domain_key, "No certificate found, bootstrapping with a self-signed certificate");
                let names = descriptor.required_names(domain_key);
                if let Err(e) = write_placeholder(&self.storage, domain_key, &names) {
                    error!(domain = %domain_key, error = %e, "Failed to write bootstrap certificate");
                }
            }
        }

        decision
    }
}
