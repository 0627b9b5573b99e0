//! One evaluation pass over every managed domain
//!
//! A cycle rebuilds the canonical domain set, optionally removes orphaned
//! certificate directories, evaluates each domain key in order and requests
//! issuance where needed, then runs the post-cycle hook once. Domains are
//! processed strictly one after another.

use std::path::PathBuf;
use std::sync::Arc;

use certkeeper_config::{ConfigError, Settings};
use chrono::Utc;
use serde::Serialize;
use tracing::{error, info, warn};

use super::cleaner::clean_orphans;
use super::decision::RenewalDecision;
use super::engine::RenewalEngine;
use super::hook::PostCycleHook;
use super::issuance::{IssuanceBackend, IssuanceRequest};
use super::storage::CertificateStorage;
use crate::trigger::ShutdownCoordinator;

/// Result of the issuance step for one domain
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "error")]
pub enum IssuanceOutcome {
    NotRequired,
    Succeeded,
    Failed(String),
}

/// Result of the post-cycle hook
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "error")]
pub enum HookOutcome {
    NotConfigured,
    /// The cycle was interrupted before any domain was processed
    Skipped,
    Succeeded,
    Failed(String),
}

/// Outcome for one domain key
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DomainReport {
    pub domain: String,
    pub decision: RenewalDecision,
    pub issuance: IssuanceOutcome,
}

/// Everything one cycle did
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    pub domains: Vec<DomainReport>,
    pub removed_orphans: Vec<PathBuf>,
    pub cleanup_failures: Vec<(PathBuf, String)>,
    pub hook: HookOutcome,
    /// Shutdown was requested before every domain was processed
    pub interrupted: bool,
}

impl CycleReport {
    pub fn renewed_count(&self) -> usize {
        self.domains
            .iter()
            .filter(|d| d.issuance == IssuanceOutcome::Succeeded)
            .count()
    }

    pub fn failed_count(&self) -> usize {
        self.domains
            .iter()
            .filter(|d| matches!(d.issuance, IssuanceOutcome::Failed(_)))
            .count()
    }

    pub fn has_failures(&self) -> bool {
        self.failed_count() > 0
    }
}

/// Runs cycles against one set of settings and collaborators.
pub struct CycleRunner {
    settings: Arc<Settings>,
    engine: RenewalEngine,
    backend: Arc<dyn IssuanceBackend>,
    hook: Option<Arc<dyn PostCycleHook>>,
    shutdown: ShutdownCoordinator,
}

impl CycleRunner {
    pub fn new(
        settings: Arc<Settings>,
        backend: Arc<dyn IssuanceBackend>,
        hook: Option<Arc<dyn PostCycleHook>>,
        shutdown: ShutdownCoordinator,
    ) -> Self {
        let storage = CertificateStorage::new(&settings.cert_dir);
        let engine = RenewalEngine::new(storage, settings.expiry_window_days, settings.chicken_egg);
        Self {
            settings,
            engine,
            backend,
            hook,
            shutdown,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Run one cycle.
    ///
    /// # Errors
    ///
    /// Fails only if the domain configuration cannot be built, in which case
    /// nothing is touched and the hook does not run. Per-domain failures are
    /// recorded in the report.
    pub async fn run_cycle(&self) -> Result<CycleReport, ConfigError> {
        let domains = self.settings.build_domain_set()?;
        let storage = self.engine.storage();

        info!(
            domain_count = domains.len(),
            cert_dir = %storage.base_path().display(),
            "Starting certificate check cycle"
        );

        let (removed_orphans, cleanup_failures) = if self.settings.clean {
            let cleanup = clean_orphans(storage, &domains);
            (cleanup.removed, cleanup.failed)
        } else {
            (Vec::new(), Vec::new())
        };

        let mut reports = Vec::with_capacity(domains.len());
        let mut interrupted = false;

        for (domain, descriptor) in &domains {
            if self.shutdown.is_shutdown_requested() {
                warn!(
                    remaining = domains.len() - reports.len(),
                    "Shutdown requested, stopping cycle early"
                );
                interrupted = true;
                break;
            }

            let decision = self.engine.assess(domain, descriptor, Utc::now());
            let issuance = if decision.requires_issuance() {
                let request = IssuanceRequest::for_domain(domain, descriptor, self.settings.staging);
                self.issue(&request).await
            } else {
                IssuanceOutcome::NotRequired
            };

            reports.push(DomainReport {
                domain: domain.clone(),
                decision,
                issuance,
            });
        }

        let hook = if interrupted && reports.is_empty() {
            HookOutcome::Skipped
        } else {
            self.run_hook().await
        };

        let report = CycleReport {
            domains: reports,
            removed_orphans,
            cleanup_failures,
            hook,
            interrupted,
        };

        info!(
            checked = report.domains.len(),
            renewed = report.renewed_count(),
            failed = report.failed_count(),
            orphans_removed = report.removed_orphans.len(),
            interrupted = report.interrupted,
            "Certificate check cycle finished"
        );

        Ok(report)
    }

    async fn issue(&self, request: &IssuanceRequest) -> IssuanceOutcome {
        info!(domain = %request.cert_name, names = ?request.domains, "Requesting certificate");

        match self.backend.request(request).await {
            Ok(()) => {
                if let Err(e) = self.engine.storage().fix_permissions(&request.cert_name) {
                    warn!(domain = %request.cert_name, error = %e, "Failed to fix certificate permissions");
                }
                IssuanceOutcome::Succeeded
            }
            Err(e) => {
                error!(domain = %request.cert_name, error = %e, "Certificate issuance failed");
                IssuanceOutcome::Failed(e.to_string())
            }
        }
    }

    async fn run_hook(&self) -> HookOutcome {
        let Some(hook) = &self.hook else {
            return HookOutcome::NotConfigured;
        };

        match hook.run().await {
            Ok(()) => HookOutcome::Succeeded,
            Err(e) => {
                error!(error = %e, "Post-cycle hook failed");
                HookOutcome::Failed(e.to_string())
            }
        }
    }
}
