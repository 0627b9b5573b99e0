//! Orphaned certificate removal

use std::path::PathBuf;

use certkeeper_config::CanonicalDomainSet;
use tracing::{debug, error, info};

use super::storage::CertificateStorage;

/// What one cleanup pass did
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CleanupReport {
    /// Directories removed
    pub removed: Vec<PathBuf>,
    /// Directories that could not be removed, with the reason
    pub failed: Vec<(PathBuf, String)>,
}

/// Remove every certificate directory whose name is not a key of `domains`.
///
/// Plain files at the root are left alone. Failures are logged and the
/// directory is skipped.
pub fn clean_orphans(storage: &CertificateStorage, domains: &CanonicalDomainSet) -> CleanupReport {
    let mut report = CleanupReport::default();

    let existing = match storage.list_domains() {
        Ok(existing) => existing,
        Err(e) => {
            error!(error = %e, "Failed to list certificate directories");
            report
                .failed
                .push((storage.base_path().to_path_buf(), e.to_string()));
            return report;
        }
    };

    for name in existing.iter().filter(|name| !domains.contains(name)) {
        info!(domain = %name, "Removing orphaned certificate");
        match storage.delete_domain(name) {
            Ok(Some(path)) => report.removed.push(path),
            Ok(None) => {}
            Err(e) => {
                error!(domain = %name, error = %e, "Failed to remove orphaned certificate");
                report.failed.push((storage.domain_path(name), e.to_string()));
            }
        }
    }

    debug!(
        removed = report.removed.len(),
        failed = report.failed.len(),
        "Orphan cleanup finished"
    );
    report
}
