//! Canonical domain set construction
//!
//! Merges the environment-declared domains with the domain directory into a
//! single [`CanonicalDomainSet`]. Every key must come from exactly one source.

use std::path::Path;

use certkeeper_common::qualify;
use serde::Serialize;
use tracing::{debug, warn};

use crate::directory::load_domain_dir;
use crate::error::{ConfigResult, DomainSource};
use crate::model::{CanonicalDomainSet, DomainDescriptor};

/// Domains declared through `DOMAINS`, `SUBDOMAINS` and `SUBDOMAINS_ONLY`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EnvDomains {
    /// Apex domains
    pub domains: Vec<String>,
    /// Subdomain labels applied to every apex domain
    pub subdomains: Vec<String>,
    /// Register `{sub}.{apex}` keys instead of the apex
    pub subdomains_only: bool,
}

impl EnvDomains {
    /// Register the environment domains into `set`.
    ///
    /// # Errors
    ///
    /// Returns a duplicate-domain error if a key is already registered.
    pub fn register_into(&self, set: &mut CanonicalDomainSet) -> ConfigResult<()> {
        for apex in &self.domains {
            if self.subdomains_only {
                for sub in &self.subdomains {
                    set.insert(
                        qualify(sub, apex),
                        DomainDescriptor::default(),
                        DomainSource::Environment,
                    )?;
                }
            } else {
                set.insert(
                    apex.clone(),
                    DomainDescriptor::with_subdomains(self.subdomains.iter().cloned()),
                    DomainSource::Environment,
                )?;
            }
        }
        Ok(())
    }
}

/// Build the canonical domain set for one cycle.
///
/// The domain directory is loaded first, then the environment domains.
/// `domain_dir = None` disables directory loading.
///
/// # Errors
///
/// Fails if the directory cannot be read, a descriptor is malformed, or a
/// domain key is defined more than once.
pub fn build_domain_set(env: &EnvDomains, domain_dir: Option<&Path>) -> ConfigResult<CanonicalDomainSet> {
    let mut set = CanonicalDomainSet::new();

    if let Some(dir) = domain_dir {
        load_domain_dir(dir, &mut set)?;
        if set.is_empty() {
            warn!(dir = %dir.display(), "No domain configs found in domain directory");
        }
    }

    env.register_into(&mut set)?;

    if set.is_empty() {
        warn!("No domains found");
    } else {
        debug!(domains = set.len(), "Built canonical domain set");
    }

    Ok(set)
}
