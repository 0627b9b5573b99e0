//! Canonical domain model
//!
//! [`CanonicalDomainSet`] is the single source of truth for one evaluation
//! cycle: every managed certificate has exactly one key in it, and the
//! descriptor says which names that certificate must cover.

use std::collections::btree_map::{self, BTreeMap};
use std::collections::BTreeSet;

use certkeeper_common::{check_domain_name, qualify};
use serde::Serialize;

use crate::error::{ConfigError, ConfigResult, DomainSource};

/// Certificate requirements for one domain key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DomainDescriptor {
    /// Subdomain labels that must appear as `{label}.{key}` in the certificate
    pub subdomains: BTreeSet<String>,
    /// Exclude the domain from certificate management entirely
    pub disable_https: bool,
    /// Manage only the subdomains, each under its own key
    pub subdomains_only: bool,
    /// Issue against the ACME staging environment
    pub staging: bool,
    /// Allow a self-signed placeholder while no certificate exists
    pub chicken_egg: bool,
}

impl DomainDescriptor {
    /// Descriptor with the given subdomain labels and all switches off.
    pub fn with_subdomains<I, S>(subdomains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            subdomains: subdomains.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// Every DNS name the certificate for `domain_key` must carry, sorted.
    pub fn required_names(&self, domain_key: &str) -> Vec<String> {
        let mut names: Vec<String> = self
            .subdomains
            .iter()
            .map(|sub| qualify(sub, domain_key))
            .collect();
        names.push(domain_key.to_string());
        names.sort();
        names.dedup();
        names
    }
}

/// Mapping of domain key to descriptor with globally unique keys.
///
/// Iteration is in key order, so a cycle always visits domains in the same
/// sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CanonicalDomainSet {
    domains: BTreeMap<String, DomainDescriptor>,
    #[serde(skip)]
    sources: BTreeMap<String, DomainSource>,
}

impl CanonicalDomainSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a domain key.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidDomain`] if the key or a subdomain label
    /// is not a usable name, and [`ConfigError::DuplicateDomain`] if the key
    /// is already registered, whichever source registered it.
    pub fn insert(
        &mut self,
        domain: impl Into<String>,
        descriptor: DomainDescriptor,
        source: DomainSource,
    ) -> ConfigResult<()> {
        let domain = domain.into();

        // Keys become directory names under the certificate root
        let names = std::iter::once(&domain).chain(&descriptor.subdomains);
        for name in names {
            if let Err(reason) = check_domain_name(name) {
                return Err(ConfigError::InvalidDomain {
                    domain: name.clone(),
                    origin: source,
                    reason,
                });
            }
        }

        if let Some(first) = self.sources.get(&domain) {
            return Err(ConfigError::DuplicateDomain {
                domain,
                first: first.clone(),
                second: source,
            });
        }

        self.sources.insert(domain.clone(), source);
        self.domains.insert(domain, descriptor);
        Ok(())
    }

    /// Look up a descriptor
    pub fn get(&self, domain: &str) -> Option<&DomainDescriptor> {
        self.domains.get(domain)
    }

    /// Whether a domain key is managed
    pub fn contains(&self, domain: &str) -> bool {
        self.domains.contains_key(domain)
    }

    /// Where a domain key was defined
    pub fn source(&self, domain: &str) -> Option<&DomainSource> {
        self.sources.get(domain)
    }

    /// Managed domain keys, sorted
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.domains.keys().map(String::as_str)
    }

    /// Domain keys with their descriptors, sorted by key
    pub fn iter(&self) -> btree_map::Iter<'_, String, DomainDescriptor> {
        self.domains.iter()
    }

    pub fn len(&self) -> usize {
        self.domains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }
}

impl<'a> IntoIterator for &'a CanonicalDomainSet {
    type Item = (&'a String, &'a DomainDescriptor);
    type IntoIter = btree_map::Iter<'a, String, DomainDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_names_sorted_with_apex() {
        let descriptor = DomainDescriptor::with_subdomains(["www", "api"]);
        assert_eq!(
            descriptor.required_names("a.com"),
            vec!["a.com", "api.a.com", "www.a.com"]
        );
    }

    #[test]
    fn test_required_names_empty_descriptor() {
        assert_eq!(DomainDescriptor::default().required_names("a.com"), vec!["a.com"]);
    }

    #[test]
    fn test_duplicate_insert_rejected() {
        let mut set = CanonicalDomainSet::new();
        set.insert("a.com", DomainDescriptor::default(), DomainSource::Environment)
            .unwrap();

        let err = set
            .insert(
                "a.com",
                DomainDescriptor::default(),
                DomainSource::File("/etc/domains/a.yml".into()),
            )
            .unwrap_err();

        match err {
            ConfigError::DuplicateDomain { domain, first, second } => {
                assert_eq!(domain, "a.com");
                assert_eq!(first, DomainSource::Environment);
                assert_eq!(second, DomainSource::File("/etc/domains/a.yml".into()));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_path_like_keys_rejected() {
        let mut set = CanonicalDomainSet::new();
        for key in ["../etc", "/tmp/x", "..", "a.com/../../b", ""] {
            let err = set
                .insert(key, DomainDescriptor::default(), DomainSource::Environment)
                .unwrap_err();
            assert!(
                matches!(err, ConfigError::InvalidDomain { ref domain, .. } if domain == key),
                "unexpected error for {key:?}: {err}"
            );
        }
        assert!(set.is_empty());
    }

    #[test]
    fn test_path_like_subdomain_rejected() {
        let mut set = CanonicalDomainSet::new();
        let err = set
            .insert(
                "a.com",
                DomainDescriptor::with_subdomains(["www", "../x"]),
                DomainSource::File("/etc/domains/a.yml".into()),
            )
            .unwrap_err();

        match err {
            ConfigError::InvalidDomain { domain, origin, .. } => {
                assert_eq!(domain, "../x");
                assert_eq!(origin, DomainSource::File("/etc/domains/a.yml".into()));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!set.contains("a.com"));
    }

    #[test]
    fn test_serializes_as_plain_map() {
        let mut set = CanonicalDomainSet::new();
        set.insert("a.com", DomainDescriptor::with_subdomains(["www"]), DomainSource::Environment)
            .unwrap();

        let json = serde_json::to_value(&set).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "a.com": {
                    "subdomains": ["www"],
                    "disable_https": false,
                    "subdomains_only": false,
                    "staging": false,
                    "chicken_egg": false
                }
            })
        );
    }

    #[test]
    fn test_iteration_is_sorted() {
        let mut set = CanonicalDomainSet::new();
        for key in ["c.com", "a.com", "b.com"] {
            set.insert(key, DomainDescriptor::default(), DomainSource::Environment)
                .unwrap();
        }
        let keys: Vec<&str> = set.keys().collect();
        assert_eq!(keys, vec!["a.com", "b.com", "c.com"]);
    }
}
