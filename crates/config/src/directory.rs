//! Domain directory loading
//!
//! Reads the YAML descriptors in `DOMAIN_DIR`. Each file looks like:
//!
//! ```yaml
//! disabled: false          # optional, skips the whole file
//! domains:
//!   example.com:
//!     staging: false
//!     chickenegg: true
//!     subdomains:
//!       www:
//!       api:
//!         disable-https: true   # dropped from the certificate
//!   example.org:
//!     subdomains-only: true     # manage www.example.org only
//!     subdomains:
//!       www:
//! ```
//!
//! Unknown keys are ignored so the same files can carry settings for other
//! tools sharing the directory.

use std::fs;
use std::path::{Path, PathBuf};

use certkeeper_common::{is_yaml_path, parse_flag, qualify};
use glob::{glob_with, MatchOptions, Pattern};
use serde_yaml::{Mapping, Value};
use tracing::{debug, info, trace, warn};

use crate::error::{ConfigError, ConfigResult, DomainSource};
use crate::model::{CanonicalDomainSet, DomainDescriptor};

const KEY_DISABLED: &str = "disabled";
const KEY_DOMAINS: &str = "domains";
const KEY_SUBDOMAINS: &str = "subdomains";
const KEY_DISABLE_HTTPS: &str = "disable-https";
const KEY_SUBDOMAINS_ONLY: &str = "subdomains-only";
const KEY_STAGING: &str = "staging";
const KEY_CHICKENEGG: &str = "chickenegg";

/// List the descriptor files in a domain directory, sorted by path.
///
/// # Errors
///
/// Fails if the path is not an existing directory or cannot be listed.
pub fn descriptor_files(dir: &Path) -> ConfigResult<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(ConfigError::DomainDirNotFound(dir.to_path_buf()));
    }

    let dir_str = dir.to_str().ok_or_else(|| ConfigError::DirectoryScan {
        path: dir.to_path_buf(),
        message: "path is not valid UTF-8".to_string(),
    })?;
    let escaped = Pattern::escape(dir_str);

    let options = MatchOptions {
        case_sensitive: false,
        ..MatchOptions::new()
    };

    let mut files = Vec::new();
    for suffix in ["yml", "yaml"] {
        let pattern = format!("{escaped}/*.{suffix}");
        let entries = glob_with(&pattern, options).map_err(|e| ConfigError::DirectoryScan {
            path: dir.to_path_buf(),
            message: e.to_string(),
        })?;

        for entry in entries {
            let path = entry.map_err(|e| ConfigError::DirectoryScan {
                path: dir.to_path_buf(),
                message: e.to_string(),
            })?;
            if path.is_file() && is_yaml_path(&path) {
                files.push(path);
            }
        }
    }

    files.sort();
    files.dedup();
    trace!(dir = %dir.display(), count = files.len(), "Listed domain descriptor files");
    Ok(files)
}

/// Load every descriptor in `dir` into `set`.
///
/// # Errors
///
/// Fails on the first unreadable or malformed file, or on a domain key that
/// is already registered.
pub fn load_domain_dir(dir: &Path, set: &mut CanonicalDomainSet) -> ConfigResult<()> {
    let files = descriptor_files(dir)?;

    if files.is_empty() {
        warn!(dir = %dir.display(), "No domain descriptor files found");
    }

    for path in files {
        let content = fs::read_to_string(&path).map_err(|source| ConfigError::ReadFile {
            path: path.clone(),
            source,
        })?;

        let registrations = parse_descriptor(&path, &content)?;
        debug!(
            file = %path.display(),
            domains = registrations.len(),
            "Loaded domain descriptor file"
        );

        for (domain, descriptor) in registrations {
            set.insert(domain, descriptor, DomainSource::File(path.clone()))?;
        }
    }

    Ok(())
}

/// Parse one descriptor file into the domain keys it registers.
///
/// Applies `disabled`, `disable-https` (domain and subdomain level) and
/// `subdomains-only` expansion. Keys are returned in file order.
///
/// # Errors
///
/// Fails if the YAML is invalid or does not have the expected shape.
pub fn parse_descriptor(path: &Path, content: &str) -> ConfigResult<Vec<(String, DomainDescriptor)>> {
    let document: Value = serde_yaml::from_str(content).map_err(|source| ConfigError::Yaml {
        path: path.to_path_buf(),
        source,
    })?;

    let Value::Mapping(root) = document else {
        return Err(ConfigError::structure(path, "file is not a map"));
    };

    if yaml_flag(&root, KEY_DISABLED, path, "disabled")? {
        info!(file = %path.display(), "Skipping disabled domain descriptor file");
        return Ok(Vec::new());
    }

    let domains = match root.get(KEY_DOMAINS) {
        Some(Value::Mapping(domains)) => domains,
        Some(_) => return Err(ConfigError::structure(path, "'domains' is not a map")),
        None => return Err(ConfigError::structure(path, "missing 'domains' map")),
    };

    let mut registrations = Vec::new();

    for (key, entry) in domains {
        let domain = key_string(key)
            .ok_or_else(|| ConfigError::structure(path, "domain keys must be strings"))?;
        let context = format!("domains.{domain}");

        let empty = Mapping::new();
        let entry = match entry {
            Value::Mapping(entry) => entry,
            Value::Null => &empty,
            _ => return Err(ConfigError::structure(path, format!("'{context}' is not a map"))),
        };

        let descriptor = parse_domain_entry(entry, path, &context)?;

        if descriptor.disable_https {
            debug!(domain = %domain, file = %path.display(), "HTTPS disabled, skipping domain");
            continue;
        }

        if descriptor.subdomains_only {
            for sub in &descriptor.subdomains {
                registrations.push((qualify(sub, &domain), DomainDescriptor::default()));
            }
            continue;
        }

        registrations.push((domain, descriptor));
    }

    Ok(registrations)
}

/// Build a descriptor from one `domains.<key>` entry, with opted-out
/// subdomains already removed.
fn parse_domain_entry(entry: &Mapping, path: &Path, context: &str) -> ConfigResult<DomainDescriptor> {
    let mut descriptor = DomainDescriptor {
        disable_https: yaml_flag(entry, KEY_DISABLE_HTTPS, path, context)?,
        subdomains_only: yaml_flag(entry, KEY_SUBDOMAINS_ONLY, path, context)?,
        staging: yaml_flag(entry, KEY_STAGING, path, context)?,
        chicken_egg: yaml_flag(entry, KEY_CHICKENEGG, path, context)?,
        ..Default::default()
    };

    let subdomains = match entry.get(KEY_SUBDOMAINS) {
        None | Some(Value::Null) => return Ok(descriptor),
        Some(Value::Mapping(subdomains)) => subdomains,
        Some(_) => {
            return Err(ConfigError::structure(
                path,
                format!("'{context}.subdomains' is not a map"),
            ))
        }
    };

    for (key, value) in subdomains {
        let sub = key_string(key).ok_or_else(|| {
            ConfigError::structure(path, format!("'{context}.subdomains' keys must be strings"))
        })?;

        if let Value::Mapping(options) = value {
            let sub_context = format!("{context}.subdomains.{sub}");
            if yaml_flag(options, KEY_DISABLE_HTTPS, path, &sub_context)? {
                trace!(subdomain = %sub, "HTTPS disabled for subdomain");
                continue;
            }
        }

        descriptor.subdomains.insert(sub);
    }

    Ok(descriptor)
}

/// Read an optional boolean switch from a mapping.
///
/// Accepts YAML booleans, flag tokens as strings, and the integers 0/1.
fn yaml_flag(map: &Mapping, key: &str, path: &Path, context: &str) -> ConfigResult<bool> {
    let invalid_flag = |source| ConfigError::InvalidFlag {
        variable: format!("{}: {context}.{key}", path.display()),
        source,
    };

    match map.get(key) {
        None | Some(Value::Null) => Ok(false),
        Some(Value::Bool(value)) => Ok(*value),
        Some(Value::String(token)) => parse_flag(token).map_err(invalid_flag),
        Some(Value::Number(number)) => parse_flag(&number.to_string()).map_err(invalid_flag),
        Some(_) => Err(ConfigError::structure(
            path,
            format!("'{context}.{key}' must be a boolean"),
        )),
    }
}

fn key_string(key: &Value) -> Option<String> {
    match key {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn parse(content: &str) -> ConfigResult<Vec<(String, DomainDescriptor)>> {
        parse_descriptor(Path::new("test.yml"), content)
    }

    fn keys(registrations: &[(String, DomainDescriptor)]) -> Vec<&str> {
        registrations.iter().map(|(k, _)| k.as_str()).collect()
    }

    #[test]
    fn test_parse_basic_descriptor() {
        let registrations = parse(
            r"
domains:
  example.com:
    staging: true
    chickenegg: yes
    subdomains:
      www:
      api:
",
        )
        .unwrap();

        assert_eq!(keys(&registrations), vec!["example.com"]);
        let descriptor = &registrations[0].1;
        assert!(descriptor.staging);
        assert!(descriptor.chicken_egg);
        assert_eq!(
            descriptor.subdomains.iter().collect::<Vec<_>>(),
            vec!["api", "www"]
        );
    }

    #[test]
    fn test_null_domain_entry_is_empty_descriptor() {
        let registrations = parse("domains:\n  example.com:\n").unwrap();
        assert_eq!(registrations, vec![("example.com".to_string(), DomainDescriptor::default())]);
    }

    #[test]
    fn test_disabled_file_skipped() {
        let registrations = parse("disabled: true\ndomains:\n  example.com:\n").unwrap();
        assert!(registrations.is_empty());
    }

    #[test]
    fn test_disable_https_domain_skipped() {
        let registrations = parse(
            r"
domains:
  off.com:
    disable-https: true
  on.com:
",
        )
        .unwrap();
        assert_eq!(keys(&registrations), vec!["on.com"]);
    }

    #[test]
    fn test_subdomain_opt_out() {
        let registrations = parse(
            r"
domains:
  example.com:
    subdomains:
      www:
      internal:
        disable-https: true
",
        )
        .unwrap();
        let descriptor = &registrations[0].1;
        assert!(descriptor.subdomains.contains("www"));
        assert!(!descriptor.subdomains.contains("internal"));
    }

    #[test]
    fn test_subdomains_only_expansion() {
        let registrations = parse(
            r"
domains:
  example.org:
    subdomains-only: true
    subdomains:
      www:
      api:
      old:
        disable-https: true
",
        )
        .unwrap();

        assert_eq!(keys(&registrations), vec!["api.example.org", "www.example.org"]);
        assert!(registrations
            .iter()
            .all(|(_, d)| *d == DomainDescriptor::default()));
    }

    #[test]
    fn test_missing_domains_map_is_error() {
        let err = parse("something: else\n").unwrap_err();
        assert!(matches!(err, ConfigError::Structure { .. }));
    }

    #[test]
    fn test_domains_not_a_map_is_error() {
        let err = parse("domains:\n  - example.com\n").unwrap_err();
        assert!(err.to_string().contains("'domains' is not a map"));
    }

    #[test]
    fn test_subdomains_not_a_map_is_error() {
        let err = parse("domains:\n  example.com:\n    subdomains: [www]\n").unwrap_err();
        assert!(err.to_string().contains("domains.example.com.subdomains"));
    }

    #[test]
    fn test_invalid_flag_token_is_error() {
        let err = parse("domains:\n  example.com:\n    staging: perhaps\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidFlag { .. }));
    }

    #[test]
    fn test_empty_file_is_error() {
        assert!(parse("").is_err());
    }

    #[test]
    fn test_descriptor_files_filters_and_sorts() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("b.yaml"), "domains: {}").unwrap();
        fs::write(dir.path().join("a.yml"), "domains: {}").unwrap();
        fs::write(dir.path().join("C.YML"), "domains: {}").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
        fs::create_dir(dir.path().join("nested.yml")).unwrap();

        let files = descriptor_files(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["C.YML", "a.yml", "b.yaml"]);
    }

    #[test]
    fn test_missing_directory_is_error() {
        let err = descriptor_files(Path::new("/nonexistent/certkeeper/domains")).unwrap_err();
        assert!(matches!(err, ConfigError::DomainDirNotFound(_)));
    }

    #[test]
    fn test_duplicate_across_files_is_error() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.yml"), "domains:\n  example.com:\n").unwrap();
        fs::write(dir.path().join("b.yml"), "domains:\n  example.com:\n").unwrap();

        let mut set = CanonicalDomainSet::new();
        let err = load_domain_dir(dir.path(), &mut set).unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateDomain { .. }));
    }

    #[test]
    fn test_absolute_path_key_is_error() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.yml"), "domains:\n  /tmp/x:\n").unwrap();

        let mut set = CanonicalDomainSet::new();
        let err = load_domain_dir(dir.path(), &mut set).unwrap_err();
        match err {
            ConfigError::InvalidDomain { domain, origin, .. } => {
                assert_eq!(domain, "/tmp/x");
                assert_eq!(origin, DomainSource::File(dir.path().join("a.yml")));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_subdomains_only_collides_with_explicit_key() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("a.yml"),
            "domains:\n  example.com:\n    subdomains-only: true\n    subdomains:\n      www:\n",
        )
        .unwrap();
        fs::write(dir.path().join("b.yml"), "domains:\n  www.example.com:\n").unwrap();

        let mut set = CanonicalDomainSet::new();
        let err = load_domain_dir(dir.path(), &mut set).unwrap_err();
        assert!(err.to_string().contains("www.example.com"));
    }
}
