//! Domain name helpers shared by the config loader and the daemon.

use std::path::Path;

/// Join a subdomain label onto its apex domain (`www` + `example.com`).
pub fn qualify(subdomain: &str, apex: &str) -> String {
    format!("{subdomain}.{apex}")
}

/// Check that a domain key or subdomain label is usable as a DNS name and as
/// a single directory name under the certificate root.
///
/// Returns the reason on failure.
pub fn check_domain_name(name: &str) -> Result<(), &'static str> {
    if name.is_empty() {
        return Err("name is empty");
    }
    if name.contains(['/', '\\', '\0']) {
        return Err("name contains a path separator");
    }
    if name.split('.').any(str::is_empty) {
        return Err("name has an empty label");
    }
    Ok(())
}

/// Split a comma separated list, trimming entries and dropping empty ones.
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

/// Whether a path names a YAML domain descriptor (`.yml` or `.yaml`, any case).
pub fn is_yaml_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("yml") || ext.eq_ignore_ascii_case("yaml"))
}
