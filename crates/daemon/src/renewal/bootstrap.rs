//! Self-signed placeholder certificates
//!
//! A TLS-terminating service sharing the certificate volume usually refuses
//! to start without a certificate, while the real certificate may need that
//! service to be up. A short-lived self-signed placeholder breaks the cycle;
//! it is replaced by the issued certificate on the same run.

use std::time::{Duration, SystemTime};

use rcgen::{CertificateParams, DistinguishedName, DnType, KeyPair};
use tracing::info;

use super::error::BootstrapError;
use super::storage::CertificateStorage;

/// Validity of a placeholder certificate
pub const PLACEHOLDER_VALIDITY: Duration = Duration::from_secs(24 * 3600);

/// A generated placeholder certificate and key, PEM encoded.
#[derive(Debug, Clone)]
pub struct Placeholder {
    pub cert_pem: String,
    pub key_pem: String,
}

/// Generate a self-signed certificate covering `names`.
///
/// The first name becomes the subject common name.
///
/// # Errors
///
/// Fails if key generation or signing fails.
pub fn generate_placeholder(names: &[String], validity: Duration) -> Result<Placeholder, BootstrapError> {
    let key_pair = KeyPair::generate()?;

    let mut params = CertificateParams::new(names.to_vec())?;

    let mut dn = DistinguishedName::new();
    if let Some(common_name) = names.first() {
        dn.push(DnType::CommonName, common_name.as_str());
    }
    params.distinguished_name = dn;

    let now = SystemTime::now();
    params.not_before = now.into();
    params.not_after = (now + validity).into();

    let cert = params.self_signed(&key_pair)?;

    Ok(Placeholder {
        cert_pem: cert.pem(),
        key_pem: key_pair.serialize_pem(),
    })
}

/// Generate a placeholder for `domain` and write it to storage.
///
/// # Errors
///
/// Fails if generation fails or the files cannot be written.
pub fn write_placeholder(
    storage: &CertificateStorage,
    domain: &str,
    names: &[String],
) -> Result<(), BootstrapError> {
    // Domain key first so it becomes the common name
    let mut ordered = Vec::with_capacity(names.len() + 1);
    ordered.push(domain.to_string());
    ordered.extend(names.iter().filter(|name| name.as_str() != domain).cloned());

    let placeholder = generate_placeholder(&ordered, PLACEHOLDER_VALIDITY)?;
    storage.save_certificate(domain, &placeholder.cert_pem, &placeholder.key_pem)?;

    info!(
        domain = %domain,
        validity_hours = PLACEHOLDER_VALIDITY.as_secs() / 3600,
        "Wrote temporary self-signed certificate"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renewal::inspect::parse_certificate_pem;
    use chrono::Utc;
    use tempfile::TempDir;

    #[test]
    fn test_generate_placeholder() {
        let names = vec!["a.com".to_string(), "www.a.com".to_string()];
        let placeholder = generate_placeholder(&names, PLACEHOLDER_VALIDITY).unwrap();

        assert!(placeholder.cert_pem.contains("BEGIN CERTIFICATE"));
        assert!(placeholder.key_pem.contains("PRIVATE KEY"));

        let record = parse_certificate_pem(placeholder.cert_pem.as_bytes()).unwrap();
        assert_eq!(record.subject_alt_names, names);

        let remaining = record.not_valid_after - Utc::now();
        assert!(remaining > chrono::Duration::hours(23));
        assert!(remaining <= chrono::Duration::hours(24));
    }

    #[test]
    fn test_write_placeholder() {
        let temp_dir = TempDir::new().unwrap();
        let storage = CertificateStorage::new(temp_dir.path());

        write_placeholder(&storage, "a.com", &["a.com".to_string()]).unwrap();

        assert!(storage.cert_path("a.com").is_file());
        assert!(storage.key_path("a.com").is_file());
        let record = storage.inspect("a.com").unwrap().unwrap();
        assert_eq!(record.subject_alt_names, vec!["a.com"]);
    }
}
