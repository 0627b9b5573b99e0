//! Certificate inspection
//!
//! Extracts the two facts the decision engine needs from a PEM chain: the
//! DNS names in the leaf certificate's SAN extension and its expiry.

use chrono::{DateTime, Utc};
use x509_parser::extensions::GeneralName;

use super::error::CertificateReadError;

/// What the decision engine knows about a certificate on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateRecord {
    /// DNS-name SAN entries, sorted. IP-address entries are not included.
    pub subject_alt_names: Vec<String>,
    /// End of the validity period
    pub not_valid_after: DateTime<Utc>,
}

/// Parse the leaf certificate of a PEM chain.
///
/// The first `CERTIFICATE` block is the leaf in certbot's `fullchain.pem`.
///
/// # Errors
///
/// Fails if there is no certificate block or it cannot be decoded.
pub fn parse_certificate_pem(data: &[u8]) -> Result<CertificateRecord, CertificateReadError> {
    let blocks = pem::parse_many(data).map_err(|e| CertificateReadError::Pem(e.to_string()))?;
    let leaf = blocks
        .iter()
        .find(|block| block.tag() == "CERTIFICATE")
        .ok_or_else(|| CertificateReadError::Pem("no CERTIFICATE block".to_string()))?;

    let (_, cert) = x509_parser::parse_x509_certificate(leaf.contents())
        .map_err(|e| CertificateReadError::X509(e.to_string()))?;

    let mut subject_alt_names = Vec::new();
    let san = cert
        .subject_alternative_name()
        .map_err(|e| CertificateReadError::X509(e.to_string()))?;
    if let Some(san) = san {
        for name in &san.value.general_names {
            if let GeneralName::DNSName(dns) = name {
                subject_alt_names.push((*dns).to_string());
            }
        }
    }
    subject_alt_names.sort();

    let timestamp = cert.validity().not_after.timestamp();
    let not_valid_after =
        DateTime::from_timestamp(timestamp, 0).ok_or(CertificateReadError::Timestamp(timestamp))?;

    Ok(CertificateRecord {
        subject_alt_names,
        not_valid_after,
    })
}

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::{DateTime, Utc};
    use rcgen::{CertificateParams, KeyPair, SanType};

    /// Mint a self-signed PEM certificate for tests.
    pub fn certificate_pem(names: &[&str], not_after: DateTime<Utc>) -> (String, String) {
        let key_pair = KeyPair::generate().unwrap();
        let mut params =
            CertificateParams::new(names.iter().map(ToString::to_string).collect::<Vec<_>>())
                .unwrap();
        params.not_before = std::time::SystemTime::from(not_after - chrono::Duration::days(90)).into();
        params.not_after = std::time::SystemTime::from(not_after).into();
        params
            .subject_alt_names
            .push(SanType::IpAddress("127.0.0.1".parse().unwrap()));
        let cert = params.self_signed(&key_pair).unwrap();
        (cert.pem(), key_pair.serialize_pem())
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::certificate_pem;
    use super::*;

    #[test]
    fn test_parse_names_and_expiry() {
        let not_after = Utc::now() + chrono::Duration::days(60);
        let (cert_pem, _) = certificate_pem(&["www.a.com", "a.com"], not_after);

        let record = parse_certificate_pem(cert_pem.as_bytes()).unwrap();

        assert_eq!(record.subject_alt_names, vec!["a.com", "www.a.com"]);
        assert!((record.not_valid_after - not_after).num_seconds().abs() <= 1);
    }

    #[test]
    fn test_ip_sans_are_ignored() {
        let (cert_pem, _) = certificate_pem(&["a.com"], Utc::now() + chrono::Duration::days(10));
        let record = parse_certificate_pem(cert_pem.as_bytes()).unwrap();
        assert_eq!(record.subject_alt_names, vec!["a.com"]);
    }

    #[test]
    fn test_leaf_is_first_block() {
        let (leaf, _) = certificate_pem(&["leaf.com"], Utc::now() + chrono::Duration::days(10));
        let (issuer, _) = certificate_pem(&["issuer.com"], Utc::now() + chrono::Duration::days(900));
        let chain = format!("{leaf}{issuer}");

        let record = parse_certificate_pem(chain.as_bytes()).unwrap();
        assert_eq!(record.subject_alt_names, vec!["leaf.com"]);
    }

    #[test]
    fn test_garbage_is_rejected() {
        assert!(parse_certificate_pem(b"not a certificate").is_err());
    }

    #[test]
    fn test_key_only_pem_is_rejected() {
        let (_, key_pem) = certificate_pem(&["a.com"], Utc::now());
        let err = parse_certificate_pem(key_pem.as_bytes()).unwrap_err();
        assert!(matches!(err, CertificateReadError::Pem(_)));
    }

    #[test]
    fn test_corrupt_der_is_rejected() {
        let pem = "-----BEGIN CERTIFICATE-----\nAAAA\n-----END CERTIFICATE-----\n";
        let err = parse_certificate_pem(pem.as_bytes()).unwrap_err();
        assert!(matches!(err, CertificateReadError::X509(_)));
    }
}
