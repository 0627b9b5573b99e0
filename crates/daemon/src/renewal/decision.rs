//! Renewal decisions
//!
//! [`decide`] is a pure function of the domain's required names, what is on
//! disk, the expiry window and the clock. It writes nothing; the bootstrap
//! placeholder for [`RenewalDecision::BootstrapThenRenew`] is produced by
//! [`RenewalEngine`](super::engine::RenewalEngine).

use std::fmt;

use certkeeper_config::DomainDescriptor;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use super::inspect::CertificateRecord;

/// Certificate state on disk for one domain key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CertificateState {
    /// No certificate file exists
    Missing,
    /// A file exists but could not be parsed
    Unreadable,
    /// A parsed certificate
    Present(CertificateRecord),
}

/// Why a certificate must be (re)issued
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RenewReason {
    DomainSetMismatch,
    ExpiringWithinWindow,
    AlreadyExpired,
    CertificateUnreadable,
    CertificateMissingNoBootstrap,
}

impl fmt::Display for RenewReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::DomainSetMismatch => "certificate names differ from required names",
            Self::ExpiringWithinWindow => "certificate expires within the renewal window",
            Self::AlreadyExpired => "certificate has expired",
            Self::CertificateUnreadable => "certificate could not be read",
            Self::CertificateMissingNoBootstrap => "no certificate exists",
        };
        f.write_str(text)
    }
}

/// Outcome of evaluating one domain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "action", content = "reason")]
pub enum RenewalDecision {
    NoActionNeeded,
    RenewRequired(RenewReason),
    /// No certificate exists; write a placeholder, then issue
    BootstrapThenRenew,
}

impl RenewalDecision {
    /// Whether the issuance collaborator must be called
    pub fn requires_issuance(self) -> bool {
        !matches!(self, Self::NoActionNeeded)
    }
}

/// Decide what to do for one domain key. First match wins:
///
/// 1. missing certificate: bootstrap if allowed, otherwise renew
/// 2. unreadable certificate: renew
/// 3. SAN names differ from the required names: renew
/// 4. already expired: renew
/// 5. expiring within `expiry_window_days`: renew
/// 6. otherwise nothing to do
pub fn decide(
    domain_key: &str,
    descriptor: &DomainDescriptor,
    state: &CertificateState,
    expiry_window_days: u32,
    allow_bootstrap: bool,
    now: DateTime<Utc>,
) -> RenewalDecision {
    let record = match state {
        CertificateState::Missing if allow_bootstrap => return RenewalDecision::BootstrapThenRenew,
        CertificateState::Missing => {
            return RenewalDecision::RenewRequired(RenewReason::CertificateMissingNoBootstrap)
        }
        CertificateState::Unreadable => {
            return RenewalDecision::RenewRequired(RenewReason::CertificateUnreadable)
        }
        CertificateState::Present(record) => record,
    };

    let required = descriptor.required_names(domain_key);
    let mut present = record.subject_alt_names.clone();
    present.sort();
    if required != present {
        return RenewalDecision::RenewRequired(RenewReason::DomainSetMismatch);
    }

    if record.not_valid_after < now {
        return RenewalDecision::RenewRequired(RenewReason::AlreadyExpired);
    }

    // A window reaching past the representable range covers every expiry
    let renew_from = Duration::try_days(i64::from(expiry_window_days))
        .and_then(|window| record.not_valid_after.checked_sub_signed(window));
    if renew_from.is_none_or(|renew_from| renew_from < now) {
        return RenewalDecision::RenewRequired(RenewReason::ExpiringWithinWindow);
    }

    RenewalDecision::NoActionNeeded
}
