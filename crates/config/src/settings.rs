//! Daemon settings
//!
//! All runtime configuration is read once at startup into an immutable
//! [`Settings`] value and passed explicitly to the components that need it.
//!
//! | Variable          | Meaning                                   | Default                  |
//! |-------------------|-------------------------------------------|--------------------------|
//! | `EMAIL`           | ACME account contact (required)           |                          |
//! | `DOMAINS`         | Comma separated apex domains              |                          |
//! | `SUBDOMAINS`      | Comma separated subdomain labels          |                          |
//! | `SUBDOMAINS_ONLY` | Manage `{sub}.{apex}` instead of the apex | `false`                  |
//! | `STAGING`         | Use the ACME staging environment          | `false`                  |
//! | `PLUGIN`          | Issuance plugin (`route53`, `standalone`) | required                 |
//! | `DOMAIN_DIR`      | Directory of YAML domain descriptors      |                          |
//! | `CHICKENEGG`      | Self-signed placeholder when missing      | `false`                  |
//! | `EXP_LIMIT`       | Renewal window in days                    | `30`                     |
//! | `CHECK_FREQ`      | Minutes between cycles                    | `30`                     |
//! | `HOOK`            | Shell command run after each cycle        |                          |
//! | `WATCH`           | Re-run on changes in `DOMAIN_DIR`         | `false`                  |
//! | `CLEAN`           | Remove orphaned certificate directories   | `false`                  |
//! | `ONCE`            | Run a single cycle and exit               | `false`                  |
//! | `CERT_DIR`        | Certificate root, a certbot `live` dir    | `/etc/letsencrypt/live`  |
//! | `CERTBOT`         | Issuance client binary                    | `certbot`                |

use std::path::{Path, PathBuf};
use std::time::Duration;

use certkeeper_common::{parse_optional_flag, split_list};
use serde::Serialize;
use tracing::debug;

use crate::builder::{build_domain_set, EnvDomains};
use crate::error::{ConfigError, ConfigResult};
use crate::model::CanonicalDomainSet;
use crate::plugin::IssuancePlugin;

/// Default renewal window in days
pub const DEFAULT_EXPIRY_WINDOW_DAYS: u32 = 30;

/// Default minutes between cycles
pub const DEFAULT_CHECK_FREQ_MINUTES: u64 = 30;

/// Default certificate root, certbot's live directory
pub const DEFAULT_CERT_DIR: &str = "/etc/letsencrypt/live";

/// Name certbot gives the certificate root inside its configuration directory
const LIVE_DIR_NAME: &str = "live";

/// Default issuance client binary
pub const DEFAULT_CERTBOT: &str = "certbot";

/// Immutable daemon configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Settings {
    /// ACME account contact email
    pub email: String,
    /// Environment-declared domains
    pub env_domains: EnvDomains,
    /// Issue every certificate against the staging environment
    pub staging: bool,
    /// Issuance plugin
    pub plugin: IssuancePlugin,
    /// Directory of YAML domain descriptors
    pub domain_dir: Option<PathBuf>,
    /// Write self-signed placeholders for every missing certificate
    pub chicken_egg: bool,
    /// Renew certificates expiring within this many days
    pub expiry_window_days: u32,
    /// Time between timer-triggered cycles
    pub check_interval: Duration,
    /// Shell command run once after every cycle
    pub hook: Option<String>,
    /// Re-run cycles when the domain directory changes
    pub watch: bool,
    /// Delete certificate directories with no managed domain
    pub clean: bool,
    /// Run a single cycle and exit
    pub once: bool,
    /// Certificate root holding one directory per domain key
    pub cert_dir: PathBuf,
    /// certbot configuration directory, the parent of `cert_dir`
    pub certbot_config_dir: PathBuf,
    /// Issuance client binary
    pub certbot: String,
}

impl Settings {
    /// Load settings from the process environment.
    ///
    /// A `.env` file in the working directory is loaded first if present;
    /// variables already set in the environment take precedence.
    ///
    /// # Errors
    ///
    /// See [`Settings::from_lookup`].
    pub fn from_env() -> ConfigResult<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            debug!(path = %path.display(), "Loaded environment file");
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load settings through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Fails if `EMAIL` is unset, if neither `DOMAINS` nor `DOMAIN_DIR` is
    /// set, if `PLUGIN` is unknown, or if a flag or number is malformed.
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let flag = |key: &str| {
            parse_optional_flag(lookup(key).as_deref()).map_err(|source| ConfigError::InvalidFlag {
                variable: key.to_string(),
                source,
            })
        };

        let email = get("EMAIL").ok_or(ConfigError::MissingVariable("EMAIL"))?;

        let env_domains = EnvDomains {
            domains: get("DOMAINS").map(|v| split_list(&v)).unwrap_or_default(),
            subdomains: get("SUBDOMAINS").map(|v| split_list(&v)).unwrap_or_default(),
            subdomains_only: flag("SUBDOMAINS_ONLY")?,
        };
        let domain_dir = get("DOMAIN_DIR").map(PathBuf::from);

        if env_domains.domains.is_empty() && domain_dir.is_none() {
            return Err(ConfigError::NoDomainSource);
        }

        let plugin: IssuancePlugin = get("PLUGIN").unwrap_or_default().parse()?;

        let expiry_window_days = match get("EXP_LIMIT") {
            Some(value) => parse_number::<u32>("EXP_LIMIT", &value)?,
            None => DEFAULT_EXPIRY_WINDOW_DAYS,
        };

        let check_freq_minutes = match get("CHECK_FREQ") {
            Some(value) => parse_number::<u64>("CHECK_FREQ", &value)?,
            None => DEFAULT_CHECK_FREQ_MINUTES,
        };
        if check_freq_minutes == 0 {
            return Err(ConfigError::InvalidNumber {
                variable: "CHECK_FREQ",
                value: "0".to_string(),
                reason: "must be at least 1 minute".to_string(),
            });
        }

        let cert_dir = get("CERT_DIR").map_or_else(|| PathBuf::from(DEFAULT_CERT_DIR), PathBuf::from);
        let certbot_config_dir = certbot_config_dir(&cert_dir)?;

        Ok(Self {
            email,
            env_domains,
            staging: flag("STAGING")?,
            plugin,
            domain_dir,
            chicken_egg: flag("CHICKENEGG")?,
            expiry_window_days,
            check_interval: Duration::from_secs(check_freq_minutes.saturating_mul(60)),
            hook: get("HOOK"),
            watch: flag("WATCH")?,
            clean: flag("CLEAN")?,
            once: flag("ONCE")?,
            cert_dir,
            certbot_config_dir,
            certbot: get("CERTBOT").unwrap_or_else(|| DEFAULT_CERTBOT.to_string()),
        })
    }

    /// Build the canonical domain set from the current configuration sources.
    ///
    /// Called once per cycle; the domain directory is re-read every time.
    ///
    /// # Errors
    ///
    /// See [`build_domain_set`].
    pub fn build_domain_set(&self) -> ConfigResult<CanonicalDomainSet> {
        build_domain_set(&self.env_domains, self.domain_dir.as_deref())
    }

    /// Whether the domain directory should be watched for changes
    pub fn watch_domain_dir(&self) -> Option<&std::path::Path> {
        if self.watch {
            self.domain_dir.as_deref()
        } else {
            None
        }
    }
}

/// certbot writes certificates to `{config-dir}/live`, so the root must be
/// such a directory for issued certificates to land where they are inspected.
fn certbot_config_dir(cert_dir: &Path) -> ConfigResult<PathBuf> {
    match (cert_dir.file_name(), cert_dir.parent()) {
        (Some(name), Some(parent)) if name == LIVE_DIR_NAME && !parent.as_os_str().is_empty() => {
            Ok(parent.to_path_buf())
        }
        _ => Err(ConfigError::InvalidCertDir(cert_dir.to_path_buf())),
    }
}

fn parse_number<T>(variable: &'static str, value: &str) -> ConfigResult<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidNumber {
            variable,
            value: value.to_string(),
            reason: e.to_string(),
        })
}
