//! Configuration for certkeeper
//!
//! Two inputs describe which certificates the daemon manages:
//!
//! - environment variables (`DOMAINS`, `SUBDOMAINS`, `SUBDOMAINS_ONLY`), and
//! - a directory of YAML domain descriptors (`DOMAIN_DIR`).
//!
//! [`Settings`] captures the process configuration once at startup.
//! [`Settings::build_domain_set`] merges both domain sources into a
//! [`CanonicalDomainSet`] at the start of every cycle, rejecting any domain
//! key defined twice.

pub mod builder;
pub mod directory;
pub mod error;
pub mod model;
pub mod plugin;
pub mod settings;

pub use builder::{build_domain_set, EnvDomains};
pub use directory::{descriptor_files, load_domain_dir, parse_descriptor};
pub use error::{ConfigError, ConfigResult, DomainSource};
pub use model::{CanonicalDomainSet, DomainDescriptor};
pub use plugin::IssuancePlugin;
pub use settings::{
    Settings, DEFAULT_CERTBOT, DEFAULT_CERT_DIR, DEFAULT_CHECK_FREQ_MINUTES,
    DEFAULT_EXPIRY_WINDOW_DAYS,
};
