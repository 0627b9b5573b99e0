//! certkeeper: certificate lifecycle daemon
//!
//! Keeps certbot-issued TLS certificates present, unexpired and matching the
//! names configured through the environment or a directory of YAML domain
//! descriptors.
//!
//! - [`renewal`]: inspection, decisions, bootstrap, cleanup, issuance and
//!   the cycle scheduler
//! - [`trigger`]: signals, domain directory watching and shutdown

pub mod renewal;
pub mod trigger;

pub use certkeeper_config::{CanonicalDomainSet, ConfigError, DomainDescriptor, Settings};
pub use renewal::{CycleReport, CycleRunner, RenewalDecision, RenewalScheduler};
pub use trigger::ShutdownCoordinator;
