//! Certificate renewal engine
//!
//! Keeps one certbot-managed certificate per domain key present, current and
//! carrying exactly the configured names.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐     ┌──────────────────┐     ┌──────────────────┐
//! │ RenewalScheduler │────►│   CycleRunner    │────►│ IssuanceBackend  │
//! │ (trigger queue)  │     │  (one pass)      │     │   (certbot)      │
//! └──────────────────┘     └──────────────────┘     └──────────────────┘
//!          ▲                        │
//!          │               ┌────────┴─────────┐
//!  timer / watch /         ▼                  ▼
//!      SIGHUP      ┌──────────────┐   ┌──────────────┐
//!                  │RenewalEngine │   │clean_orphans │
//!                  │ inspect +    │   └──────────────┘
//!                  │ decide +     │
//!                  │ bootstrap    │
//!                  └──────────────┘
//! ```
//!
//! # Decision order
//!
//! 1. No certificate: write a 1-day self-signed placeholder if bootstrap is
//!    allowed, then issue
//! 2. Unreadable certificate: issue
//! 3. Names differ from the required names: issue
//! 4. Expired, or expiring within the window: issue
//!
//! Storage layout follows certbot: `{cert_dir}/{domain}/fullchain.pem` and
//! `privkey.pem`.

mod bootstrap;
mod cleaner;
mod cycle;
mod decision;
mod engine;
mod error;
mod hook;
mod inspect;
mod issuance;
mod scheduler;
mod storage;

pub use bootstrap::{generate_placeholder, write_placeholder, Placeholder, PLACEHOLDER_VALIDITY};
pub use cleaner::{clean_orphans, CleanupReport};
pub use cycle::{CycleReport, CycleRunner, DomainReport, HookOutcome, IssuanceOutcome};
pub use decision::{decide, CertificateState, RenewReason, RenewalDecision};
pub use engine::RenewalEngine;
pub use error::{BootstrapError, CertificateReadError, HookError, IssuanceError, StorageError};
pub use hook::{PostCycleHook, ShellHook};
pub use inspect::{parse_certificate_pem, CertificateRecord};
pub use issuance::{CertbotBackend, IssuanceBackend, IssuanceRequest};
pub use scheduler::{run_timer, RenewalScheduler, Trigger, TriggerQueue, TriggerSender};
pub use storage::{CertificateStorage, CERT_FILE, KEY_FILE};
