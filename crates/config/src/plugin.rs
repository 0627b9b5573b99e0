//! Issuance plugins
//!
//! The issuance client is always certbot; the plugin selects how it proves
//! domain ownership. Only plugins that need no extra per-run arguments are
//! supported.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::ConfigError;

/// A known certbot authenticator plugin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IssuancePlugin {
    /// DNS-01 via AWS Route 53 (credentials from the usual AWS sources)
    Route53,
    /// HTTP-01 via certbot's built-in standalone server
    Standalone,
}

impl IssuancePlugin {
    /// All supported plugins, in display order.
    pub const ALL: &'static [IssuancePlugin] = &[Self::Route53, Self::Standalone];

    /// Value accepted in the `PLUGIN` variable.
    pub fn name(self) -> &'static str {
        match self {
            Self::Route53 => "route53",
            Self::Standalone => "standalone",
        }
    }

    /// Argument passed to certbot to select the plugin.
    pub fn certbot_arg(self) -> &'static str {
        match self {
            Self::Route53 => "--dns-route53",
            Self::Standalone => "--standalone",
        }
    }

    fn known_names() -> String {
        Self::ALL
            .iter()
            .map(|p| p.name())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for IssuancePlugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for IssuancePlugin {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|p| p.name() == s.trim())
            .ok_or_else(|| ConfigError::UnknownPlugin {
                name: s.to_string(),
                known: Self::known_names(),
            })
    }
}
