//! Boolean flag parsing
//!
//! Environment variables and YAML descriptors both carry on/off switches as
//! loosely typed text. Every such value goes through [`parse_flag`], which
//! accepts a fixed token table and rejects everything else.

use thiserror::Error;

/// Tokens accepted as `true` (compared case-insensitively).
pub const TRUE_TOKENS: &[&str] = &["yes", "y", "true", "t", "1", "on"];

/// Tokens accepted as `false` (compared case-insensitively).
///
/// The empty string counts as false so that `FOO=` behaves like an unset flag.
pub const FALSE_TOKENS: &[&str] = &["no", "n", "false", "f", "0", "off", ""];

/// A value could not be interpreted as a boolean flag.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid value for boolean flag: {token:?} (expected one of yes/no, true/false, on/off, 1/0)")]
pub struct FlagParseError {
    /// The offending token, as given
    pub token: String,
}

/// Parse a boolean flag token.
///
/// Surrounding whitespace is ignored and matching is case-insensitive.
///
/// # Errors
///
/// Returns [`FlagParseError`] if the token is in neither table.
pub fn parse_flag(token: &str) -> Result<bool, FlagParseError> {
    let normalized = token.trim().to_ascii_lowercase();

    if TRUE_TOKENS.contains(&normalized.as_str()) {
        return Ok(true);
    }
    if FALSE_TOKENS.contains(&normalized.as_str()) {
        return Ok(false);
    }

    Err(FlagParseError {
        token: token.to_string(),
    })
}

/// Parse an optional flag, treating absence as `false`.
///
/// # Errors
///
/// Returns [`FlagParseError`] if a present value is not a known token.
pub fn parse_optional_flag(token: Option<&str>) -> Result<bool, FlagParseError> {
    token.map_or(Ok(false), parse_flag)
}
