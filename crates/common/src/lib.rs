//! Shared helpers for certkeeper
//!
//! Small parsing utilities used by both the configuration crate and the
//! daemon: the boolean flag token table and domain-name helpers.

pub mod flags;
pub mod names;

pub use flags::{parse_flag, parse_optional_flag, FlagParseError};
pub use names::{check_domain_name, is_yaml_path, qualify, split_list};
