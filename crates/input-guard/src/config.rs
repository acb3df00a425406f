//! Per-call sanitization options and scoring thresholds.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Errors raised for invalid configuration. These are caller bugs and are
/// never coerced to a default.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("unknown remove_specials policy '{0}'; expected one of: none, balanced, strict")]
    UnknownRemoveSpecials(String),

    #[error("max_length must be greater than zero")]
    InvalidMaxLength,

    #[error("invalid thresholds: flag={flag}, block={block} (need 0 < flag <= block)")]
    InvalidThresholds { flag: u32, block: u32 },
}

// ---------------------------------------------------------------------------
// RemoveSpecials
// ---------------------------------------------------------------------------

/// How aggressively special characters are stripped from cleaned text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoveSpecials {
    /// Leave every character in place.
    None,
    /// Strip `\ < > ` | ; & $` but keep quotes.
    #[default]
    Balanced,
    /// Balanced plus quotes, brackets, braces and parentheses.
    Strict,
}

const BALANCED_CHARS: &[char] = &['\\', '<', '>', '`', '|', ';', '&', '$'];
const STRICT_CHARS: &[char] = &[
    '"', '\'', '\\', '<', '>', '`', '|', ';', '&', '$', '(', ')', '[', ']', '{', '}',
];

impl RemoveSpecials {
    /// Characters removed under this policy.
    pub fn stripped_chars(self) -> &'static [char] {
        match self {
            Self::None => &[],
            Self::Balanced => BALANCED_CHARS,
            Self::Strict => STRICT_CHARS,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Balanced => "balanced",
            Self::Strict => "strict",
        }
    }
}

impl fmt::Display for RemoveSpecials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RemoveSpecials {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Self::None),
            "balanced" => Ok(Self::Balanced),
            "strict" => Ok(Self::Strict),
            other => Err(ConfigError::UnknownRemoveSpecials(other.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// SanitizeConfig
// ---------------------------------------------------------------------------

/// Options for a single `evaluate_and_clean` / `sanitize` call.
///
/// Unknown keys are rejected when deserializing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SanitizeConfig {
    /// When `false`, keep only code points up to U+024F plus whitespace.
    #[serde(default = "default_true")]
    pub allow_unicode: bool,
    #[serde(default)]
    pub escape_html: bool,
    #[serde(default = "default_true")]
    pub compress_whitespace: bool,
    #[serde(default)]
    pub remove_specials: RemoveSpecials,
    #[serde(default = "default_true")]
    pub log_suspicious: bool,
    /// Input is cut to this many characters before anything else happens.
    #[serde(default = "default_max_length")]
    pub max_length: usize,
    /// Free-form metadata copied into audit records.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<serde_json::Value>,
}

impl Default for SanitizeConfig {
    fn default() -> Self {
        Self {
            allow_unicode: default_true(),
            escape_html: false,
            compress_whitespace: default_true(),
            remove_specials: RemoveSpecials::default(),
            log_suspicious: default_true(),
            max_length: default_max_length(),
            context: None,
        }
    }
}

impl SanitizeConfig {
    pub fn with_allow_unicode(mut self, allow: bool) -> Self {
        self.allow_unicode = allow;
        self
    }

    pub fn with_escape_html(mut self, escape: bool) -> Self {
        self.escape_html = escape;
        self
    }

    pub fn with_compress_whitespace(mut self, compress: bool) -> Self {
        self.compress_whitespace = compress;
        self
    }

    pub fn with_remove_specials(mut self, policy: RemoveSpecials) -> Self {
        self.remove_specials = policy;
        self
    }

    pub fn with_log_suspicious(mut self, log: bool) -> Self {
        self.log_suspicious = log;
        self
    }

    pub fn with_max_length(mut self, max_length: usize) -> Self {
        self.max_length = max_length;
        self
    }

    pub fn with_context(mut self, context: serde_json::Value) -> Self {
        self.context = Some(context);
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_length == 0 {
            return Err(ConfigError::InvalidMaxLength);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Thresholds
// ---------------------------------------------------------------------------

/// Score cut-offs used to turn a score into a [`crate::Verdict`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Thresholds {
    #[serde(default = "default_flag_threshold")]
    pub flag: u32,
    #[serde(default = "default_block_threshold")]
    pub block: u32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            flag: default_flag_threshold(),
            block: default_block_threshold(),
        }
    }
}

impl Thresholds {
    pub fn new(flag: u32, block: u32) -> Result<Self, ConfigError> {
        let thresholds = Self { flag, block };
        thresholds.validate()?;
        Ok(thresholds)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.flag == 0 || self.flag > self.block {
            return Err(ConfigError::InvalidThresholds {
                flag: self.flag,
                block: self.block,
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Default-value functions used by serde
// ---------------------------------------------------------------------------

fn default_true() -> bool {
    true
}

fn default_max_length() -> usize {
    5000
}

fn default_flag_threshold() -> u32 {
    3
}

fn default_block_threshold() -> u32 {
    5
}
