//! Detection rule table.
//!
//! Contains the static catalogue of weighted regex rules used to score
//! untrusted text. Each entry carries a stable identifier, a
//! [`ThreatCategory`] for grouping/reporting, a severity weight, the
//! human-readable description that ends up in audit records, and a regex
//! string compiled at scorer-construction time.
//!
//! Every rule that matches contributes its full severity exactly once; the
//! descending-severity order only decides which indicator is reported first.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Category
// ---------------------------------------------------------------------------

/// Broad classification of the attack technique a rule targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreatCategory {
    SqlInjection,
    CrossSiteScripting,
    CommandInjection,
    PathTraversal,
    /// Single characters that only matter in combination.
    DangerousCharacters,
    /// Latin text mixed with a look-alike script.
    Homoglyph,
    /// Synthetic boosts fired by co-occurring weak signals.
    Contextual,
}

impl fmt::Display for ThreatCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SqlInjection => write!(f, "sql_injection"),
            Self::CrossSiteScripting => write!(f, "cross_site_scripting"),
            Self::CommandInjection => write!(f, "command_injection"),
            Self::PathTraversal => write!(f, "path_traversal"),
            Self::DangerousCharacters => write!(f, "dangerous_characters"),
            Self::Homoglyph => write!(f, "homoglyph"),
            Self::Contextual => write!(f, "contextual"),
        }
    }
}

// ---------------------------------------------------------------------------
// Rule definition
// ---------------------------------------------------------------------------

/// A single weighted detection rule.
#[derive(Debug)]
pub struct DetectionRule {
    /// Short, snake_case identifier used in match records.
    pub id: &'static str,
    pub category: ThreatCategory,
    /// Weight added to the total score when the rule fires.
    pub severity: u32,
    /// Label shown in logs and audit records.
    pub description: &'static str,
    /// Regex source. Compiled case-insensitive with `.` matching newlines.
    pub pattern: &'static str,
}

// ---------------------------------------------------------------------------
// Synthetic rules
// ---------------------------------------------------------------------------

/// Identifier recorded when a SQL signal and a comment marker co-occur.
pub const CONTEXTUAL_BOOST_ID: &str = "contextual_boost";
pub const CONTEXTUAL_BOOST_WEIGHT: u32 = 2;
pub const CONTEXTUAL_BOOST_DESCRIPTION: &str = "-- + SQL keyword boost";

/// Narrower than the `sql_keyword` rule: `truncate` and `union` do not
/// count towards the boost.
pub const BOOST_KEYWORD_PATTERN: &str = r"\b(update|drop|select|insert|delete)\b";
pub const BOOST_COMMENT_PATTERN: &str = r"--|#|/\*";

/// Identifier recorded when Latin text is mixed with a confusable script.
pub const MIXED_SCRIPT_ID: &str = "mixed_script";
pub const MIXED_SCRIPT_WEIGHT: u32 = 3;
pub const MIXED_SCRIPT_DESCRIPTION: &str = "Possible homoglyph attack (mixed scripts)";

/// Rule whose match also satisfies the SQL side of the contextual boost.
pub(crate) const TAUTOLOGY_ID: &str = "sql_tautology";

// ---------------------------------------------------------------------------
// Rule catalogue
// ---------------------------------------------------------------------------

/// The built-in rule table, ordered by descending severity.
pub static RULES: &[DetectionRule] = &[
    // ---- severity 4 ----------------------------------------------------
    DetectionRule {
        id: "sql_clause",
        category: ThreatCategory::SqlInjection,
        severity: 4,
        description: "SQL clause structure",
        pattern: r"\b(select|union).+?(from|where|join)",
    },
    DetectionRule {
        id: TAUTOLOGY_ID,
        category: ThreatCategory::SqlInjection,
        severity: 4,
        description: "Classic SQLi tautology",
        pattern: r#"('|")\s*(or|and)\s*['"]?(1|a|a')\s*=\s*['"]?(1|a|a')"#,
    },
    DetectionRule {
        id: "sql_stacked_command",
        category: ThreatCategory::SqlInjection,
        severity: 4,
        description: "Stacked query + dangerous command",
        pattern: r";\s*(drop|delete|shutdown|exec|system|cmd)",
    },
    DetectionRule {
        id: "script_tag",
        category: ThreatCategory::CrossSiteScripting,
        severity: 4,
        description: "Script tag",
        pattern: r"<script[^>]*>.*?</script>",
    },
    DetectionRule {
        id: "script_uri",
        category: ThreatCategory::CrossSiteScripting,
        severity: 4,
        description: "JavaScript URI",
        pattern: r"(javascript|vbscript)\s*:",
    },
    DetectionRule {
        id: "malicious_embed",
        category: ThreatCategory::CrossSiteScripting,
        severity: 4,
        description: "Malicious iframe/img",
        pattern: r"<iframe|<img.*?onerror",
    },
    DetectionRule {
        id: "command_injection",
        category: ThreatCategory::CommandInjection,
        severity: 4,
        description: "Command injection",
        pattern: r";\s*(rm|cat|ls|ps|whoami|nc|bash|sh)\b",
    },
    // ---- severity 3 ----------------------------------------------------
    DetectionRule {
        id: "sql_comment",
        category: ThreatCategory::SqlInjection,
        severity: 3,
        description: "SQL comment",
        pattern: r"--|#|/\*.*?\*/",
    },
    DetectionRule {
        id: "event_handler",
        category: ThreatCategory::CrossSiteScripting,
        severity: 3,
        description: "HTML event handler",
        pattern: r"on\w+\s*=",
    },
    DetectionRule {
        id: "command_with_flags",
        category: ThreatCategory::CommandInjection,
        severity: 3,
        description: "Suspicious command with flags",
        pattern: r"(rm|cat|ls|ps|whoami|nc|bash|sh)\s*[-/]",
    },
    DetectionRule {
        id: "path_traversal",
        category: ThreatCategory::PathTraversal,
        severity: 3,
        description: "Path traversal",
        pattern: r"\.\./|\.\.\\",
    },
    // ---- severity 2 ----------------------------------------------------
    DetectionRule {
        id: "sql_keyword",
        category: ThreatCategory::SqlInjection,
        severity: 2,
        description: "SQL keyword",
        pattern: r"\b(select|insert|update|delete|drop|truncate|union)\b",
    },
    DetectionRule {
        id: "angle_brackets",
        category: ThreatCategory::DangerousCharacters,
        severity: 2,
        description: "HTML angle brackets",
        pattern: r"[<>]",
    },
    DetectionRule {
        id: "shell_metacharacters",
        category: ThreatCategory::DangerousCharacters,
        severity: 2,
        description: "Shell metacharacters",
        pattern: r"[;&|`$]",
    },
    // ---- severity 1 ----------------------------------------------------
    DetectionRule {
        id: "quotes",
        category: ThreatCategory::DangerousCharacters,
        severity: 1,
        description: "Quotes (low severity alone)",
        pattern: r#"["']"#,
    },
];

/// Look up a rule by identifier.
pub fn rule(id: &str) -> Option<&'static DetectionRule> {
    RULES.iter().find(|r| r.id == id)
}
