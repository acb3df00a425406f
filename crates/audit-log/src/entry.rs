use serde::{Deserialize, Serialize};

/// Longest escaped input (in characters) stored in a single audit record.
pub const MAX_LOGGED_INPUT_CHARS: usize = 512;

/// A single audit log entry representing an event in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: uuid::Uuid,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub level: AuditLevel,
    pub event_type: AuditEventType,
    pub source: AuditSource,
    pub details: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suspicious_input: Option<SuspiciousInputRecord>,
}

impl AuditEntry {
    /// Create a new `AuditEntry` with an auto-generated UUID v4 and the current
    /// UTC timestamp. The level is derived from the event type;
    /// `suspicious_input` defaults to `None`.
    pub fn new(
        event_type: AuditEventType,
        source: AuditSource,
        details: serde_json::Value,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            timestamp: chrono::Utc::now(),
            level: event_type.default_level(),
            event_type,
            source,
            details,
            suspicious_input: None,
        }
    }

    /// Build a [`AuditEventType::SuspiciousInput`] entry around `record`.
    pub fn suspicious(source: AuditSource, record: SuspiciousInputRecord) -> Self {
        Self::new(
            AuditEventType::SuspiciousInput,
            source,
            serde_json::Value::Null,
        )
        .with_suspicious_input(record)
    }

    /// Attach a suspicious-input record to this entry, consuming and
    /// returning `self` for builder-style usage.
    pub fn with_suspicious_input(mut self, record: SuspiciousInputRecord) -> Self {
        self.suspicious_input = Some(record);
        self
    }
}

/// Severity of an audit record, rendered the way log levels are.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AuditLevel {
    Info,
    Warning,
}

/// The category of audit event being recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    SuspiciousInput,
    InputTruncated,
    ProcessStarted,
    ProcessStopped,
}

impl AuditEventType {
    fn default_level(self) -> AuditLevel {
        match self {
            Self::SuspiciousInput => AuditLevel::Warning,
            Self::InputTruncated | Self::ProcessStarted | Self::ProcessStopped => {
                AuditLevel::Info
            }
        }
    }
}

/// Identifies the component and optional caller-supplied correlation
/// metadata for the event source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditSource {
    pub component: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<serde_json::Value>,
}

impl AuditSource {
    /// Convenience constructor that only requires the component name.
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            context: None,
        }
    }

    /// Attach free-form correlation metadata (request id, field name, ...).
    pub fn with_context(mut self, context: Option<serde_json::Value>) -> Self {
        self.context = context;
        self
    }
}

/// What gets recorded about an input that scored above zero.
///
/// Only rule descriptions are stored, never the raw regex patterns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuspiciousInputRecord {
    /// Escaped, length-capped copy of the input. Never contains a raw
    /// newline, carriage return or other control character.
    pub input: String,
    /// `true` when the escaped input was cut at [`MAX_LOGGED_INPUT_CHARS`].
    pub input_truncated: bool,
    pub score: u32,
    pub matches: Vec<String>,
}

impl SuspiciousInputRecord {
    /// Escape `raw` for single-line storage and capture the score and match
    /// descriptions.
    pub fn new(raw: &str, score: u32, matches: Vec<String>) -> Self {
        let mut input = escape_for_log(raw);
        let cut = input
            .char_indices()
            .nth(MAX_LOGGED_INPUT_CHARS)
            .map(|(idx, _)| idx);
        let input_truncated = cut.is_some();
        if let Some(idx) = cut {
            input.truncate(idx);
        }
        Self {
            input,
            input_truncated,
            score,
            matches,
        }
    }
}

/// Render attacker-controlled text so it cannot start a new log line.
///
/// Newlines, carriage returns and tabs become the two-character sequences
/// `\n`, `\r` and `\t`; other control characters become `\u{..}`. Backslashes
/// and quotes are escaped as well so the mapping stays unambiguous.
pub fn escape_for_log(raw: &str) -> String {
    raw.escape_debug().to_string()
}
