//! Append-only structured JSON-lines audit logging for input-guard.
//!
//! Every suspicious evaluation is serialised as a single newline-terminated
//! JSON object and appended to a log file, producing a
//! [JSON Lines](https://jsonlines.org/) stream. Attacker-controlled text is
//! escaped before it is stored so that it can never introduce a line break
//! of its own.
//!
//! The sink is constructed once by the hosting application and handed to
//! whatever needs it; there is no global logger.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use audit_log::{AuditEntry, AuditSink, AuditSource, SuspiciousInputRecord};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let (sink, _handle) = AuditSink::start("/var/log/input-guard/audit.jsonl").await?;
//!
//! sink.record(AuditEntry::suspicious(
//!     AuditSource::new("signup-form"),
//!     SuspiciousInputRecord::new("'; DROP TABLE users --", 13, vec!["SQL comment".into()]),
//! ));
//! # Ok(())
//! # }
//! ```

pub mod entry;
pub mod sink;
pub mod writer;

// Re-export primary public types at the crate root for convenience.
pub use entry::{
    escape_for_log, AuditEntry, AuditEventType, AuditLevel, AuditSource, SuspiciousInputRecord,
    MAX_LOGGED_INPUT_CHARS,
};
pub use sink::AuditSink;
pub use writer::{render_line, AuditWriteError, AuditWriter};
