//! # input-guard
//!
//! Heuristic risk scoring and cleanup for untrusted request text. Given a
//! string typed by a user, it detects indicators of SQL injection,
//! cross-site scripting, command injection, path traversal and
//! mixed-script spoofing, returns a score with the list of indicators that
//! fired, and produces a cleaned copy of the string.
//!
//! This is a second line of defense. Output encoding and parameterized
//! queries stay the caller's job.
//!
//! The crate is organised in layers:
//!
//! 1. **[`rules`]** -- static table of weighted regex rules, grouped by
//!    [`ThreatCategory`](rules::ThreatCategory).
//! 2. **[`normalize`]** -- percent and HTML entity decoding so encoded
//!    payloads score like their decoded form.
//! 3. **[`scorer`]** -- compiles the rules into a [`RegexSet`](regex::RegexSet),
//!    applies the contextual SQL boost and the mixed-script signal.
//! 4. **[`transform`]** -- the configurable cleanup pipeline.
//! 5. **[`engine`]** -- [`InputGuard`], which ties the above together and
//!    reports suspicious inputs to an [`audit_log::AuditSink`].
//!
//! ## Quick start
//!
//! ```rust
//! use input_guard::{InputGuard, RemoveSpecials, SanitizeConfig, Verdict};
//!
//! let guard = InputGuard::new().unwrap();
//! let config = SanitizeConfig::default().with_remove_specials(RemoveSpecials::Strict);
//! let result = guard.evaluate_and_clean("' OR 1=1 --", &config).unwrap();
//! assert_eq!(result.verdict(guard.thresholds()), Verdict::Block);
//! ```

pub mod config;
pub mod engine;
pub mod normalize;
pub mod rules;
pub mod scorer;
pub mod script_mix;
pub mod transform;
mod verdict;

// Re-export the most commonly used types at the crate root for ergonomic
// imports (`use input_guard::InputGuard`).
pub use config::{ConfigError, RemoveSpecials, SanitizeConfig, Thresholds};
pub use engine::{GuardError, InputGuard, SanitizeResult};
pub use normalize::normalize;
pub use rules::{DetectionRule, ThreatCategory, RULES};
pub use scorer::{score, score_input, MatchRecord, ScoreResult, Scorer, ScorerError};
pub use script_mix::{detect_script_mix, ConfusableScript, ScriptMixDetector};
pub use transform::sanitize;
pub use verdict::Verdict;
