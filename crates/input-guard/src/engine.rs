//! The `InputGuard` engine: score, audit and clean one untrusted string.

use audit_log::{AuditEntry, AuditEventType, AuditSink, AuditSource, SuspiciousInputRecord};
use serde::Serialize;
use tracing::{info, warn};

use crate::config::{ConfigError, SanitizeConfig, Thresholds};
use crate::scorer::{MatchRecord, ScoreResult, Scorer, ScorerError};
use crate::script_mix::ScriptMixDetector;
use crate::transform::{sanitize, truncate_chars};
use crate::verdict::Verdict;

/// Component name used in audit records unless overridden.
const DEFAULT_COMPONENT: &str = "input-guard";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum GuardError {
    #[error(transparent)]
    Scorer(#[from] ScorerError),

    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

// ---------------------------------------------------------------------------
// Result
// ---------------------------------------------------------------------------

/// The outcome of [`InputGuard::evaluate_and_clean`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SanitizeResult {
    cleaned_text: String,
    total_score: u32,
    matches: Vec<MatchRecord>,
    truncated: bool,
}

impl SanitizeResult {
    fn new(cleaned_text: String, score: ScoreResult, truncated: bool) -> Self {
        Self {
            cleaned_text,
            total_score: score.total_score(),
            matches: score.into_matches(),
            truncated,
        }
    }

    fn empty() -> Self {
        Self::new(String::new(), ScoreResult::default(), false)
    }

    pub fn cleaned_text(&self) -> &str {
        &self.cleaned_text
    }

    pub fn total_score(&self) -> u32 {
        self.total_score
    }

    pub fn matches(&self) -> &[MatchRecord] {
        &self.matches
    }

    /// `true` when the input was cut to `max_length` before evaluation.
    pub fn truncated(&self) -> bool {
        self.truncated
    }

    pub fn has_findings(&self) -> bool {
        !self.matches.is_empty()
    }

    pub fn verdict(&self, thresholds: &Thresholds) -> Verdict {
        thresholds.classify(self.total_score)
    }

    pub fn into_parts(self) -> (String, u32, Vec<MatchRecord>) {
        (self.cleaned_text, self.total_score, self.matches)
    }
}

// ---------------------------------------------------------------------------
// InputGuard
// ---------------------------------------------------------------------------

/// Main entry point. Build one at startup and share it; evaluation takes
/// `&self` and touches no mutable state apart from the audit channel.
///
/// # Example
///
/// ```rust
/// use input_guard::{InputGuard, SanitizeConfig};
///
/// let guard = InputGuard::new().unwrap();
/// let result = guard
///     .evaluate_and_clean(r#"<script>alert("XSS")</script>"#, &SanitizeConfig::default())
///     .unwrap();
/// assert!(result.total_score() >= 4);
/// assert!(!result.cleaned_text().contains('<'));
/// ```
pub struct InputGuard {
    scorer: Scorer,
    audit: Option<AuditSink>,
    thresholds: Thresholds,
    component: String,
}

impl InputGuard {
    /// Engine with the built-in rules, no audit sink and default thresholds.
    pub fn new() -> Result<Self, GuardError> {
        Ok(Self {
            scorer: Scorer::new()?,
            audit: None,
            thresholds: Thresholds::default(),
            component: DEFAULT_COMPONENT.to_string(),
        })
    }

    /// Send suspicious evaluations to `sink`.
    pub fn with_audit(mut self, sink: AuditSink) -> Self {
        self.audit = Some(sink);
        self
    }

    pub fn with_thresholds(mut self, thresholds: Thresholds) -> Result<Self, GuardError> {
        thresholds.validate()?;
        self.thresholds = thresholds;
        Ok(self)
    }

    /// Replace the confusable script set used for mixed-script detection.
    pub fn with_script_mix(mut self, detector: ScriptMixDetector) -> Result<Self, GuardError> {
        self.scorer = Scorer::with_script_mix(detector)?;
        Ok(self)
    }

    /// Component name written into audit records.
    pub fn with_component(mut self, component: impl Into<String>) -> Self {
        self.component = component.into();
        self
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    /// Score, audit and clean `text`.
    ///
    /// The only error is an invalid `config`; any string input succeeds.
    pub fn evaluate_and_clean(
        &self,
        text: &str,
        config: &SanitizeConfig,
    ) -> Result<SanitizeResult, GuardError> {
        config.validate()?;

        let original = text.trim();
        if original.is_empty() {
            return Ok(SanitizeResult::empty());
        }

        let (original, truncated) = truncate_chars(original, config.max_length);
        if truncated {
            self.audit_truncation(text.trim().chars().count(), config);
        }

        let score = self.scorer.score_input(original);

        if config.log_suspicious && score.total_score() > 0 {
            self.audit_suspicious(original, &score, config);
        }

        let cleaned = sanitize(original, config);
        Ok(SanitizeResult::new(cleaned, score, truncated))
    }

    /// Like [`evaluate_and_clean`](Self::evaluate_and_clean) for a value that
    /// may be absent (e.g. a missing form field). `None` yields an empty,
    /// zero-score result.
    pub fn evaluate_field(
        &self,
        text: Option<&str>,
        config: &SanitizeConfig,
    ) -> Result<SanitizeResult, GuardError> {
        match text {
            Some(text) => self.evaluate_and_clean(text, config),
            None => {
                config.validate()?;
                Ok(SanitizeResult::empty())
            }
        }
    }

    /// Risk evaluation only: normalization, rules, boost and script mixing.
    pub fn score(&self, text: &str) -> ScoreResult {
        self.scorer.score_input(text.trim())
    }

    /// Cleanup only; the score plays no part. Rejects the same invalid
    /// configurations as [`evaluate_and_clean`](Self::evaluate_and_clean).
    pub fn sanitize(&self, text: &str, config: &SanitizeConfig) -> Result<String, GuardError> {
        config.validate()?;
        Ok(sanitize(text, config))
    }

    fn audit_truncation(&self, input_chars: usize, config: &SanitizeConfig) {
        info!(
            component = %self.component,
            max_length = config.max_length,
            input_chars,
            "oversized input truncated"
        );

        if let Some(sink) = &self.audit {
            let source = AuditSource::new(self.component.clone()).with_context(config.context.clone());
            sink.record(AuditEntry::new(
                AuditEventType::InputTruncated,
                source,
                serde_json::json!({
                    "max_length": config.max_length,
                    "input_chars": input_chars,
                }),
            ));
        }
    }

    fn audit_suspicious(&self, original: &str, score: &ScoreResult, config: &SanitizeConfig) {
        let record = SuspiciousInputRecord::new(original, score.total_score(), score.descriptions());

        warn!(
            component = %self.component,
            input = %record.input,
            score = record.score,
            matches = ?record.matches,
            context = ?config.context,
            "suspicious input detected"
        );

        if let Some(sink) = &self.audit {
            let source = AuditSource::new(self.component.clone()).with_context(config.context.clone());
            sink.record(AuditEntry::suspicious(source, record));
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RemoveSpecials;
    use audit_log::AuditLevel;
    use tokio::sync::mpsc;

    fn guard() -> InputGuard {
        InputGuard::new().unwrap()
    }

    fn defaults() -> SanitizeConfig {
        SanitizeConfig::default()
    }

    fn descriptions(result: &SanitizeResult) -> Vec<&str> {
        result.matches().iter().map(|m| m.description.as_str()).collect()
    }

    fn capturing_guard(buffer: usize) -> (InputGuard, mpsc::Receiver<AuditEntry>) {
        let (tx, rx) = mpsc::channel(buffer);
        (guard().with_audit(AuditSink::from_sender(tx)), rx)
    }

    // -- detection --------------------------------------------------------

    #[test]
    fn xss_script_tag() {
        let result = guard()
            .evaluate_and_clean(r#"<script>alert("XSS")</script>"#, &defaults())
            .unwrap();
        assert!(result.total_score() >= 4);
        assert!(descriptions(&result).contains(&"Script tag"));
        assert!(!result.cleaned_text().contains('<'));
        assert!(!result.cleaned_text().contains('>'));
    }

    #[test]
    fn sql_classic_tautology() {
        let result = guard().evaluate_and_clean("' OR 1=1 --", &defaults()).unwrap();
        assert!(result.total_score() >= 6);
        let descs = descriptions(&result);
        assert!(descs.contains(&"Classic SQLi tautology"));
        assert!(descs.contains(&"-- + SQL keyword boost"));
    }

    #[test]
    fn command_injection() {
        let result = guard().evaluate_and_clean("; rm -rf /", &defaults()).unwrap();
        assert!(result.total_score() >= 4);
        assert!(descriptions(&result).contains(&"Command injection"));
    }

    #[test]
    fn path_traversal() {
        let result = guard()
            .evaluate_and_clean("../../../etc/passwd", &defaults())
            .unwrap();
        assert!(result.total_score() >= 3);
        assert!(descriptions(&result).contains(&"Path traversal"));
    }

    #[test]
    fn html_event_handler() {
        let result = guard()
            .evaluate_and_clean(r#"<img src="x" onerror="alert(1)">"#, &defaults())
            .unwrap();
        assert!(result.total_score() >= 5);
        assert!(descriptions(&result).contains(&"HTML event handler"));
        assert!(!result.cleaned_text().contains('<'));
    }

    #[test]
    fn javascript_uri() {
        let result = guard()
            .evaluate_and_clean("javascript:alert(1)", &defaults())
            .unwrap();
        assert!(result.total_score() >= 4);
        assert!(descriptions(&result).contains(&"JavaScript URI"));
    }

    #[test]
    fn encoded_payload_is_scored_but_output_keeps_literal_text() {
        let result = guard()
            .evaluate_and_clean("100%25 sure &lt;script&gt;x&lt;/script&gt;", &defaults())
            .unwrap();
        assert!(descriptions(&result).contains(&"Script tag"));
        // Balanced strips `&` and `;` from the literal entities, but the
        // percent escape is not decoded into the output.
        assert!(result.cleaned_text().starts_with("100%25 sure"));
    }

    #[test]
    fn benign_text_scores_one() {
        let result = guard()
            .evaluate_and_clean("I'm just saying hello, world!", &defaults())
            .unwrap();
        assert_eq!(result.total_score(), 1);
        assert_eq!(result.matches().len(), 1);
        assert_eq!(result.cleaned_text(), "I'm just saying hello, world!");
    }

    // -- unicode and scripts ---------------------------------------------

    #[test]
    fn lithuanian_text_is_clean_and_preserved() {
        let text = "Ąžuolas, Čiurlionis, Širvintos, Ūla";
        for allow in [true, false] {
            let cfg = defaults().with_allow_unicode(allow);
            let result = guard().evaluate_and_clean(text, &cfg).unwrap();
            assert_eq!(result.total_score(), 0);
            assert!(result.matches().is_empty());
            for letter in "ąčęėįšųūžĄČĘĖĮŠŲŪŽ".chars() {
                if text.contains(letter) {
                    assert!(
                        result.cleaned_text().contains(letter),
                        "Lithuanian letter '{letter}' was not preserved"
                    );
                }
            }
        }
    }

    #[test]
    fn mixed_script_detection() {
        let result = guard()
            .evaluate_and_clean("\u{0440}aypal.com", &defaults())
            .unwrap();
        assert!(result.total_score() >= 3);
        assert!(result
            .matches()
            .iter()
            .any(|m| m.description.contains("homoglyph")));
    }

    #[test]
    fn greek_with_latin_is_flagged() {
        let result = guard().evaluate_and_clean("Δ = b² - 4ac", &defaults()).unwrap();
        assert!(result.total_score() >= 3);
    }

    #[test]
    fn arabic_detection_is_configurable() {
        let text = "admin\u{0627}";
        assert_eq!(guard().score(text).total_score(), 0);
        let with_arabic = guard()
            .with_script_mix(ScriptMixDetector::default().with_arabic())
            .unwrap();
        assert_eq!(with_arabic.score(text).total_score(), 3);
    }

    // -- options ------------------------------------------------------------

    #[test]
    fn remove_specials_none() {
        let cfg = defaults().with_remove_specials(RemoveSpecials::None);
        let result = guard()
            .evaluate_and_clean(r#"He said: "rm -rf /""#, &cfg)
            .unwrap();
        assert_eq!(result.cleaned_text(), r#"He said: "rm -rf /""#);
        assert!(result.total_score() >= 4);
    }

    #[test]
    fn remove_specials_strict() {
        let cfg = defaults().with_remove_specials(RemoveSpecials::Strict);
        let result = guard().evaluate_and_clean(r#""; DROP TABLE --"#, &cfg).unwrap();
        for c in ['"', ';', '\\', '<', '>'] {
            assert!(!result.cleaned_text().contains(c));
        }
    }

    #[test]
    fn oversized_input_is_truncated_before_scoring() {
        let mut text = "a".repeat(20);
        text.push_str("<script>alert(1)</script>");
        let cfg = defaults().with_max_length(20);

        let result = guard().evaluate_and_clean(&text, &cfg).unwrap();
        assert!(result.truncated());
        assert_eq!(result.total_score(), 0);
        assert_eq!(result.cleaned_text(), "a".repeat(20));
    }

    #[test]
    fn sanitize_rejects_the_same_configs_as_evaluate() {
        let g = guard();
        let bad = defaults().with_max_length(0);
        assert!(matches!(
            g.sanitize("hello", &bad),
            Err(GuardError::Config(ConfigError::InvalidMaxLength))
        ));
        assert_eq!(g.sanitize("  hello;  ", &defaults()).unwrap(), "hello");
    }

    #[test]
    fn invalid_config_fails_fast() {
        let cfg = defaults().with_max_length(0);
        let err = guard().evaluate_and_clean("hello", &cfg).unwrap_err();
        assert!(matches!(err, GuardError::Config(ConfigError::InvalidMaxLength)));
        assert!(guard().evaluate_field(None, &cfg).is_err());
    }

    // -- empty input --------------------------------------------------------

    #[test]
    fn empty_missing_and_blank_inputs() {
        let g = guard();
        for result in [
            g.evaluate_and_clean("", &defaults()).unwrap(),
            g.evaluate_and_clean("   \t\n   ", &defaults()).unwrap(),
            g.evaluate_field(None, &defaults()).unwrap(),
        ] {
            assert_eq!(result.cleaned_text(), "");
            assert_eq!(result.total_score(), 0);
            assert!(result.matches().is_empty());
        }
    }

    // -- invariants ---------------------------------------------------------

    #[test]
    fn total_is_sum_of_match_severities() {
        let inputs = [
            "' OR 1=1; DROP TABLE users--",
            "UPDATE users SET pwd='123'--",
            "<iframe src=javascript:alert(1)>",
            "\u{0440}aypal.com/../../etc/passwd",
            "plain",
        ];
        let g = guard();
        for text in inputs {
            let result = g.evaluate_and_clean(text, &defaults()).unwrap();
            let sum: u32 = result.matches().iter().map(|m| m.severity).sum();
            assert_eq!(result.total_score(), sum, "for {text:?}");
        }
    }

    #[test]
    fn verdict_uses_thresholds() {
        let g = guard();
        let t = *g.thresholds();
        let quote = g.evaluate_and_clean("it's", &defaults()).unwrap();
        assert_eq!(quote.verdict(&t), Verdict::Allow);
        let traversal = g.evaluate_and_clean("../x", &defaults()).unwrap();
        assert_eq!(traversal.verdict(&t), Verdict::Flag);
        let sqli = g.evaluate_and_clean("' OR 1=1 --", &defaults()).unwrap();
        assert_eq!(sqli.verdict(&t), Verdict::Block);
    }

    #[test]
    fn rejects_invalid_thresholds() {
        assert!(guard().with_thresholds(Thresholds { flag: 9, block: 2 }).is_err());
    }

    // -- audit ----------------------------------------------------------------

    #[test]
    fn suspicious_input_is_audited_with_escaped_text() {
        let (g, mut rx) = capturing_guard(8);
        let cfg = defaults().with_context(serde_json::json!({"field": "todo"}));
        g.evaluate_and_clean("Hello\nDROP TABLE;\r\n--", &cfg).unwrap();

        let entry = rx.try_recv().expect("audit entry");
        assert_eq!(entry.event_type, AuditEventType::SuspiciousInput);
        assert_eq!(entry.source.component, "input-guard");
        assert_eq!(entry.source.context.as_ref().unwrap()["field"], "todo");

        let record = entry.suspicious_input.as_ref().unwrap();
        assert!(!record.input.contains('\n'));
        assert!(!record.input.contains('\r'));
        assert!(record.input.contains("\\n"));
        assert!(record.input.contains("\\r"));
        assert!(record.matches.contains(&"SQL comment".to_string()));
        assert!(record.score > 0);

        let line = String::from_utf8(audit_log::render_line(&entry).unwrap()).unwrap();
        assert_eq!(line.trim_end_matches('\n').find(['\n', '\r']), None);
    }

    #[test]
    fn truncation_is_audited_as_info() {
        let (g, mut rx) = capturing_guard(8);
        let cfg = defaults()
            .with_max_length(10)
            .with_context(serde_json::json!({"field": "comment"}));
        g.evaluate_and_clean(&"b".repeat(25), &cfg).unwrap();

        let entry = rx.try_recv().expect("truncation entry");
        assert_eq!(entry.event_type, AuditEventType::InputTruncated);
        assert_eq!(entry.level, AuditLevel::Info);
        assert_eq!(entry.details["max_length"], 10);
        assert_eq!(entry.details["input_chars"], 25);
        assert_eq!(entry.source.context.as_ref().unwrap()["field"], "comment");
        assert!(entry.suspicious_input.is_none());

        // The kept prefix is clean, so nothing else is recorded.
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn clean_input_is_not_audited() {
        let (g, mut rx) = capturing_guard(8);
        g.evaluate_and_clean("good morning", &defaults()).unwrap();
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn audit_can_be_disabled_per_call() {
        let (g, mut rx) = capturing_guard(8);
        let cfg = defaults().with_log_suspicious(false);
        g.evaluate_and_clean("; rm -rf /", &cfg).unwrap();
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn audit_failure_does_not_affect_result() {
        let (g, rx) = capturing_guard(1);
        drop(rx);
        let result = g.evaluate_and_clean("; rm -rf /", &defaults()).unwrap();
        assert!(result.total_score() >= 4);
        assert_eq!(result.cleaned_text(), " rm -rf /");
    }

    #[test]
    fn audit_records_descriptions_not_patterns() {
        let (g, mut rx) = capturing_guard(8);
        g.evaluate_and_clean("../etc", &defaults()).unwrap();
        let record = rx.try_recv().unwrap().suspicious_input.unwrap();
        assert_eq!(record.matches, vec!["Path traversal".to_string()]);
    }
}
