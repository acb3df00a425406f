//! Risk scorer: evaluates the rule table against text and accumulates a
//! score with an auditable list of matches.

use std::sync::LazyLock;

use regex::{Regex, RegexBuilder, RegexSet, RegexSetBuilder};
use serde::Serialize;

use crate::normalize::normalize;
use crate::rules::{
    DetectionRule, ThreatCategory, BOOST_COMMENT_PATTERN, BOOST_KEYWORD_PATTERN,
    CONTEXTUAL_BOOST_DESCRIPTION, CONTEXTUAL_BOOST_ID, CONTEXTUAL_BOOST_WEIGHT,
    MIXED_SCRIPT_DESCRIPTION, MIXED_SCRIPT_ID, MIXED_SCRIPT_WEIGHT, RULES, TAUTOLOGY_ID,
};
use crate::script_mix::ScriptMixDetector;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur while constructing a [`Scorer`].
#[derive(Debug, thiserror::Error)]
pub enum ScorerError {
    #[error("failed to compile regex pattern: {0}")]
    RegexCompile(#[from] regex::Error),
}

// ---------------------------------------------------------------------------
// MatchRecord / ScoreResult
// ---------------------------------------------------------------------------

/// One rule (or synthetic boost) that fired for an input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchRecord {
    pub rule_id: String,
    pub category: ThreatCategory,
    pub severity: u32,
    pub description: String,
}

impl MatchRecord {
    fn from_rule(rule: &DetectionRule) -> Self {
        Self {
            rule_id: rule.id.to_string(),
            category: rule.category,
            severity: rule.severity,
            description: rule.description.to_string(),
        }
    }

    fn contextual_boost() -> Self {
        Self {
            rule_id: CONTEXTUAL_BOOST_ID.to_string(),
            category: ThreatCategory::Contextual,
            severity: CONTEXTUAL_BOOST_WEIGHT,
            description: CONTEXTUAL_BOOST_DESCRIPTION.to_string(),
        }
    }

    fn mixed_script() -> Self {
        Self {
            rule_id: MIXED_SCRIPT_ID.to_string(),
            category: ThreatCategory::Homoglyph,
            severity: MIXED_SCRIPT_WEIGHT,
            description: MIXED_SCRIPT_DESCRIPTION.to_string(),
        }
    }
}

/// Total score plus the matches it was summed from.
///
/// Matches can only be added through [`ScoreResult::push`], which keeps
/// `total_score` equal to the sum of match severities.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScoreResult {
    total_score: u32,
    matches: Vec<MatchRecord>,
}

impl ScoreResult {
    pub fn push(&mut self, record: MatchRecord) {
        self.total_score += record.severity;
        self.matches.push(record);
    }

    pub fn total_score(&self) -> u32 {
        self.total_score
    }

    pub fn matches(&self) -> &[MatchRecord] {
        &self.matches
    }

    /// Match descriptions, in match order.
    pub fn descriptions(&self) -> Vec<String> {
        self.matches.iter().map(|m| m.description.clone()).collect()
    }

    pub fn is_clean(&self) -> bool {
        self.matches.is_empty()
    }

    pub fn has_rule(&self, rule_id: &str) -> bool {
        self.matches.iter().any(|m| m.rule_id == rule_id)
    }

    pub fn into_matches(self) -> Vec<MatchRecord> {
        self.matches
    }
}

// ---------------------------------------------------------------------------
// Scorer
// ---------------------------------------------------------------------------

/// Compiled scorer backed by a [`RegexSet`]. Only rule presence matters, so
/// a single set query tells us every rule that fired.
pub struct Scorer {
    regex_set: RegexSet,
    boost_keyword: Regex,
    boost_comment: Regex,
    script_mix: ScriptMixDetector,
}

impl Scorer {
    /// Compile every rule in the table and return a ready-to-use scorer.
    pub fn new() -> Result<Self, ScorerError> {
        Self::with_script_mix(ScriptMixDetector::default())
    }

    /// Like [`Scorer::new`] with a custom set of confusable scripts.
    pub fn with_script_mix(script_mix: ScriptMixDetector) -> Result<Self, ScorerError> {
        let regex_set = RegexSetBuilder::new(RULES.iter().map(|r| r.pattern))
            .case_insensitive(true)
            .dot_matches_new_line(true)
            .build()?;

        let boost_keyword = RegexBuilder::new(BOOST_KEYWORD_PATTERN)
            .case_insensitive(true)
            .build()?;
        let boost_comment = Regex::new(BOOST_COMMENT_PATTERN)?;

        Ok(Self {
            regex_set,
            boost_keyword,
            boost_comment,
            script_mix,
        })
    }

    /// Score `text` as given: base rule pass plus the contextual boost.
    ///
    /// Empty or whitespace-only text scores zero with no matches.
    pub fn score(&self, text: &str) -> ScoreResult {
        let mut result = ScoreResult::default();
        if text.trim().is_empty() {
            return result;
        }

        // SetMatches iterates in ascending index order, which is the
        // table's descending-severity order.
        for idx in self.regex_set.matches(text).into_iter() {
            result.push(MatchRecord::from_rule(&RULES[idx]));
        }

        let has_sql_signal = self.boost_keyword.is_match(text) || result.has_rule(TAUTOLOGY_ID);
        if has_sql_signal && self.boost_comment.is_match(text) {
            result.push(MatchRecord::contextual_boost());
        }

        result
    }

    /// Full risk evaluation of an untrusted input: rules run against the
    /// normalized payload, script mixing is checked on the original text.
    pub fn score_input(&self, original: &str) -> ScoreResult {
        let mut result = self.score(&normalize(original));
        if self.script_mix.detect(original) {
            result.push(MatchRecord::mixed_script());
        }
        result
    }

    /// Number of rules in the compiled set.
    pub fn rule_count(&self) -> usize {
        self.regex_set.len()
    }
}

impl Default for Scorer {
    /// # Panics
    ///
    /// Panics if the built-in rule table fails to compile (covered by the
    /// `all_patterns_compile` test).
    fn default() -> Self {
        Self::new().expect("built-in rules must compile")
    }
}

static DEFAULT_SCORER: LazyLock<Scorer> = LazyLock::new(Scorer::default);

/// Score `text` with the process-wide default scorer (rules and contextual
/// boost only; see [`score_input`] for the full evaluation).
pub fn score(text: &str) -> ScoreResult {
    DEFAULT_SCORER.score(text)
}

/// Full risk evaluation with the process-wide default scorer.
pub fn score_input(original: &str) -> ScoreResult {
    DEFAULT_SCORER.score_input(original)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptions(result: &ScoreResult) -> Vec<String> {
        result.descriptions()
    }

    fn assert_sum_invariant(result: &ScoreResult) {
        let sum: u32 = result.matches().iter().map(|m| m.severity).sum();
        assert_eq!(result.total_score(), sum);
    }

    #[test]
    fn empty_and_blank_text_score_zero() {
        for text in ["", "   ", "\t\n  "] {
            let result = score(text);
            assert_eq!(result.total_score(), 0);
            assert!(result.is_clean());
        }
    }

    #[test]
    fn script_tag() {
        let result = score(r#"<script>alert("XSS")</script>"#);
        assert!(result.total_score() >= 4);
        assert!(descriptions(&result).contains(&"Script tag".to_string()));
        assert_sum_invariant(&result);
    }

    #[test]
    fn tautology_with_comment_gets_boost() {
        let result = score("' OR 1=1 --");
        assert!(result.total_score() >= 6);
        assert!(result.has_rule("sql_tautology"));
        assert!(result.has_rule(CONTEXTUAL_BOOST_ID));
        assert_sum_invariant(&result);
    }

    #[test]
    fn score_accumulation() {
        let result = score("' OR 1=1; DROP TABLE users--");
        assert!(result.total_score() >= 10);
        let descs = descriptions(&result);
        assert!(descs.contains(&"Classic SQLi tautology".to_string()));
        assert!(descs.contains(&"-- + SQL keyword boost".to_string()));
        assert!(descs.contains(&"Stacked query + dangerous command".to_string()));
    }

    #[test]
    fn keyword_and_comment_boost() {
        let result = score("UPDATE users SET pwd='123'--");
        assert!(result.total_score() >= 7);
        assert!(result
            .matches()
            .iter()
            .any(|m| m.description == "-- + SQL keyword boost"));
    }

    #[test]
    fn boost_keywords_are_narrower_than_sql_keyword_rule() {
        let result = score("truncate logs --");
        assert!(result.has_rule("sql_keyword"));
        assert!(result.has_rule("sql_comment"));
        assert!(!result.has_rule(CONTEXTUAL_BOOST_ID));
    }

    #[test]
    fn keyword_alone_does_not_boost() {
        let result = score("please select a colour");
        assert!(result.has_rule("sql_keyword"));
        assert!(!result.has_rule(CONTEXTUAL_BOOST_ID));
    }

    #[test]
    fn command_injection() {
        let result = score("; rm -rf /");
        assert!(result.total_score() >= 4);
        assert!(descriptions(&result).contains(&"Command injection".to_string()));
    }

    #[test]
    fn path_traversal() {
        let result = score("../../../etc/passwd");
        assert!(result.total_score() >= 3);
        assert!(descriptions(&result).contains(&"Path traversal".to_string()));
        assert!(score(r"..\..\windows\system32").has_rule("path_traversal"));
    }

    #[test]
    fn benign_text_only_scores_the_quote() {
        let result = score("I'm just saying hello, world!");
        assert_eq!(result.total_score(), 1);
        assert_eq!(result.matches().len(), 1);
        assert_eq!(result.matches()[0].rule_id, "quotes");
    }

    #[test]
    fn event_handler_and_img() {
        let result = score(r#"<img src="x" onerror="alert(1)">"#);
        assert!(result.total_score() >= 5);
        assert!(result.has_rule("event_handler"));
        assert!(result.has_rule("malicious_embed"));
    }

    #[test]
    fn script_uris() {
        assert!(score("javascript:alert(1)").has_rule("script_uri"));
        assert!(score("VBScript:msgbox(1)").has_rule("script_uri"));
    }

    #[test]
    fn matching_is_case_insensitive_and_spans_lines() {
        let result = score("<SCRIPT>\nalert(1)\n</ScRiPt>");
        assert!(result.has_rule("script_tag"));
        let result = score("SELECT name\nFROM users");
        assert!(result.has_rule("sql_clause"));
    }

    #[test]
    fn repeated_pattern_counts_once() {
        let once = score("../etc");
        let many = score("../../../../etc");
        assert_eq!(once.total_score(), many.total_score());
    }

    #[test]
    fn matches_are_reported_most_severe_first() {
        let result = score("' OR 1=1; DROP TABLE users--");
        let base: Vec<u32> = result
            .matches()
            .iter()
            .filter(|m| m.category != ThreatCategory::Contextual)
            .map(|m| m.severity)
            .collect();
        assert!(base.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn score_input_decodes_before_matching() {
        assert!(!score("%3Cscript%3Ealert(1)%3C%2Fscript%3E").has_rule("script_tag"));
        assert!(score_input("%3Cscript%3Ealert(1)%3C%2Fscript%3E").has_rule("script_tag"));
        assert!(score_input("&lt;script&gt;alert(1)&lt;/script&gt;").has_rule("script_tag"));
    }

    #[test]
    fn unterminated_entities_cannot_hide_a_script_tag() {
        let result = score_input("&#60script&#62alert(1)&#60/script&#62");
        assert!(result.has_rule("script_tag"), "{:?}", descriptions(&result));
        assert_sum_invariant(&result);

        assert!(score_input("&ltscript&gtalert(1)&lt/script&gt").has_rule("script_tag"));
    }

    #[test]
    fn score_input_adds_mixed_script() {
        let result = score_input("\u{0440}aypal.com");
        assert!(result.total_score() >= 3);
        assert!(result.has_rule(MIXED_SCRIPT_ID));
        assert_sum_invariant(&result);
    }

    #[test]
    fn lithuanian_text_scores_zero() {
        let result = score_input("Ąžuolas, Čiurlionis, Širvintos, Ūla");
        assert_eq!(result.total_score(), 0);
        assert!(result.is_clean());
    }

    #[test]
    fn rule_count_matches_table() {
        assert_eq!(Scorer::default().rule_count(), RULES.len());
    }

    #[test]
    fn sum_invariant_over_assorted_inputs() {
        let inputs = [
            "",
            "hello",
            "' OR 'a'='a",
            "<iframe src=//evil>",
            "cat /etc/shadow; whoami",
            "a && b || c $(id) `id`",
            "/* comment */ select * from t where 1=1 #",
            "Ελληνικά and English",
        ];
        for text in inputs {
            assert_sum_invariant(&score_input(text));
        }
    }
}
