//! Mixed-script (homoglyph) detection.
//!
//! Flags text that combines Latin letters with letters from a script that
//! has Latin look-alikes, e.g. a Cyrillic `р` standing in for `p` in
//! `рaypal.com`. Text written entirely in one of those scripts is left
//! alone; only the mixture is a signal.

use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

/// Scripts containing letters that are easily confused with Latin ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfusableScript {
    Cyrillic,
    Greek,
    Armenian,
    Arabic,
}

impl ConfusableScript {
    /// Unicode block covered by this script.
    pub fn range(self) -> RangeInclusive<char> {
        match self {
            Self::Cyrillic => '\u{0400}'..='\u{04FF}',
            Self::Greek => '\u{0370}'..='\u{03FF}',
            Self::Armenian => '\u{0530}'..='\u{058F}',
            Self::Arabic => '\u{0600}'..='\u{06FF}',
        }
    }

    pub fn contains(self, c: char) -> bool {
        self.range().contains(&c)
    }
}

/// Latin letters, including the accented ones from Latin-1 Supplement and
/// Latin Extended-A/B (Lithuanian `ą č ę ė į š ų ū ž`, ...).
pub fn is_latin_letter(c: char) -> bool {
    c.is_ascii_alphabetic() || (('\u{00C0}'..='\u{024F}').contains(&c) && c.is_alphabetic())
}

/// Detects Latin text mixed with any of a configured set of scripts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptMixDetector {
    scripts: Vec<ConfusableScript>,
}

impl ScriptMixDetector {
    pub fn new(scripts: impl IntoIterator<Item = ConfusableScript>) -> Self {
        Self {
            scripts: scripts.into_iter().collect(),
        }
    }

    /// Also treat Arabic letters as confusable.
    pub fn with_arabic(mut self) -> Self {
        if !self.scripts.contains(&ConfusableScript::Arabic) {
            self.scripts.push(ConfusableScript::Arabic);
        }
        self
    }

    pub fn scripts(&self) -> &[ConfusableScript] {
        &self.scripts
    }

    /// `true` iff `text` holds at least one Latin letter and at least one
    /// character from a configured script.
    pub fn detect(&self, text: &str) -> bool {
        let mut has_latin = false;
        let mut has_confusable = false;
        for c in text.chars() {
            if !has_latin && is_latin_letter(c) {
                has_latin = true;
            } else if !has_confusable && self.scripts.iter().any(|s| s.contains(c)) {
                has_confusable = true;
            }
            if has_latin && has_confusable {
                return true;
            }
        }
        false
    }
}

impl Default for ScriptMixDetector {
    /// Cyrillic, Greek and Armenian.
    fn default() -> Self {
        Self::new([
            ConfusableScript::Cyrillic,
            ConfusableScript::Greek,
            ConfusableScript::Armenian,
        ])
    }
}

/// [`ScriptMixDetector::detect`] with the default script set.
pub fn detect_script_mix(text: &str) -> bool {
    ScriptMixDetector::default().detect(text)
}
