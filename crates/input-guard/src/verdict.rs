use serde::{Deserialize, Serialize};

use crate::config::Thresholds;

/// What a request handler should do with an evaluated input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// Use the cleaned text.
    Allow,
    /// Use the cleaned text but surface a warning.
    Flag,
    /// Reject the input entirely.
    Block,
}

impl Thresholds {
    /// Map a total score onto a [`Verdict`].
    pub fn classify(&self, score: u32) -> Verdict {
        if score >= self.block {
            Verdict::Block
        } else if score >= self.flag {
            Verdict::Flag
        } else {
            Verdict::Allow
        }
    }
}
