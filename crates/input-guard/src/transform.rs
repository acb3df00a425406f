//! Sanitizing transformer.
//!
//! Produces the cleaned string handed back to callers. It works on the
//! original text (never the normalized payload) and is independent of the
//! score: a zero-score input still goes through the same cleanup.

use tracing::info;
use unicode_normalization::UnicodeNormalization;

use crate::config::SanitizeConfig;

/// Highest code point kept when `allow_unicode` is off (end of Latin
/// Extended-B).
const LATIN_EXTENDED_B_END: char = '\u{024F}';

/// Run the full cleanup pipeline over `text`.
///
/// Steps, in order: trim, truncate to `max_length` characters, Unicode
/// handling, control-character stripping, whitespace compression,
/// special-character policy, optional HTML escaping.
///
/// Total over any config: nothing is validated here, so `max_length = 0`
/// yields an empty string. [`InputGuard::sanitize`](crate::InputGuard::sanitize)
/// validates first.
pub fn sanitize(text: &str, config: &SanitizeConfig) -> String {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    let (truncated, was_truncated) = truncate_chars(trimmed, config.max_length);
    if was_truncated {
        info!(max_length = config.max_length, "input truncated before sanitization");
    }

    let mut out = normalize_unicode(truncated, config.allow_unicode);
    out = strip_control_chars(&out);
    if config.compress_whitespace {
        out = compress_whitespace(&out);
    }
    out = remove_specials(&out, config.remove_specials.stripped_chars());
    if config.escape_html {
        out = html_escape(&out);
    }
    out
}

/// Cut `text` to at most `max_chars` characters. Returns the kept prefix and
/// whether anything was dropped.
pub fn truncate_chars(text: &str, max_chars: usize) -> (&str, bool) {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => (&text[..cut], true),
        None => (text, false),
    }
}

/// NFC-compose `text`; with `allow_unicode` off, also drop everything above
/// U+024F except whitespace.
///
/// Composition runs first in both modes so decomposed accented Latin letters
/// (`A` + combining ogonek) survive the range filter as `Ą`.
fn normalize_unicode(text: &str, allow_unicode: bool) -> String {
    let composed = text.nfc();
    if allow_unicode {
        composed.collect()
    } else {
        composed
            .filter(|c| *c <= LATIN_EXTENDED_B_END || c.is_whitespace())
            .collect()
    }
}

/// C0 controls and DEL, except tab, line feed and carriage return which are
/// left for whitespace compression.
fn is_stripped_control(c: char) -> bool {
    matches!(c, '\u{00}'..='\u{08}' | '\u{0B}' | '\u{0C}' | '\u{0E}'..='\u{1F}' | '\u{7F}')
}

fn strip_control_chars(text: &str) -> String {
    text.chars().filter(|c| !is_stripped_control(*c)).collect()
}

/// Collapse whitespace runs to one space and trim both ends.
fn compress_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn remove_specials(text: &str, stripped: &[char]) -> String {
    if stripped.is_empty() {
        return text.to_string();
    }
    text.chars().filter(|c| !stripped.contains(c)).collect()
}

/// Escape `& < > " '` for safe inclusion in HTML text or attribute values.
pub fn html_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            other => out.push(other),
        }
    }
    out
}
