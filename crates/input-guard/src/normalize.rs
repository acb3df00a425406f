//! Payload normalization.
//!
//! Reverses transport and display-layer encodings so the scorer sees the
//! payload an attacker meant to deliver: `%3Cscript%3E` and
//! `&lt;script&gt;` both score like `<script>`. The output only feeds the
//! scorer; cleaned text returned to callers is always derived from the
//! original input.
//!
//! Decoding is best-effort and total. Malformed escapes and unknown entities
//! are left exactly as typed.

/// Percent-decode, then HTML-unescape, `input`.
pub fn normalize(input: &str) -> String {
    if input.is_empty() {
        return String::new();
    }
    let decoded = percent_decode(input);
    unescape_html(&decoded)
}

// ---------------------------------------------------------------------------
// Percent decoding
// ---------------------------------------------------------------------------

fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

/// Decode `%XX` escapes and `+` as space. Invalid UTF-8 produced by the
/// decoded bytes is replaced lossily.
pub fn percent_decode(input: &str) -> String {
    if !input.contains(['%', '+']) {
        return input.to_string();
    }

    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' if i + 2 < bytes.len() => {
                match (hex_value(bytes[i + 1]), hex_value(bytes[i + 2])) {
                    (Some(hi), Some(lo)) => {
                        out.push(hi << 4 | lo);
                        i += 3;
                    }
                    _ => {
                        out.push(b'%');
                        i += 1;
                    }
                }
            }
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

// ---------------------------------------------------------------------------
// HTML entity unescaping
// ---------------------------------------------------------------------------

/// Longest entity body (between `&` and `;`) worth looking at.
const MAX_ENTITY_LEN: usize = 10;

const NAMED_ENTITIES: &[(&str, char)] = &[
    ("lt", '<'),
    ("gt", '>'),
    ("amp", '&'),
    ("quot", '"'),
    ("apos", '\''),
    ("nbsp", '\u{a0}'),
    ("sol", '/'),
    ("bsol", '\\'),
    ("lpar", '('),
    ("rpar", ')'),
    ("semi", ';'),
    ("colon", ':'),
    ("comma", ','),
    ("equals", '='),
    ("num", '#'),
    ("excl", '!'),
    ("grave", '`'),
    ("verbar", '|'),
    ("dollar", '$'),
    ("period", '.'),
    ("Tab", '\t'),
    ("NewLine", '\n'),
];

fn named_entity(name: &str) -> Option<char> {
    NAMED_ENTITIES
        .iter()
        .find(|(n, _)| *n == name)
        .or_else(|| {
            // `&LT;`, `&AMP;` and friends are accepted in upper case too.
            NAMED_ENTITIES
                .iter()
                .find(|(n, _)| n.len() <= 4 && n.eq_ignore_ascii_case(name))
        })
        .map(|(_, c)| *c)
}

/// Names browsers still decode when the closing `;` is missing.
const LEGACY_ENTITIES: &[(&str, char)] = &[
    ("quot", '"'),
    ("QUOT", '"'),
    ("nbsp", '\u{a0}'),
    ("amp", '&'),
    ("AMP", '&'),
    ("lt", '<'),
    ("LT", '<'),
    ("gt", '>'),
    ("GT", '>'),
];

/// Decode the reference following `&#`: decimal digits, or `x`/`X` and hex
/// digits, with an optional trailing `;`. Returns the character and the
/// number of bytes consumed.
fn numeric_reference(reference: &str) -> Option<(char, usize)> {
    let (radix, prefix_len) = match reference.as_bytes().first() {
        Some(b'x' | b'X') => (16, 1),
        _ => (10, 0),
    };
    let body = &reference[prefix_len..];
    let digits = body
        .bytes()
        .take_while(|b| char::from(*b).is_digit(radix))
        .count();
    if digits == 0 {
        return None;
    }

    let code = u32::from_str_radix(&body[..digits], radix).ok()?;
    if code == 0 {
        return None;
    }
    let ch = char::from_u32(code)?;

    let terminated = body[digits..].starts_with(';');
    Some((ch, prefix_len + digits + usize::from(terminated)))
}

/// Decode `name;`, falling back to the legacy names that need no `;`.
fn named_reference(tail: &str) -> Option<(char, usize)> {
    tail.find(';')
        .filter(|end| *end > 0 && *end <= MAX_ENTITY_LEN)
        .and_then(|end| named_entity(&tail[..end]).map(|c| (c, end + 1)))
        .or_else(|| {
            LEGACY_ENTITIES
                .iter()
                .find(|(name, _)| tail.starts_with(name))
                .map(|(name, c)| (*c, name.len()))
        })
}

/// Replace `&name;`, `&#NN;` and `&#xHH;` references with the characters
/// they stand for. Numeric references and the legacy names (`&lt`, `&amp`,
/// ...) decode without the closing `;` too, as browsers do.
pub fn unescape_html(input: &str) -> String {
    if !input.contains('&') {
        return input.to_string();
    }

    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp + 1..];

        let decoded = match tail.strip_prefix('#') {
            Some(reference) => numeric_reference(reference).map(|(c, len)| (c, len + 1)),
            None => named_reference(tail),
        };

        match decoded {
            Some((c, consumed)) => {
                out.push(c);
                rest = &tail[consumed..];
            }
            None => {
                out.push('&');
                rest = tail;
            }
        }
    }
    out.push_str(rest);
    out
}
