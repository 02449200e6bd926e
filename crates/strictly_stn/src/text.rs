//! Escaping rules for text values.
//!
//! Raw values keep their source spelling, backslashes included. Cooking a
//! text property unescapes it; writing escapes it again. Escaping is only
//! ever needed for `\`, `]` and, inside composed values, `:`.

use tracing::instrument;

/// How line breaks are treated when unescaping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextMode {
    /// Multi-line text: an escaped line break is a soft break and vanishes.
    Text,
    /// Single-line text: every line break becomes a space.
    Simple,
}

fn is_normalized_space(c: char) -> bool {
    matches!(c, '\t' | '\u{0b}' | '\u{0c}')
}

/// Unescapes `input` up to the first unescaped `delimiter` or end of input.
///
/// Returns the unescaped text and the number of input bytes consumed, which
/// excludes the delimiter itself.
#[instrument(skip(input), fields(len = input.len()))]
pub fn unescape(input: &str, mode: TextMode, delimiter: Option<char>) -> (String, usize) {
    let mut out = String::with_capacity(input.len());
    let mut escaped = false;

    for (offset, c) in input.char_indices() {
        if escaped {
            escaped = false;
            match c {
                '\n' => {
                    if mode == TextMode::Simple {
                        out.push(' ');
                    }
                }
                c if is_normalized_space(c) => out.push(' '),
                c => out.push(c),
            }
            continue;
        }

        match c {
            '\\' => escaped = true,
            c if Some(c) == delimiter => return (out, offset),
            '\n' if mode == TextMode::Simple => out.push(' '),
            c if is_normalized_space(c) => out.push(' '),
            c => out.push(c),
        }
    }

    (out, input.len())
}

/// Escapes `text` for use between brackets.
///
/// `in_compose` additionally escapes the `:` separator of composed values.
pub fn escape(text: &str, in_compose: bool) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if c == '\\' || c == ']' || (in_compose && c == ':') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Splits a raw composed value at its first unescaped `:`.
pub fn split_compose(raw: &str) -> Option<(&str, &str)> {
    let mut escaped = false;
    for (offset, c) in raw.char_indices() {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == ':' {
            return Some((&raw[..offset], &raw[offset + 1..]));
        }
    }
    None
}

/// Replaces whitespace control characters with plain spaces.
pub fn normalize_spaces(text: &str) -> String {
    text.chars()
        .map(|c| if is_normalized_space(c) { ' ' } else { c })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn soft_break_is_removed_in_text() {
        let (text, used) = unescape("one\\\ntwo", TextMode::Text, None);
        assert_eq!(text, "onetwo");
        assert_eq!(used, 8);
    }

    #[test]
    fn newlines_become_spaces_in_simple_text() {
        let (text, _) = unescape("one\ntwo\\\nthree", TextMode::Simple, None);
        assert_eq!(text, "one two three");
    }

    #[test]
    fn control_whitespace_is_normalized() {
        let (text, _) = unescape("a\tb\u{0b}c\u{0c}d", TextMode::Text, None);
        assert_eq!(text, "a b c d");
    }

    #[test]
    fn unescape_stops_at_delimiter() {
        let (head, used) = unescape("a\\:b:c", TextMode::Simple, Some(':'));
        assert_eq!(head, "a:b");
        assert_eq!(used, 4);
    }

    #[test]
    fn escape_round_trips() {
        for s in ["plain", "with ] bracket", "back\\slash", "multi\nline", "trailing\\"] {
            let (back, _) = unescape(&escape(s, false), TextMode::Text, None);
            assert_eq!(back, s);
        }
        let (back, _) = unescape(&escape("a:b", true), TextMode::Simple, Some(':'));
        assert_eq!(back, "a:b");
    }

    #[test]
    fn split_compose_respects_escapes() {
        assert_eq!(split_compose("a\\:b:c"), Some(("a\\:b", "c")));
        assert_eq!(split_compose("abc"), None);
    }
}
