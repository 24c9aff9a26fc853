//! Conversion of Python literal output into JSON.
//!
//! `--print %(field)s` renders dicts and lists with Python's `repr`, so strings are
//! single-quoted and `None`, `True` and `False` appear as bare words.
//! This module tokenizes that output and re-emits it as strict JSON.

use crate::error::{Error, Result};
use std::iter::Peekable;
use std::str::Chars;

/// Parses a Python literal into a JSON value.
///
/// # Errors
///
/// Returns `Error::Literal` if the input is not a literal, or `Error::Serde` if the
/// re-emitted text is still not valid JSON (for example unbalanced brackets).
pub fn parse(input: &str) -> Result<serde_json::Value> {
    let json = to_json(input)?;
    Ok(serde_json::from_str(&json)?)
}

/// Rewrites a Python literal as JSON text.
pub fn to_json(input: &str) -> Result<String> {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\'' | '"' => read_string(c, &mut chars, &mut out)?,
            '(' => out.push('['),
            ')' => out.push(']'),
            c if c.is_ascii_digit() || c == '-' || c == '+' => {
                if c != '+' {
                    out.push(c);
                }
                while let Some(&next) = chars.peek() {
                    if !(next.is_ascii_digit() || matches!(next, '.' | 'e' | 'E' | '+' | '-')) {
                        break;
                    }
                    out.push(next);
                    chars.next();
                }
            }
            c if c.is_alphabetic() || c == '_' => {
                let mut word = String::from(c);
                while let Some(&next) = chars.peek() {
                    if !(next.is_alphanumeric() || next == '_') {
                        break;
                    }
                    word.push(next);
                    chars.next();
                }

                match word.as_str() {
                    "None" => out.push_str("null"),
                    "True" => out.push_str("true"),
                    "False" => out.push_str("false"),
                    other => return Err(Error::Literal(format!("unexpected word '{}'", other))),
                }
            }
            c => out.push(c),
        }
    }

    Ok(out)
}

fn read_string(quote: char, chars: &mut Peekable<Chars<'_>>, out: &mut String) -> Result<()> {
    out.push('"');

    loop {
        let c = chars
            .next()
            .ok_or_else(|| Error::Literal("unterminated string".to_string()))?;

        match c {
            c if c == quote => break,
            '\\' => {
                let escaped = chars
                    .next()
                    .ok_or_else(|| Error::Literal("dangling escape".to_string()))?;

                match escaped {
                    '\'' => out.push('\''),
                    '"' => out.push_str("\\\""),
                    '\\' | '/' | 'b' | 'f' | 'n' | 'r' | 't' => {
                        out.push('\\');
                        out.push(escaped);
                    }
                    'u' => out.push_str("\\u"),
                    'x' => {
                        let hex: String = chars.by_ref().take(2).collect();
                        let code = u32::from_str_radix(&hex, 16)
                            .map_err(|_| Error::Literal(format!("bad escape \\x{}", hex)))?;
                        out.push_str(&format!("\\u{:04x}", code));
                    }
                    other => {
                        out.push_str("\\\\");
                        push_char(other, out);
                    }
                }
            }
            '"' => out.push_str("\\\""),
            c => push_char(c, out),
        }
    }

    out.push('"');
    Ok(())
}

fn push_char(c: char, out: &mut String) {
    if (c as u32) < 0x20 {
        out.push_str(&format!("\\u{:04x}", c as u32));
    } else {
        out.push(c);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn converts_single_quoted_dict() {
        let value = parse("{'en': [{'ext': 'vtt', 'url': 'u1'}]}").unwrap();
        assert_eq!(value, json!({"en": [{"ext": "vtt", "url": "u1"}]}));
    }

    #[test]
    fn keeps_escaped_single_quotes() {
        let value = parse(r"{'name': 'Children\'s English', 'url': 'u'}").unwrap();
        assert_eq!(value["name"], "Children's English");
    }

    #[test]
    fn escapes_embedded_double_quotes() {
        let value = parse(r#"{'name': 'The "best" track'}"#).unwrap();
        assert_eq!(value["name"], "The \"best\" track");
    }

    #[test]
    fn accepts_double_quoted_strings_and_keywords() {
        let value = parse(r#"{"a": None, 'b': True, 'c': False, 'd': -1.5e3, 'e': (1, 2)}"#).unwrap();
        assert_eq!(value, json!({"a": null, "b": true, "c": false, "d": -1500.0, "e": [1, 2]}));
    }

    #[test]
    fn handles_hex_and_unicode_escapes() {
        let value = parse(r"['caf\xe9', 'été']").unwrap();
        assert_eq!(value, json!(["café", "été"]));
    }

    #[test]
    fn rejects_non_literals() {
        assert!(matches!(to_json("NA"), Err(Error::Literal(_))));
        assert!(matches!(to_json("{'a': 'b"), Err(Error::Literal(_))));
        assert!(parse("{'a': }").is_err());
    }
}
