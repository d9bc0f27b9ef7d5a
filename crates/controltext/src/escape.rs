//! Quoting of string values on the text protocol.
//!
//! Strings go out single quoted with C style escapes and come in either
//! single or double quoted. An unquoted input is taken as is.

use crate::error::TextError;

/// Escape `raw` for printing inside quotes. Stops at the first NUL.
pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '\0' => break,
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '"' => out.push_str("\\\""),
            '\r' => out.push_str("\\r"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\x{:02x}", c as u32)),
            c => out.push(c),
        }
    }
    out
}

enum State {
    Plain,
    Escape,
    Hex(Option<u8>),
}

/// Undo [`escape`] on a quoted value.
pub fn unescape(value: &str) -> Result<String, TextError> {
    let trimmed = value.trim_start();
    let mut chars = trimmed.chars();
    let quote = match chars.next() {
        Some(q @ ('\'' | '"')) => q,
        _ => return Ok(value.to_string()),
    };

    let mut bytes = Vec::with_capacity(trimmed.len());
    let mut state = State::Plain;
    let mut closed = false;
    let mut buf = [0u8; 4];

    for c in chars.by_ref() {
        state = match state {
            State::Plain if c == '\\' => State::Escape,
            State::Plain if c == quote => {
                closed = true;
                break;
            }
            State::Plain => {
                bytes.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
                State::Plain
            }
            State::Escape => {
                let unescaped = match c {
                    '\\' => b'\\',
                    '\'' => b'\'',
                    '"' => b'"',
                    'n' => b'\n',
                    'r' => b'\r',
                    't' => b'\t',
                    'x' => {
                        state = State::Hex(None);
                        continue;
                    }
                    other => return Err(TextError::Unescape(format!("unknown escape \\{}", other))),
                };
                bytes.push(unescaped);
                State::Plain
            }
            State::Hex(high) => {
                let digit = c
                    .to_digit(16)
                    .ok_or_else(|| TextError::Unescape(format!("bad hex digit {:?}", c)))? as u8;
                match high {
                    None => State::Hex(Some(digit << 4)),
                    Some(h) => {
                        bytes.push(h | digit);
                        State::Plain
                    }
                }
            }
        };
    }

    if !closed {
        return Err(TextError::Unescape("unterminated string".into()));
    }
    String::from_utf8(bytes).map_err(|e| TextError::Unescape(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_specials() {
        assert_eq!(escape("a\tb\n"), "a\\tb\\n");
        assert_eq!(escape("it's"), "it\\'s");
        assert_eq!(escape("x\u{1}y"), "x\\x01y");
        assert_eq!(escape("cut\0here"), "cut");
        assert_eq!(escape("back\\slash"), "back\\\\slash");
    }

    #[test]
    fn test_unescape_quoted() {
        assert_eq!(unescape("'Main Mix'").unwrap(), "Main Mix");
        assert_eq!(unescape("  \"say \\\"hi\\\"\"").unwrap(), "say \"hi\"");
        assert_eq!(unescape("'tab\\there'").unwrap(), "tab\there");
        assert_eq!(unescape("'\\x41\\x42'").unwrap(), "AB");
        assert_eq!(unescape("'caf\u{e9}'").unwrap(), "caf\u{e9}");
    }

    #[test]
    fn test_unescape_unquoted_is_verbatim() {
        assert_eq!(unescape("Stage Left").unwrap(), "Stage Left");
    }

    #[test]
    fn test_unescape_errors() {
        assert!(unescape("'open").is_err());
        assert!(unescape("'\\q'").is_err());
        assert!(unescape("'\\xzz'").is_err());
    }

    #[test]
    fn test_escape_then_unescape() {
        let raw = "line one\nline 'two'\t\\end";
        assert_eq!(unescape(&format!("'{}'", escape(raw))).unwrap(), raw);
    }
}
