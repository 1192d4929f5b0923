//! XML attribute parsing
//!
//! Parses attributes from the content of a tag, after the element name.
//! Namespace handling is out of scope: attribute names are kept whole.

use super::entities::decode_text;
use std::borrow::Cow;

/// A parsed XML attribute.
#[derive(Debug, Clone)]
pub struct Attribute<'a> {
    /// Attribute name
    pub name: Cow<'a, [u8]>,
    /// Attribute value (entities decoded)
    pub value: Cow<'a, [u8]>,
}

impl<'a> Attribute<'a> {
    fn new(name: &'a [u8], value: Cow<'a, [u8]>) -> Self {
        Attribute {
            name: Cow::Borrowed(name),
            value,
        }
    }

    /// Get the name as a string.
    pub fn name_str(&self) -> Option<&str> {
        std::str::from_utf8(self.name.as_ref()).ok()
    }

    /// Get the value as a string.
    pub fn value_str(&self) -> Option<&str> {
        std::str::from_utf8(self.value.as_ref()).ok()
    }
}

/// Parse attributes from raw tag content.
///
/// Input is the slice between the element name and the closing `>` or `/>`.
/// Parsing is lenient: unquoted values and valueless attributes are accepted,
/// unparseable stretches are skipped.
pub fn parse_attributes(input: &[u8]) -> Vec<Attribute<'_>> {
    let mut attrs = Vec::new();
    let mut pos = 0;

    while pos < input.len() {
        while pos < input.len() && is_whitespace(input[pos]) {
            pos += 1;
        }
        if pos >= input.len() || input[pos] == b'/' || input[pos] == b'>' {
            break;
        }

        // Attribute name
        let name_start = pos;
        if !is_name_start_char(input[pos]) {
            pos += 1;
            continue;
        }
        while pos < input.len() && is_name_char(input[pos]) {
            pos += 1;
        }
        let name = &input[name_start..pos];

        while pos < input.len() && is_whitespace(input[pos]) {
            pos += 1;
        }

        if pos >= input.len() || input[pos] != b'=' {
            // Valueless attribute
            attrs.push(Attribute::new(name, Cow::Borrowed(b"")));
            continue;
        }
        pos += 1;

        while pos < input.len() && is_whitespace(input[pos]) {
            pos += 1;
        }
        if pos >= input.len() {
            break;
        }

        let quote = input[pos];
        if quote != b'"' && quote != b'\'' {
            // Unquoted value: read until whitespace or tag end
            let value_start = pos;
            while pos < input.len()
                && !is_whitespace(input[pos])
                && input[pos] != b'/'
                && input[pos] != b'>'
            {
                pos += 1;
            }
            attrs.push(Attribute::new(name, decode_text(&input[value_start..pos])));
            continue;
        }

        pos += 1;
        let value_start = pos;
        while pos < input.len() && input[pos] != quote {
            pos += 1;
        }
        attrs.push(Attribute::new(name, decode_text(&input[value_start..pos])));
        if pos < input.len() {
            pos += 1; // closing quote
        }
    }

    attrs
}

#[inline]
fn is_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r')
}

#[inline]
fn is_name_start_char(b: u8) -> bool {
    matches!(b, b'A'..=b'Z' | b'a'..=b'z' | b'_' | b':') || b >= 0x80
}

#[inline]
fn is_name_char(b: u8) -> bool {
    matches!(b, b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'_' | b'-' | b'.' | b':') || b >= 0x80
}
