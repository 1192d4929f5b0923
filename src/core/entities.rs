//! XML entity decoding and encoding
//!
//! Handles the predefined entities (&lt; &gt; &amp; &quot; &apos;) and
//! numeric character references (&#123; &#x7B;). Uses Cow for zero-copy
//! when no entities are present.

use memchr::memchr;
use std::borrow::Cow;

/// Decode character data, resolving entity references.
///
/// Returns Borrowed if no entities are present (zero-copy),
/// Owned if entities were decoded. Unknown entity references and bare
/// ampersands are kept verbatim.
#[inline]
pub fn decode_text(input: &[u8]) -> Cow<'_, [u8]> {
    // Fast path: no ampersand, nothing to decode
    if memchr(b'&', input).is_none() {
        return Cow::Borrowed(input);
    }
    Cow::Owned(decode_entities(input))
}

/// Decode all entity references in the input.
pub fn decode_entities(input: &[u8]) -> Vec<u8> {
    let mut result = Vec::with_capacity(input.len());
    let mut pos = 0;

    while pos < input.len() {
        match memchr(b'&', &input[pos..]) {
            Some(amp) => {
                result.extend_from_slice(&input[pos..pos + amp]);
                pos += amp;

                if let Some(semi) = memchr(b';', &input[pos..]) {
                    let entity = &input[pos + 1..pos + semi];
                    if let Some(decoded) = decode_entity(entity) {
                        result.extend_from_slice(decoded.as_bytes());
                        pos += semi + 1;
                        continue;
                    }
                }
                // No semicolon or unknown entity: keep the ampersand as-is
                result.push(b'&');
                pos += 1;
            }
            None => {
                result.extend_from_slice(&input[pos..]);
                break;
            }
        }
    }

    result
}

/// Decode a single entity body (without the & and ;).
fn decode_entity(entity: &[u8]) -> Option<String> {
    if entity.is_empty() {
        return None;
    }

    if entity[0] == b'#' {
        return decode_numeric_entity(&entity[1..]);
    }

    match entity {
        b"lt" => Some("<".to_string()),
        b"gt" => Some(">".to_string()),
        b"amp" => Some("&".to_string()),
        b"quot" => Some("\"".to_string()),
        b"apos" => Some("'".to_string()),
        _ => None,
    }
}

/// Decode a numeric character reference (decimal or hex).
fn decode_numeric_entity(entity: &[u8]) -> Option<String> {
    if entity.is_empty() {
        return None;
    }

    let codepoint = if entity[0] == b'x' || entity[0] == b'X' {
        let hex = std::str::from_utf8(&entity[1..]).ok()?;
        u32::from_str_radix(hex, 16).ok()?
    } else {
        let dec = std::str::from_utf8(entity).ok()?;
        dec.parse::<u32>().ok()?
    };

    char::from_u32(codepoint).map(|c| c.to_string())
}

/// Escape text for XML output.
pub fn encode_text(input: &str) -> Cow<'_, str> {
    if !input
        .bytes()
        .any(|b| matches!(b, b'<' | b'>' | b'&' | b'"' | b'\''))
    {
        return Cow::Borrowed(input);
    }

    let mut result = String::with_capacity(input.len() + 16);
    for c in input.chars() {
        match c {
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '&' => result.push_str("&amp;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&apos;"),
            _ => result.push(c),
        }
    }
    Cow::Owned(result)
}
