//! XML tokenizer
//!
//! Pull-style tokenizer that extracts markup tokens from a byte slice:
//! start/end/empty element tags, text content, CDATA sections, comments,
//! processing instructions and DOCTYPE declarations.
//!
//! The tokenizer expects input that ends on a markup boundary (right after
//! a `>`), as produced by the chunk buffer's safe-boundary scan. A trailing
//! run of text without markup is allowed; a trailing `<` with no closing
//! `>` is a syntax error.

use super::entities::decode_text;
use memchr::memchr;
use std::borrow::Cow;

/// Type of XML token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Element start tag: `<element>`
    StartTag,
    /// Element end tag: `</element>`
    EndTag,
    /// Empty element: `<element/>`
    EmptyTag,
    /// Text content (entities decoded)
    Text,
    /// CDATA section content
    CData,
    /// Comment (consumed, not modelled)
    Comment,
    /// Processing instruction or XML declaration (consumed, not modelled)
    ProcessingInstruction,
    /// DOCTYPE declaration (consumed, not modelled)
    DocType,
}

/// A parsed XML token.
#[derive(Debug, Clone)]
pub struct Token<'a> {
    pub kind: TokenKind,
    /// For tags: the element name
    pub name: Option<&'a [u8]>,
    /// For start/empty tags: raw content between the name and the closing `>`
    pub attr_content: Option<&'a [u8]>,
    /// For text/cdata: the content
    pub content: Option<Cow<'a, [u8]>>,
}

impl<'a> Token<'a> {
    fn markup(kind: TokenKind) -> Self {
        Token {
            kind,
            name: None,
            attr_content: None,
            content: None,
        }
    }
}

/// Syntax error raised by the tokenizer.
#[derive(Debug, Clone)]
pub struct SyntaxError {
    pub message: String,
    pub position: usize,
}

impl SyntaxError {
    fn new(message: impl Into<String>, position: usize) -> Self {
        SyntaxError {
            message: message.into(),
            position,
        }
    }
}

impl std::fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} at offset {}", self.message, self.position)
    }
}

/// Pull tokenizer over a byte slice.
pub struct Tokenizer<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Tokenizer<'a> {
    /// Create a new tokenizer for the given input.
    pub fn new(input: &'a [u8]) -> Self {
        Tokenizer { input, pos: 0 }
    }

    /// Extract the next token, or None at end of input.
    pub fn next_token(&mut self) -> Result<Option<Token<'a>>, SyntaxError> {
        if self.pos >= self.input.len() {
            return Ok(None);
        }

        if self.input[self.pos] != b'<' {
            return self.text_token().map(Some);
        }

        let rest = &self.input[self.pos..];
        if rest.starts_with(b"</") {
            self.end_tag().map(Some)
        } else if rest.starts_with(b"<!--") {
            self.comment().map(Some)
        } else if rest.starts_with(b"<![CDATA[") {
            self.cdata().map(Some)
        } else if rest.starts_with(b"<!") {
            self.doctype().map(Some)
        } else if rest.starts_with(b"<?") {
            self.processing_instruction().map(Some)
        } else {
            self.start_tag().map(Some)
        }
    }

    fn text_token(&mut self) -> Result<Token<'a>, SyntaxError> {
        let start = self.pos;
        let end = match memchr(b'<', &self.input[start..]) {
            Some(lt) => start + lt,
            None => self.input.len(),
        };
        self.pos = end;
        Ok(Token {
            kind: TokenKind::Text,
            name: None,
            attr_content: None,
            content: Some(decode_text(&self.input[start..end])),
        })
    }

    fn end_tag(&mut self) -> Result<Token<'a>, SyntaxError> {
        let start = self.pos;
        let gt = memchr(b'>', &self.input[start..])
            .ok_or_else(|| SyntaxError::new("unclosed end tag", start))?;
        let name = trim_ascii(&self.input[start + 2..start + gt]);
        if name.is_empty() || !is_name_start(name[0]) {
            return Err(SyntaxError::new("malformed end tag", start));
        }
        self.pos = start + gt + 1;
        Ok(Token {
            kind: TokenKind::EndTag,
            name: Some(name),
            attr_content: None,
            content: None,
        })
    }

    fn start_tag(&mut self) -> Result<Token<'a>, SyntaxError> {
        let start = self.pos;
        let gt = self
            .find_tag_close(start)
            .ok_or_else(|| SyntaxError::new("unclosed tag", start))?;

        let empty = self.input[gt - 1] == b'/';
        let inner_end = if empty { gt - 1 } else { gt };

        // Element name starts right after '<'
        let name_start = start + 1;
        if name_start >= inner_end || !is_name_start(self.input[name_start]) {
            return Err(SyntaxError::new("malformed start tag", start));
        }
        let mut name_end = name_start;
        while name_end < inner_end && is_name_char(self.input[name_end]) {
            name_end += 1;
        }

        self.pos = gt + 1;
        Ok(Token {
            kind: if empty {
                TokenKind::EmptyTag
            } else {
                TokenKind::StartTag
            },
            name: Some(&self.input[name_start..name_end]),
            attr_content: Some(&self.input[name_end..inner_end]),
            content: None,
        })
    }

    /// Find the index of the `>` closing the tag that starts at `start`,
    /// skipping over quoted attribute values.
    fn find_tag_close(&self, start: usize) -> Option<usize> {
        let mut pos = start + 1;
        let mut quote: Option<u8> = None;
        while pos < self.input.len() {
            let b = self.input[pos];
            match quote {
                Some(q) => {
                    if b == q {
                        quote = None;
                    }
                }
                None => match b {
                    b'"' | b'\'' => quote = Some(b),
                    b'>' => return Some(pos),
                    _ => {}
                },
            }
            pos += 1;
        }
        None
    }

    fn comment(&mut self) -> Result<Token<'a>, SyntaxError> {
        let start = self.pos;
        let body = &self.input[start + 4..];
        let end = find_subsequence(body, b"-->")
            .ok_or_else(|| SyntaxError::new("unterminated comment", start))?;
        self.pos = start + 4 + end + 3;
        Ok(Token::markup(TokenKind::Comment))
    }

    fn cdata(&mut self) -> Result<Token<'a>, SyntaxError> {
        let start = self.pos;
        let body = &self.input[start + 9..];
        let end = find_subsequence(body, b"]]>")
            .ok_or_else(|| SyntaxError::new("unterminated CDATA section", start))?;
        self.pos = start + 9 + end + 3;
        Ok(Token {
            kind: TokenKind::CData,
            name: None,
            attr_content: None,
            content: Some(Cow::Borrowed(&body[..end])),
        })
    }

    fn doctype(&mut self) -> Result<Token<'a>, SyntaxError> {
        // DOCTYPE may contain an internal subset in brackets
        let start = self.pos;
        let mut pos = start + 2;
        let mut depth = 0usize;
        while pos < self.input.len() {
            match self.input[pos] {
                b'[' => depth += 1,
                b']' => depth = depth.saturating_sub(1),
                b'>' if depth == 0 => {
                    self.pos = pos + 1;
                    return Ok(Token::markup(TokenKind::DocType));
                }
                _ => {}
            }
            pos += 1;
        }
        Err(SyntaxError::new("unterminated markup declaration", start))
    }

    fn processing_instruction(&mut self) -> Result<Token<'a>, SyntaxError> {
        let start = self.pos;
        let body = &self.input[start + 2..];
        let end = find_subsequence(body, b"?>")
            .ok_or_else(|| SyntaxError::new("unterminated processing instruction", start))?;
        self.pos = start + 2 + end + 2;
        Ok(Token::markup(TokenKind::ProcessingInstruction))
    }
}

pub(crate) fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    let first = needle[0];
    let mut offset = 0;
    while let Some(found) = memchr(first, &haystack[offset..]) {
        let pos = offset + found;
        if haystack[pos..].starts_with(needle) {
            return Some(pos);
        }
        offset = pos + 1;
    }
    None
}

fn trim_ascii(mut bytes: &[u8]) -> &[u8] {
    while let [first, rest @ ..] = bytes {
        if first.is_ascii_whitespace() {
            bytes = rest;
        } else {
            break;
        }
    }
    while let [rest @ .., last] = bytes {
        if last.is_ascii_whitespace() {
            bytes = rest;
        } else {
            break;
        }
    }
    bytes
}

#[inline]
fn is_name_start(b: u8) -> bool {
    matches!(b, b'A'..=b'Z' | b'a'..=b'z' | b'_' | b':') || b >= 0x80
}

#[inline]
fn is_name_char(b: u8) -> bool {
    matches!(b, b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'_' | b'-' | b'.' | b':') || b >= 0x80
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(input: &[u8]) -> Vec<Token<'_>> {
        let mut tokenizer = Tokenizer::new(input);
        let mut tokens = Vec::new();
        while let Some(token) = tokenizer.next_token().unwrap() {
            tokens.push(token);
        }
        tokens
    }

    #[test]
    fn test_simple_element() {
        let tokens = collect(b"<s>hello</s>");
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[0].kind, TokenKind::StartTag);
        assert_eq!(tokens[0].name, Some(b"s" as &[u8]));
        assert_eq!(tokens[1].kind, TokenKind::Text);
        assert_eq!(tokens[1].content.as_deref(), Some(b"hello" as &[u8]));
        assert_eq!(tokens[2].kind, TokenKind::EndTag);
        assert_eq!(tokens[2].name, Some(b"s" as &[u8]));
    }

    #[test]
    fn test_empty_element() {
        let tokens = collect(b"<time id=\"T1S\" value=\"00:00:05,897\" />");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::EmptyTag);
        assert_eq!(tokens[0].name, Some(b"time" as &[u8]));
        assert_eq!(
            tokens[0].attr_content,
            Some(b" id=\"T1S\" value=\"00:00:05,897\" " as &[u8])
        );
    }

    #[test]
    fn test_text_entities_decoded() {
        let tokens = collect(b"<w>&amp;</w>");
        assert_eq!(tokens[1].content.as_deref(), Some(b"&" as &[u8]));
    }

    #[test]
    fn test_gt_inside_attribute_value() {
        let tokens = collect(b"<w lem=\"a>b\">x</w>");
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[0].name, Some(b"w" as &[u8]));
    }

    #[test]
    fn test_declaration_and_doctype_skipped_kinds() {
        let tokens = collect(
            b"<?xml version=\"1.0\"?><!DOCTYPE cesAlign PUBLIC \"-//CES//DTD\" \"\"><cesAlign/>",
        );
        assert_eq!(tokens[0].kind, TokenKind::ProcessingInstruction);
        assert_eq!(tokens[1].kind, TokenKind::DocType);
        assert_eq!(tokens[2].kind, TokenKind::EmptyTag);
    }

    #[test]
    fn test_comment_consumed() {
        let tokens = collect(b"<s><!-- note --></s>");
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[1].kind, TokenKind::Comment);
    }

    #[test]
    fn test_cdata_content() {
        let tokens = collect(b"<s><![CDATA[a < b]]></s>");
        assert_eq!(tokens[1].kind, TokenKind::CData);
        assert_eq!(tokens[1].content.as_deref(), Some(b"a < b" as &[u8]));
    }

    #[test]
    fn test_trailing_text_allowed() {
        let tokens = collect(b"<s>partial");
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[1].kind, TokenKind::Text);
    }

    #[test]
    fn test_unclosed_tag_is_error() {
        let mut tokenizer = Tokenizer::new(b"<s id=\"1\"");
        let err = tokenizer.next_token().unwrap_err();
        assert!(err.message.contains("unclosed"));
    }

    #[test]
    fn test_malformed_end_tag() {
        let mut tokenizer = Tokenizer::new(b"</ >");
        assert!(tokenizer.next_token().is_err());
    }
}
