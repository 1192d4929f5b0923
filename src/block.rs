//! Block tree builder
//!
//! Consumes tag events line by line and maintains the currently-open element
//! path as a stack. Each element whose end tag matches the configured
//! boundary tag is detached together with its completed subtree and emitted;
//! everything else attaches to its parent. Peak memory is bounded by the
//! open-ancestor chain plus the unreleased children below the nearest open
//! boundary element, regardless of document size.

use crate::core::attributes::parse_attributes;
use crate::core::entities::encode_text;
use crate::core::tokenizer::{find_subsequence, Token, TokenKind, Tokenizer};
use crate::document::Document;
use crate::error::BlockError;
use memchr::memchr;
use std::collections::{BTreeMap, VecDeque};
use std::io::Read;
use tracing::{debug, trace};

/// One XML element instance held in memory while its subtree is live.
///
/// `text` is the element's direct character data only; descendants keep
/// their own. `children` holds completed child elements in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Block {
    name: String,
    attributes: BTreeMap<String, String>,
    text: String,
    children: Vec<Block>,
}

impl Block {
    fn new(name: String, attributes: BTreeMap<String, String>) -> Self {
        Block {
            name,
            attributes,
            text: String::new(),
            children: Vec::new(),
        }
    }

    /// Element tag name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// All attributes, keyed by name.
    pub fn attributes(&self) -> &BTreeMap<String, String> {
        &self.attributes
    }

    /// Look up a single attribute value.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Direct character data of this element.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Completed child elements, in document order.
    pub fn children(&self) -> &[Block] {
        &self.children
    }

    /// Serialize this block back to markup.
    ///
    /// A block with no character data and no children renders in
    /// self-closing form; otherwise the element wraps its own text followed
    /// by each child's serialization. Attributes render in sorted-name order.
    pub fn raw_tag(&self) -> String {
        let mut tag = String::with_capacity(self.name.len() + 16);
        tag.push('<');
        tag.push_str(&self.name);
        for (name, value) in &self.attributes {
            tag.push(' ');
            tag.push_str(name);
            tag.push_str("=\"");
            tag.push_str(value);
            tag.push('"');
        }

        if self.text.is_empty() && self.children.is_empty() {
            tag.push_str(" />");
            return tag;
        }

        tag.push('>');
        tag.push_str(&encode_text(&self.text));
        for child in &self.children {
            tag.push_str(&child.raw_tag());
        }
        tag.push_str("</");
        tag.push_str(&self.name);
        tag.push('>');
        tag
    }
}

/// Streaming builder of boundary-complete subtrees.
///
/// Implements `Iterator`; each call to `next` reads only as many input lines
/// as needed to complete the next element named `boundary_tag`, then yields
/// it detached from the live tree.
pub struct BlockParser<R: Read> {
    document: Document<R>,
    boundary_tag: String,
    /// Open-element chain; index 0 is the synthetic root, never yielded.
    stack: Vec<Block>,
    /// Boundary-complete subtrees awaiting the consumer, completion order.
    pending: VecDeque<Block>,
    /// Bytes read but not yet tokenized (may end mid-construct).
    buffer: Vec<u8>,
    line: Vec<u8>,
    done: bool,
}

impl<R: Read> BlockParser<R> {
    /// Start parsing `document`, releasing subtrees rooted at `boundary_tag`.
    pub fn new(document: Document<R>, boundary_tag: impl Into<String>) -> Self {
        let boundary_tag = boundary_tag.into();
        debug!(document = document.name(), boundary = %boundary_tag, "opening block parser");
        BlockParser {
            document,
            boundary_tag,
            stack: vec![Block::new("root".to_string(), BTreeMap::new())],
            pending: VecDeque::new(),
            buffer: Vec::new(),
            line: Vec::new(),
            done: false,
        }
    }

    /// Identity label of the document being parsed.
    pub fn document_name(&self) -> &str {
        self.document.name()
    }

    /// Read one more line and tokenize everything up to the last complete
    /// markup construct. At end of input, flush the remainder and verify
    /// that no element is left open.
    fn step(&mut self) -> Result<(), BlockError> {
        self.line.clear();
        let read = match self.document.read_line(&mut self.line) {
            Ok(n) => n,
            Err(source) => {
                return Err(BlockError::Io {
                    document: self.document.name().to_string(),
                    source,
                })
            }
        };

        if read == 0 {
            self.done = true;
            return self.finish();
        }

        self.buffer.extend_from_slice(&self.line);
        let boundary = find_safe_boundary(&self.buffer);
        if boundary > 0 {
            self.apply_tokens(boundary)?;
            self.buffer.drain(..boundary);
        }
        Ok(())
    }

    fn apply_tokens(&mut self, end: usize) -> Result<(), BlockError> {
        if let Err(message) = run_tokenizer(
            &self.buffer[..end],
            &mut self.stack,
            &mut self.pending,
            &self.boundary_tag,
        ) {
            return Err(BlockError::Malformed {
                document: self.document.name().to_string(),
                message,
            });
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<(), BlockError> {
        if !self.buffer.is_empty() {
            // A remainder without markup is stray character data; a dangling
            // '<' makes the tokenizer fail as truncated markup.
            self.apply_tokens(self.buffer.len())?;
            self.buffer.clear();
        }

        if self.stack.len() > 1 {
            let open = self.stack.last().map(|b| b.name.clone()).unwrap_or_default();
            return Err(BlockError::Malformed {
                document: self.document.name().to_string(),
                message: format!("unexpected end of document: element '{open}' is not closed"),
            });
        }

        debug!(document = self.document.name(), "block parser finished");
        Ok(())
    }
}

impl<R: Read> Iterator for BlockParser<R> {
    type Item = Result<Block, BlockError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(block) = self.pending.pop_front() {
                trace!(name = %block.name, "yielding boundary block");
                return Some(Ok(block));
            }
            if self.done {
                return None;
            }
            if let Err(e) = self.step() {
                self.done = true;
                return Some(Err(e));
            }
        }
    }
}

/// Tokenize `input` and fold every token into the live tree.
///
/// Free function so the tokenizer can borrow the chunk buffer while the
/// stack and pending queue are mutated.
fn run_tokenizer(
    input: &[u8],
    stack: &mut Vec<Block>,
    pending: &mut VecDeque<Block>,
    boundary_tag: &str,
) -> Result<(), String> {
    let mut tokenizer = Tokenizer::new(input);
    loop {
        let token = match tokenizer.next_token() {
            Ok(Some(token)) => token,
            Ok(None) => return Ok(()),
            Err(e) => return Err(e.to_string()),
        };
        apply_token(stack, pending, boundary_tag, token)?;
    }
}

fn apply_token(
    stack: &mut Vec<Block>,
    pending: &mut VecDeque<Block>,
    boundary_tag: &str,
    token: Token<'_>,
) -> Result<(), String> {
    match token.kind {
        TokenKind::StartTag => {
            stack.push(block_from_tag(&token));
        }
        TokenKind::EmptyTag => {
            finalize(stack, pending, boundary_tag, block_from_tag(&token));
        }
        TokenKind::EndTag => {
            let name = tag_name(&token);
            if stack.len() <= 1 {
                return Err(format!("unexpected end tag '</{name}>'"));
            }
            let block = match stack.pop() {
                Some(block) => block,
                None => return Err(format!("unexpected end tag '</{name}>'")),
            };
            if block.name != name {
                return Err(format!(
                    "mismatched end tag: expected '</{}>', found '</{name}>'",
                    block.name
                ));
            }
            finalize(stack, pending, boundary_tag, block);
        }
        TokenKind::Text | TokenKind::CData => {
            // Character data accumulates only inside an open boundary
            // subtree; filler between records is discarded, keeping
            // still-open ancestors at constant size.
            if stack.iter().skip(1).any(|b| b.name == boundary_tag) {
                if let (Some(content), Some(current)) =
                    (token.content.as_deref(), stack.last_mut())
                {
                    current.text.push_str(&String::from_utf8_lossy(content));
                }
            }
        }
        // Accepted but not modelled
        TokenKind::Comment | TokenKind::ProcessingInstruction | TokenKind::DocType => {}
    }
    Ok(())
}

/// Attach a completed block to its parent, or emit it when its name matches
/// the boundary tag. Nested boundary elements each fire independently: the
/// decision is per end-tag event, so an inner match is emitted on its own
/// and never appears inside the outer subtree.
fn finalize(
    stack: &mut Vec<Block>,
    pending: &mut VecDeque<Block>,
    boundary_tag: &str,
    block: Block,
) {
    if block.name == boundary_tag {
        pending.push_back(block);
    } else if let Some(parent) = stack.last_mut() {
        parent.children.push(block);
    }
}

fn block_from_tag(token: &Token<'_>) -> Block {
    let attributes = token
        .attr_content
        .map(|content| {
            parse_attributes(content)
                .into_iter()
                .map(|a| {
                    (
                        String::from_utf8_lossy(&a.name).into_owned(),
                        String::from_utf8_lossy(&a.value).into_owned(),
                    )
                })
                .collect()
        })
        .unwrap_or_default();
    Block::new(tag_name(token), attributes)
}

fn tag_name(token: &Token<'_>) -> String {
    String::from_utf8_lossy(token.name.unwrap_or_default()).into_owned()
}

/// Find the end of the last complete markup construct in `buf` (one past its
/// terminator). Dispatches on the same openers as the tokenizer: comments,
/// CDATA sections, markup declarations and processing instructions end only
/// at their own terminators, so an interior `>` is never taken as a tag
/// close. Quotes only matter inside ordinary tags, so apostrophes in
/// character data never defer the boundary.
fn find_safe_boundary(buf: &[u8]) -> usize {
    let mut last = 0;
    let mut pos = 0;

    while let Some(lt) = memchr(b'<', &buf[pos..]) {
        let start = pos + lt;
        let rest = &buf[start..];

        let len = if rest.starts_with(b"<!--") {
            find_subsequence(&rest[4..], b"-->").map(|i| 4 + i + 3)
        } else if rest.starts_with(b"<![CDATA[") {
            find_subsequence(&rest[9..], b"]]>").map(|i| 9 + i + 3)
        } else if is_truncated_opener(rest) {
            None
        } else if rest.starts_with(b"<!") {
            scan_declaration(rest)
        } else if rest.starts_with(b"<?") {
            find_subsequence(&rest[2..], b"?>").map(|i| 2 + i + 2)
        } else {
            scan_tag(rest)
        };

        match len {
            Some(len) => {
                pos = start + len;
                last = pos;
            }
            // Incomplete construct; leave it (and everything after) buffered
            None => break,
        }
    }
    last
}

/// True when `rest` is a prefix of a comment or CDATA opener still too short
/// to classify.
fn is_truncated_opener(rest: &[u8]) -> bool {
    (rest.len() < 4 && b"<!--".starts_with(rest))
        || (rest.len() < 9 && b"<![CDATA[".starts_with(rest))
}

/// Length of the bracket-aware markup declaration at the start of `rest`,
/// when complete.
fn scan_declaration(rest: &[u8]) -> Option<usize> {
    let mut depth = 0usize;
    for (i, &b) in rest.iter().enumerate() {
        match b {
            b'[' => depth += 1,
            b']' => depth = depth.saturating_sub(1),
            b'>' if depth == 0 => return Some(i + 1),
            _ => {}
        }
    }
    None
}

/// Length of the ordinary tag at the start of `rest`, when complete,
/// skipping quoted attribute values.
fn scan_tag(rest: &[u8]) -> Option<usize> {
    let mut quote: Option<u8> = None;
    for (i, &b) in rest.iter().enumerate().skip(1) {
        match quote {
            Some(q) => {
                if b == q {
                    quote = None;
                }
            }
            None => match b {
                b'"' | b'\'' => quote = Some(b),
                b'>' => return Some(i + 1),
                _ => {}
            },
        }
    }
    None
}
