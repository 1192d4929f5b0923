//! Sentence reconstruction
//!
//! Consumes boundary-complete sentence subtrees from the block parser and
//! applies one of three dialect policies to rebuild sentence text:
//!
//! - `Xml`: each descendant token element contributes its trimmed text
//! - `Parsed`: as `Xml`, with a per-token annotation suffix
//! - `Raw`: the sentence element's own trimmed text, no token descendants
//!
//! Preserve mode additionally splices serialized inline markup elements
//! (timestamps) into the reconstructed sequence.

use crate::block::{Block, BlockParser};
use crate::document::Document;
use crate::error::SentenceError;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::io::Read;
use tracing::debug;

/// Sentence element tag in the corpus dialect.
const SENTENCE_TAG: &str = "s";
/// Token element tag.
const TOKEN_TAG: &str = "w";
/// Inline markup element tag (timestamps).
const TIME_TAG: &str = "time";

/// Token-extraction policy for a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dialect {
    /// Token elements carry the text
    #[default]
    Xml,
    /// The sentence element itself carries the text
    Raw,
    /// Token elements carry the text plus linguistic annotations
    Parsed,
}

/// Which token attributes the parsed dialect renders.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Annotations {
    /// Every attribute, in sorted-by-name order
    #[default]
    All,
    /// Only the named attributes, in the given order, when present
    Named(Vec<String>),
}

/// Sentence extraction configuration.
#[derive(Debug, Clone)]
pub struct SentenceConfig {
    pub dialect: Dialect,
    pub annotations: Annotations,
    pub delimiter: String,
    pub preserve: bool,
}

impl Default for SentenceConfig {
    fn default() -> Self {
        SentenceConfig {
            dialect: Dialect::Xml,
            annotations: Annotations::All,
            delimiter: "|".to_string(),
            preserve: false,
        }
    }
}

impl SentenceConfig {
    /// Configuration for the given dialect with default options.
    pub fn new(dialect: Dialect) -> Self {
        SentenceConfig {
            dialect,
            ..Default::default()
        }
    }

    /// Select which annotations the parsed dialect renders.
    pub fn annotations(mut self, annotations: Annotations) -> Self {
        self.annotations = annotations;
        self
    }

    /// Set the annotation attribute delimiter.
    pub fn delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.delimiter = delimiter.into();
        self
    }

    /// Keep inline markup elements in the reconstructed text.
    pub fn preserve(mut self, preserve: bool) -> Self {
        self.preserve = preserve;
        self
    }
}

/// One reconstructed sentence: the text plus the sentence element's own
/// attribute mapping, unmodified.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sentence {
    pub text: String,
    pub attributes: BTreeMap<String, String>,
}

/// Streaming sentence extractor over one document.
///
/// Yields `(id, sentence)` pairs in document order. Records are not
/// deduplicated: a repeated id in the source yields two records.
pub struct SentenceParser<R: Read> {
    blocks: BlockParser<R>,
    config: SentenceConfig,
    id_filter: Option<HashSet<String>>,
}

impl<R: Read> SentenceParser<R> {
    /// Start extracting sentences from `document`.
    pub fn new(document: Document<R>, config: SentenceConfig) -> Self {
        SentenceParser {
            blocks: BlockParser::new(document, SENTENCE_TAG),
            config,
            id_filter: None,
        }
    }

    /// Restrict output to sentences whose id is in the given set.
    ///
    /// This is a pure filter: elements outside the set are still parsed,
    /// just not yielded.
    pub fn with_id_filter(mut self, ids: impl IntoIterator<Item = String>) -> Self {
        self.id_filter = Some(ids.into_iter().collect());
        self
    }

    /// Drain the parser into a lookup table keyed by sentence id.
    pub fn collect_sentences(self) -> Result<Sentences, SentenceError> {
        let mut records = HashMap::new();
        for result in self {
            let (id, sentence) = result?;
            records.insert(id, sentence);
        }
        Ok(Sentences { records })
    }

    fn reconstruct(&self, block: &Block) -> Sentence {
        let mut parts: Vec<String> = Vec::new();
        match self.config.dialect {
            Dialect::Raw => {
                if self.config.preserve {
                    collect_inline_markup(block, &mut parts);
                }
                parts.push(block.text().trim().to_string());
            }
            Dialect::Xml | Dialect::Parsed => {
                self.walk_tokens(block, &mut parts);
            }
        }
        Sentence {
            text: parts.join(" "),
            attributes: block.attributes().clone(),
        }
    }

    fn walk_tokens(&self, block: &Block, parts: &mut Vec<String>) {
        for child in block.children() {
            if child.name() == TOKEN_TAG {
                let mut token = child.text().trim().to_string();
                if self.config.dialect == Dialect::Parsed {
                    token.push_str(&self.render_annotations(child));
                }
                parts.push(token);
            } else if child.name() == TIME_TAG && self.config.preserve {
                parts.push(child.raw_tag());
            }
            self.walk_tokens(child, parts);
        }
    }

    /// Render a token's annotation suffix: each selected attribute value
    /// prefixed by the delimiter. Tokens with none of the requested
    /// attributes render an empty suffix.
    fn render_annotations(&self, token: &Block) -> String {
        let mut out = String::new();
        match &self.config.annotations {
            Annotations::All => {
                for value in token.attributes().values() {
                    out.push_str(&self.config.delimiter);
                    out.push_str(value);
                }
            }
            Annotations::Named(names) => {
                for name in names {
                    if let Some(value) = token.attribute(name) {
                        out.push_str(&self.config.delimiter);
                        out.push_str(value);
                    }
                }
            }
        }
        out
    }
}

impl<R: Read> Iterator for SentenceParser<R> {
    type Item = Result<(String, Sentence), SentenceError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let block = match self.blocks.next()? {
                Ok(block) => block,
                Err(e) => return Some(Err(e.into())),
            };

            let id = match block.attribute("id") {
                Some(id) => id.to_string(),
                None => {
                    return Some(Err(SentenceError::MissingSentenceId {
                        document: self.blocks.document_name().to_string(),
                    }))
                }
            };

            if let Some(filter) = &self.id_filter {
                if !filter.contains(&id) {
                    debug!(id = %id, "sentence outside id filter, skipped");
                    continue;
                }
            }

            let sentence = self.reconstruct(&block);
            return Some(Ok((id, sentence)));
        }
    }
}

/// Collect serialized inline markup from a subtree, in document order.
fn collect_inline_markup(block: &Block, parts: &mut Vec<String>) {
    for child in block.children() {
        if child.name() == TIME_TAG {
            parts.push(child.raw_tag());
        }
        collect_inline_markup(child, parts);
    }
}

/// Per-document sentence lookup table with defined missing-id behavior.
#[derive(Debug, Clone, Default)]
pub struct Sentences {
    records: HashMap<String, Sentence>,
}

impl Sentences {
    /// The sentence stored under `id`, or an empty record when absent.
    /// Absence is a defined "not found" outcome, not an error.
    pub fn get(&self, id: &str) -> Sentence {
        self.records.get(id).cloned().unwrap_or_default()
    }

    /// Whether a sentence with the given id was extracted.
    pub fn contains(&self, id: &str) -> bool {
        self.records.contains_key(id)
    }

    /// Paired texts and attribute maps for a sequence of ids.
    ///
    /// An empty id sequence (or one starting with an empty id) yields empty
    /// output; missing ids contribute empty records.
    pub fn get_many(&self, ids: &[&str]) -> (Vec<String>, Vec<BTreeMap<String, String>>) {
        if ids.is_empty() || ids[0].is_empty() {
            return (Vec::new(), Vec::new());
        }
        let mut texts = Vec::with_capacity(ids.len());
        let mut attributes = Vec::with_capacity(ids.len());
        for id in ids {
            let sentence = self.get(id);
            texts.push(sentence.text);
            attributes.push(sentence.attributes);
        }
        (texts, attributes)
    }

    /// Number of stored sentences.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterate over stored `(id, sentence)` pairs, unordered.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Sentence)> {
        self.records.iter()
    }
}
