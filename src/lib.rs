//! corpus-xml - Streaming reader for sentence-aligned corpus XML
//!
//! Reads large corpus documents in the sentence-aligned XML dialect and
//! reconstructs sentence-level text under bounded memory. Two layers:
//!
//! - [`BlockParser`]: a forward, single-pass element-tree builder that
//!   releases each subtree rooted at a configurable boundary tag as soon as
//!   its end tag is seen, and reclaims it from the live tree.
//! - [`SentenceParser`]: dialect-aware sentence reconstruction on top of the
//!   block stream (token concatenation, annotation suffixing, raw-text
//!   passthrough, inline-markup preservation), with optional id filtering.
//!
//! Both layers are lazy, pull-based iterators: nothing is read until the
//! next record is requested, and dropping an iterator mid-document releases
//! all resident state.
//!
//! ```
//! use corpus_xml::{Dialect, Document, SentenceConfig, SentenceParser};
//! use std::io::Cursor;
//!
//! let xml = r#"<doc><s id="s1"><w>Hello</w><w>world</w></s></doc>"#;
//! let doc = Document::new("doc.xml", Cursor::new(xml.as_bytes().to_vec()));
//! let mut sentences = SentenceParser::new(doc, SentenceConfig::new(Dialect::Xml));
//!
//! let (id, sentence) = sentences.next().unwrap().unwrap();
//! assert_eq!(id, "s1");
//! assert_eq!(sentence.text, "Hello world");
//! ```

mod block;
mod core;
mod document;
mod error;
mod sentence;

pub use block::{Block, BlockParser};
pub use document::Document;
pub use error::{BlockError, SentenceError};
pub use sentence::{
    Annotations, Dialect, Sentence, SentenceConfig, SentenceParser, Sentences,
};
