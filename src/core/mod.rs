//! Core XML parsing primitives
//!
//! The fundamental building blocks for the streaming corpus reader:
//! - Tokenizer: pull-style markup token extraction over byte slices
//! - Attributes: attribute parsing from tag content
//! - Entities: entity decoding/encoding with Cow (zero-copy when possible)

pub mod attributes;
pub mod entities;
pub mod tokenizer;
