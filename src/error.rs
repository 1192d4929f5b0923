//! Error types for block parsing and sentence extraction

use thiserror::Error;

/// Error raised while building block trees from a document.
#[derive(Debug, Error)]
pub enum BlockError {
    /// The document contains markup the parser rejects. Fatal to the
    /// current document; retrying produces the same error.
    #[error("document '{document}' could not be parsed: {message}")]
    Malformed { document: String, message: String },

    /// The underlying source failed to deliver bytes.
    #[error("document '{document}' could not be read: {source}")]
    Io {
        document: String,
        #[source]
        source: std::io::Error,
    },
}

impl BlockError {
    /// The identity label of the document the error belongs to.
    pub fn document(&self) -> &str {
        match self {
            BlockError::Malformed { document, .. } => document,
            BlockError::Io { document, .. } => document,
        }
    }
}

/// Error raised while extracting sentences from a document.
///
/// Block-level failures are re-signaled with sentence-extraction context
/// layered on top, preserving the underlying message.
#[derive(Debug, Error)]
pub enum SentenceError {
    #[error("error while parsing sentence file: {0}")]
    Block(#[from] BlockError),

    /// A sentence element without an `id` attribute cannot be keyed.
    #[error("document '{document}' contains a sentence element without an 'id' attribute")]
    MissingSentenceId { document: String },
}

impl SentenceError {
    /// The identity label of the document the error belongs to.
    pub fn document(&self) -> &str {
        match self {
            SentenceError::Block(e) => e.document(),
            SentenceError::MissingSentenceId { document } => document,
        }
    }
}
