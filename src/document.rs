//! Document input source
//!
//! Wraps any `Read` source with a stable identity label used in error
//! messages, and exposes the line-oriented reads the block parser feeds on.
//! Acquisition and closing of the underlying source stay with the caller.

use std::io::{BufRead, BufReader, Read};

/// A corpus document: a readable byte source plus its identity label.
pub struct Document<R: Read> {
    name: String,
    reader: BufReader<R>,
}

impl<R: Read> Document<R> {
    /// Wrap a readable source positioned at the start of one document.
    pub fn new(name: impl Into<String>, reader: R) -> Self {
        Document {
            name: name.into(),
            reader: BufReader::new(reader),
        }
    }

    /// The identity label, used in error messages.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Read one line (through the next `\n`, or to EOF) into `buf`.
    ///
    /// Returns the number of bytes appended; 0 means end of input.
    pub fn read_line(&mut self, buf: &mut Vec<u8>) -> std::io::Result<usize> {
        self.reader.read_until(b'\n', buf)
    }
}
