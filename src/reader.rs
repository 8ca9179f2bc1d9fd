//! Byte-level source reader.
//!
//! The language is byte-oriented: outside string literals only ASCII is
//! meaningful, and inside them bytes pass through verbatim.  This wrapper
//! adds the one byte of lookahead the scanner needs over any `BufRead`.

use std::io;
use std::io::prelude::*;
use std::io::Bytes;

/// Reads a buffered input byte by byte with one byte of lookahead.
#[derive(Debug)]
pub struct ByteReader<R: BufRead> {
    input: Bytes<R>,
    lookahead: Option<u8>,
}

impl<R: BufRead> ByteReader<R> {
    pub fn new(input: R) -> ByteReader<R> {
        ByteReader {
            input: input.bytes(),
            lookahead: None,
        }
    }

    /// Consume and return the next byte, or `None` at end of input.
    pub fn next(&mut self) -> io::Result<Option<u8>> {
        if let Some(b) = self.lookahead.take() {
            return Ok(Some(b));
        }
        self.input.next().transpose()
    }

    /// Return the next byte without consuming it.
    pub fn peek(&mut self) -> io::Result<Option<u8>> {
        if self.lookahead.is_none() {
            self.lookahead = self.input.next().transpose()?;
        }
        Ok(self.lookahead)
    }
}
