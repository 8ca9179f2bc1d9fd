//! Lexical analyzer.

use std::io;
use std::io::prelude::*;
use std::rc::Rc;

use crate::ctx::Context;
use crate::diag::{Diagnostics, ParseError, Position};
use crate::reader::ByteReader;
use crate::token::Token;

/// Turns a sequence of bytes into a sequence of tokens.
///
/// Lexical errors are reported to the shared [`Diagnostics`] sink and
/// scanning continues with the next byte; only an I/O failure aborts.  The
/// token stream always ends with a single `Eof`.
#[derive(Debug)]
pub struct Scanner<R: BufRead> {
    input: ByteReader<R>,
    line: Position,
    ctx: Rc<Context>,
    diags: Rc<Diagnostics>,

    // Handed out before reading further input.  Holds the `.` left over
    // when a number has no fractional part.
    pending: Option<Token>,

    // Buffer used when scanning longer tokens.  Allocated here to reuse memory.
    buf: String,
}

impl<R: BufRead> Scanner<R> {
    /// Creates a new scanner operating on `input`.
    pub fn new(input: R, ctx: Rc<Context>, diags: Rc<Diagnostics>) -> Scanner<R> {
        Scanner {
            input: ByteReader::new(input),
            line: 1,
            ctx,
            diags,
            pending: None,
            buf: String::new(),
        }
    }

    /// Scan the next token and return it with the line it ends on.
    pub fn get_token(&mut self) -> io::Result<(Position, Token)> {
        self.get_raw_token().map(|token| (self.line, token))
    }

    fn get_raw_token(&mut self) -> io::Result<Token> {
        if let Some(token) = self.pending.take() {
            return Ok(token);
        }
        loop {
            let b = match self.input.next()? {
                None => return Ok(Token::Eof),
                Some(b) => b,
            };
            match b {
                b'\n' => self.line += 1,
                b' ' | b'\t' | b'\r' => (),
                b'+' => return Ok(Token::Plus),
                b'-' => return Ok(Token::Minus),
                b'*' => return Ok(Token::Star),
                b'(' => return Ok(Token::LeftParen),
                b')' => return Ok(Token::RightParen),
                b'{' => return Ok(Token::LeftCurly),
                b'}' => return Ok(Token::RightCurly),
                b',' => return Ok(Token::Comma),
                b'.' => return Ok(Token::Dot),
                b';' => return Ok(Token::Semicolon),
                b'/' => {
                    if self.input.peek()? == Some(b'/') {
                        self.skip_comment()?;
                    } else {
                        return Ok(Token::Slash);
                    }
                }
                b'=' => return self.one_or_two(Token::Equal, Token::EqualEqual),
                b'!' => return self.one_or_two(Token::Bang, Token::BangEqual),
                b'<' => return self.one_or_two(Token::Less, Token::LessEqual),
                b'>' => return self.one_or_two(Token::Greater, Token::GreaterEqual),
                b'"' => {
                    if let Some(token) = self.scan_string()? {
                        return Ok(token);
                    }
                }
                b'0'..=b'9' => {
                    if let Some(token) = self.scan_number(b)? {
                        return Ok(token);
                    }
                }
                b'A'..=b'Z' | b'a'..=b'z' | b'_' => return self.scan_identifier(b),
                _ => {
                    self.diags
                        .report(self.line, ParseError::UnexpectedChar(b as char));
                }
            }
        }
    }

    /// Dispatch on a trailing `=`: `two` when present, `one` otherwise.
    fn one_or_two(&mut self, one: Token, two: Token) -> io::Result<Token> {
        if self.input.peek()? == Some(b'=') {
            self.input.next()?;
            Ok(two)
        } else {
            Ok(one)
        }
    }

    fn skip_comment(&mut self) -> io::Result<()> {
        loop {
            match self.input.peek()? {
                Some(b) if b != b'\n' => {
                    self.input.next()?;
                }
                _ => break,
            }
        }
        Ok(())
    }

    /// Scan a string literal.  Newlines are allowed inside and counted; no
    /// escape sequences are processed.  Returns `None` when the literal is
    /// unterminated, after reporting it.
    fn scan_string(&mut self) -> io::Result<Option<Token>> {
        let mut text = Vec::new();
        loop {
            match self.input.next()? {
                None => {
                    self.diags.report(self.line, ParseError::UnterminatedString);
                    return Ok(None);
                }
                Some(b'"') => break,
                Some(b) => {
                    if b == b'\n' {
                        self.line += 1;
                    }
                    text.push(b);
                }
            }
        }
        let text = String::from_utf8(text)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        Ok(Some(Token::Str(Rc::new(text))))
    }

    fn scan_number(&mut self, first_digit: u8) -> io::Result<Option<Token>> {
        self.buf.clear();
        self.buf.push(first_digit as char);
        self.scan_digits()?;

        if self.input.peek()? == Some(b'.') {
            self.input.next()?;
            if matches!(self.input.peek()?, Some(b) if b.is_ascii_digit()) {
                self.buf.push('.');
                self.scan_digits()?;
            } else {
                // The dot is not part of the number; hand it back on the
                // next scan.
                self.pending = Some(Token::Dot);
            }
        }

        match self.buf.parse::<f64>() {
            Ok(n) => Ok(Some(Token::Number(n))),
            Err(_) => {
                self.diags
                    .report(self.line, ParseError::BadNumberLiteral(self.buf.clone()));
                Ok(None)
            }
        }
    }

    fn scan_digits(&mut self) -> io::Result<()> {
        loop {
            match self.input.peek()? {
                Some(b) if b.is_ascii_digit() => {
                    self.input.next()?;
                    self.buf.push(b as char);
                }
                _ => break,
            }
        }
        Ok(())
    }

    fn scan_identifier(&mut self, first_char: u8) -> io::Result<Token> {
        self.buf.clear();
        self.buf.push(first_char as char);
        loop {
            match self.input.peek()? {
                Some(b) if b.is_ascii_alphanumeric() || b == b'_' => {
                    self.input.next()?;
                    self.buf.push(b as char);
                }
                _ => break,
            }
        }

        let sym = self.ctx.symbol(&self.buf);
        if let Some(token) = self.ctx.keyword(&sym) {
            Ok(token)
        } else {
            Ok(Token::Identifier(sym))
        }
    }
}

impl<R: BufRead> Iterator for Scanner<R> {
    type Item = io::Result<Token>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.get_token() {
            Ok((_, Token::Eof)) => None,
            Ok((_, t)) => Some(Ok(t)),
            Err(e) => Some(Err(e)),
        }
    }
}
