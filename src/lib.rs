//! A tree-walking interpreter for a small, dynamically typed scripting
//! language with C-style syntax.
//!
//! Source text flows one way through the pipeline: bytes are scanned into
//! tokens, tokens are parsed into statement trees, and the trees are
//! evaluated directly for their side effects.  There is no bytecode stage.
//!
//! # Examples
//!
//! See [`crate::interpreter::Interpreter`].
//!
//! # Error handling
//!
//! Lexical and syntactic errors are accumulated so a single run can surface
//! several of them; a program that failed to parse is never executed.
//! Runtime errors abort the run on first occurrence.

#![warn(rust_2018_idioms)]
#![warn(missing_debug_implementations)]

pub mod interpreter;

mod ast;
mod ctx;
mod diag;
mod env;
mod eval;
mod interner;
mod parser;
mod reader;
mod scanner;
mod token;
