use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::interner::{Interner, Symbol};
use crate::token::Token;

/// Shared, mostly read-only state that persists across interpreter sessions.
///
/// Anchors the string interner and the keyword table.  The keyword table
/// cannot be a `lazy_static`-style global because `Symbol` (and so `Token`)
/// is not `Sync`.
#[derive(Debug)]
pub struct Context {
    interner: RefCell<Interner>,
    keywords: HashMap<Symbol, Token>,
}

impl Context {
    /// Creates a new context.
    ///
    /// Returns an `Rc` because the context is shared between the scanner,
    /// the parser, and the evaluator.
    pub fn new() -> Rc<Self> {
        let mut interner = Interner::new();

        let mut keywords = HashMap::new();
        for (name, token) in KEYWORDS.iter().cloned() {
            keywords.insert(interner.symbol(name), token);
        }

        Rc::new(Context {
            interner: RefCell::new(interner),
            keywords,
        })
    }

    /// Intern the given string if needed and return its associated symbol.
    pub fn symbol(&self, name: &str) -> Symbol {
        self.interner.borrow_mut().symbol(name)
    }

    /// Return the token associated with the given symbol if it is a keyword.
    pub fn keyword(&self, id: &Symbol) -> Option<Token> {
        self.keywords.get(id).cloned()
    }
}

const KEYWORDS: [(&str, Token); 16] = [
    ("and", Token::And),
    ("class", Token::Class),
    ("else", Token::Else),
    ("false", Token::False),
    ("for", Token::For),
    ("fun", Token::Fun),
    ("if", Token::If),
    ("nil", Token::Nil),
    ("or", Token::Or),
    ("print", Token::Print),
    ("return", Token::Return),
    ("super", Token::Super),
    ("this", Token::This),
    ("true", Token::True),
    ("var", Token::Var),
    ("while", Token::While),
];
