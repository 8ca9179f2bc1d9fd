//! String interner.
//!
//! Identifiers occur over and over in a program; interning them means each
//! distinct spelling is stored once and later comparisons are pointer
//! comparisons.

use std::borrow::Borrow;
use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

/// Stores all known symbols.
#[derive(Debug)]
pub struct Interner(HashSet<Symbol>);

impl Interner {
    pub fn new() -> Interner {
        Interner(HashSet::new())
    }

    /// Map a string to its unique symbol, interning it on first sight.
    pub fn symbol(&mut self, name: &str) -> Symbol {
        if let Some(sym) = self.0.get(name) {
            sym.clone()
        } else {
            let sym = Symbol(Rc::from(name));
            self.0.insert(sym.clone());
            sym
        }
    }
}

/// An immutable interned string.  Unique per content within one interner, so
/// equality is compared by address rather than by content.
#[derive(Debug, Hash, Clone)]
pub struct Symbol(Rc<str>);

impl Symbol {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for Symbol {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl PartialEq for Symbol {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Symbol {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbol_from_string() {
        let mut reg = Interner::new();
        let sym = reg.symbol("foo");
        assert_eq!(sym.as_str(), "foo");
    }

    #[test]
    fn symbols_with_same_name_are_equal() {
        let mut reg = Interner::new();
        let sym1 = reg.symbol("foo");
        let sym2 = reg.symbol("foo");
        assert_eq!(sym1, sym2);
    }

    #[test]
    fn symbols_with_different_names_are_different() {
        let mut reg = Interner::new();
        let sym1 = reg.symbol("foo");
        let sym2 = reg.symbol("bar");
        assert_ne!(sym1, sym2);
    }
}
