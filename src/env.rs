//! Lexically nested scope frames.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::eval::Value;
use crate::interner::Symbol;

/// One scope frame: a mapping from names to values plus a link to the
/// enclosing frame.
///
/// Frames are shared through `Rc`: a block or call holds its child frame
/// only while it runs, but a function value keeps its captured frame alive
/// for as long as the value itself is reachable.
#[derive(Debug)]
pub struct Env {
    parent: Option<Rc<Env>>,
    bindings: RefCell<HashMap<Symbol, Value>>,
}

impl Env {
    /// Creates a global frame, the root of a frame tree.
    pub fn new() -> Rc<Env> {
        Self::with_parent(None)
    }

    pub fn with_parent(parent: Option<Rc<Env>>) -> Rc<Env> {
        Rc::new(Env {
            parent,
            bindings: RefCell::new(HashMap::new()),
        })
    }

    /// Bind `sym` in this frame, shadowing any outer binding and replacing
    /// any previous one in the same frame.
    pub fn define(&self, sym: &Symbol, val: Value) {
        self.bindings.borrow_mut().insert(sym.clone(), val);
    }

    /// Rebind the innermost existing binding of `sym`, walking the chain
    /// outwards.  Returns `false` when no frame knows the name.
    pub fn assign(&self, sym: &Symbol, val: Value) -> bool {
        if self.bindings.borrow().contains_key(sym) {
            self.bindings.borrow_mut().insert(sym.clone(), val);
            true
        } else {
            match self.parent.as_ref() {
                Some(parent) => parent.assign(sym, val),
                None => false,
            }
        }
    }

    /// Look `sym` up, walking the chain outwards.
    pub fn get(&self, sym: &Symbol) -> Option<Value> {
        match self.bindings.borrow().get(sym) {
            Some(v) => Some(v.clone()),
            None => self.parent.as_ref().and_then(|p| p.get(sym)),
        }
    }
}
