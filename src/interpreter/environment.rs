use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::value::Value;

pub type EnvRef = Rc<Environment>;

/// A scope: a mapping from names to values plus an optional parent link.
/// Scopes are held by `Rc` so function values keep their defining scope
/// alive after the frame that created it returns.
#[derive(Debug)]
pub struct Environment {
    vars: RefCell<IndexMap<String, Value>>,
    parent: Option<EnvRef>,
}

impl Environment {
    pub fn new() -> EnvRef {
        Rc::new(Self {
            vars: RefCell::new(IndexMap::new()),
            parent: None,
        })
    }

    pub fn with_parent(parent: EnvRef) -> EnvRef {
        Rc::new(Self {
            vars: RefCell::new(IndexMap::new()),
            parent: Some(parent),
        })
    }

    /// Walk the chain outward until the name is found.
    pub fn get(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.vars.borrow().get(name) {
            return Some(value.clone());
        }
        self.parent.as_ref().and_then(|p| p.get(name))
    }

    /// `=` semantics: update the nearest enclosing binding if one exists
    /// anywhere in the chain, otherwise define in this scope.
    pub fn assign(&self, name: &str, value: Value) {
        let mut env = self;
        loop {
            if env.vars.borrow().contains_key(name) {
                env.vars.borrow_mut().insert(name.to_string(), value);
                return;
            }
            match &env.parent {
                Some(parent) => env = parent.as_ref(),
                None => break,
            }
        }
        self.vars.borrow_mut().insert(name.to_string(), value);
    }

    /// Bind in this scope unconditionally (parameters, fn names, modules).
    pub fn define(&self, name: &str, value: Value) {
        self.vars.borrow_mut().insert(name.to_string(), value);
    }

    /// Copy of this scope's own frame, in definition order.
    pub fn snapshot(&self) -> IndexMap<String, Value> {
        self.vars.borrow().clone()
    }
}
