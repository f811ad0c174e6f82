//! Runtime scope chain.
//!
//! Frames are shared (`Rc<RefCell<_>>`): the interpreter's current frame, and
//! every closure created while it was active, may hold the same frame.  A
//! frame only ever points at an *older* frame, so the parent links form a
//! tree rooted at the globals.
//!
//! Values are a different matter.  A function declared in a frame is stored
//! in that frame and captures it as its closure, so frame → function →
//! frame is a reference cycle.  Such frames are not reclaimed until the
//! process exits.  Frames without a nested declaration are freed as soon as
//! the last handle goes.

use crate::value::Value;
use log::debug;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Shared handle to a frame.
pub type EnvRef = Rc<RefCell<Environment>>;

#[derive(Debug, Default)]
pub struct Environment {
    values: HashMap<String, Value>,
    enclosing: Option<EnvRef>,
}

impl Environment {
    /// The outermost (global) frame.
    pub fn new() -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: None,
        }
    }

    pub fn with_enclosing(enclosing: EnvRef) -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: Some(enclosing),
        }
    }

    /// Allocate a child frame of `enclosing` behind a fresh shared handle.
    pub fn child_of(enclosing: &EnvRef) -> EnvRef {
        Rc::new(RefCell::new(Environment::with_enclosing(Rc::clone(enclosing))))
    }

    pub fn enclosing(&self) -> Option<&EnvRef> {
        self.enclosing.as_ref()
    }

    /// Bind `name` in this frame, replacing any previous binding.
    pub fn define(&mut self, name: &str, value: Value) {
        self.values.insert(name.to_string(), value);
    }

    /// Look `name` up in this frame only.
    pub fn get(&self, name: &str) -> Option<Value> {
        self.values.get(name).cloned()
    }

    /// Overwrite an existing binding in this frame.  Returns `false` if the
    /// frame has no such name.
    pub fn assign(&mut self, name: &str, value: Value) -> bool {
        match self.values.get_mut(name) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }
}

/// Walk `distance` parent links from `env`.  `None` if the chain is shorter.
pub fn ancestor(env: &EnvRef, distance: usize) -> Option<EnvRef> {
    let mut current: EnvRef = Rc::clone(env);

    for _ in 0..distance {
        let parent: EnvRef = Rc::clone(current.borrow().enclosing()?);
        current = parent;
    }

    Some(current)
}

/// Read `name` from the frame `distance` links out.
pub fn get_at(env: &EnvRef, distance: usize, name: &str) -> Option<Value> {
    debug!("get_at distance={} name={}", distance, name);

    ancestor(env, distance)?.borrow().get(name)
}

/// Assign `name` in the frame `distance` links out.  Returns `false` if that
/// frame does not exist or holds no such name.
pub fn assign_at(env: &EnvRef, distance: usize, name: &str, value: Value) -> bool {
    debug!("assign_at distance={} name={}", distance, name);

    match ancestor(env, distance) {
        Some(frame) => frame.borrow_mut().assign(name, value),
        None => false,
    }
}
