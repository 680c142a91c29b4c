//! Address-keyed mutable state carried along a trajectory.
//!
//! Each particle owns its store; cloning at fork points is the isolation
//! boundary, so mutations on one trajectory are invisible to its siblings.

use std::collections::HashMap;

use crate::value::Value;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Store {
    slots: HashMap<String, Value>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, addr: &str) -> Option<&Value> {
        self.slots.get(addr)
    }

    pub fn put(&mut self, addr: impl Into<String>, value: Value) {
        self.slots.insert(addr.into(), value);
    }

    pub fn remove(&mut self, addr: &str) -> Option<Value> {
        self.slots.remove(addr)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
