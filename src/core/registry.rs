use crate::core::error::{MapError, Result};
use crate::core::invocation::{Invocation, MapOp};
use std::collections::HashMap;
use std::sync::Arc;

/// Named invocations a map can refer to by string.
///
/// Handed to whatever builds maps from configuration, instead of being a
/// process-wide lookup.
#[derive(Clone, Default)]
pub struct InvocationRegistry {
    entries: HashMap<String, Arc<dyn Invocation>>,
}

impl InvocationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `invocation` under `name`, replacing any previous entry.
    pub fn register(&mut self, name: &str, invocation: Arc<dyn Invocation>) -> &mut Self {
        if self.entries.contains_key(name) {
            log::warn!("Invocation {} already registered, overwriting it.", name);
        }
        self.entries.insert(name.to_string(), invocation);
        self
    }

    pub fn resolve(&self, name: &str) -> Result<Arc<dyn Invocation>> {
        self.entries
            .get(name)
            .cloned()
            .ok_or_else(|| MapError::UnknownInvocation(name.to_string()))
    }

    /// Resolves a [`MapOp`]; direct invocations pass through untouched.
    pub fn resolve_op(&self, op: &MapOp) -> Result<Arc<dyn Invocation>> {
        match op {
            MapOp::Named(name) => self.resolve(name),
            MapOp::Direct(invocation) => Ok(Arc::clone(invocation)),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.keys().cloned().collect();
        names.sort();
        names
    }
}
