//! Registry of managed instances
//!
//! Maps cluster names to the handle the instance controller returned on
//! creation. The registry performs no validation of its own; the dispatcher
//! owns it and checks every invariant before mutating it.

use std::collections::HashMap;

/// Name-keyed store of live instance handles
#[derive(Debug)]
pub struct InstanceRegistry<H> {
    instances: HashMap<String, H>,
}

impl<H> Default for InstanceRegistry<H> {
    fn default() -> Self {
        Self {
            instances: HashMap::new(),
        }
    }
}

impl<H> InstanceRegistry<H> {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle for `name`, if it is managed
    pub fn get(&self, name: &str) -> Option<&H> {
        self.instances.get(name)
    }

    /// Returns true if `name` is managed
    pub fn contains(&self, name: &str) -> bool {
        self.instances.contains_key(name)
    }

    /// Store the handle for `name`, returning any handle it replaced
    pub fn put(&mut self, name: impl Into<String>, handle: H) -> Option<H> {
        self.instances.insert(name.into(), handle)
    }

    /// Drop `name` from the registry, returning its handle
    pub fn remove(&mut self, name: &str) -> Option<H> {
        self.instances.remove(name)
    }

    /// Number of managed instances
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    /// Returns true if nothing is managed
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Names of all managed instances, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.instances.keys().cloned().collect();
        names.sort();
        names
    }
}
