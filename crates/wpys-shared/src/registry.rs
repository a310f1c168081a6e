//! # Process Registry
//!
//! A name -> ProcessDescriptor lookup populated once at startup. Registration
//! is not supported concurrently; callers finish registering before handing
//! the registry to a Dispatcher or Worker.

use std::collections::HashMap;
use std::sync::Arc;

use crate::errors::{WpysError, WpysResult};
use crate::model::ProcessDescriptor;

/// Insertion-ordered store of process descriptors.
///
/// A plain `HashMap` index over a `Vec` is enough here: the registry is
/// immutable after startup, so there is no concurrent-mutation case to guard
/// against with a concurrent map.
#[derive(Debug, Default)]
pub struct ProcessRegistry {
    order: Vec<Arc<ProcessDescriptor>>,
    index: HashMap<String, usize>,
}

impl ProcessRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `descriptor`. Fails if the identifier is already registered.
    pub fn register(&mut self, descriptor: ProcessDescriptor) -> WpysResult<()> {
        if self.index.contains_key(&descriptor.identifier) {
            return Err(WpysError::validation_error(
                "identifier",
                format!("duplicate process identifier: {}", descriptor.identifier),
            ));
        }
        self.index.insert(descriptor.identifier.clone(), self.order.len());
        self.order.push(Arc::new(descriptor));
        Ok(())
    }

    pub fn get(&self, identifier: &str) -> WpysResult<Arc<ProcessDescriptor>> {
        self.index
            .get(identifier)
            .map(|&i| Arc::clone(&self.order[i]))
            .ok_or_else(|| WpysError::not_found(format!("no such process: {identifier}")))
    }

    /// Stable insertion-order listing of every registered descriptor.
    pub fn list(&self) -> &[Arc<ProcessDescriptor>] {
        &self.order
    }
}
