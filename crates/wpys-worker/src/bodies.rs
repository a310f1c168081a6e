//! # Process Body Registry
//!
//! The executable counterpart to [`wpys_shared::registry::ProcessRegistry`]:
//! descriptors describe a process, this registry supplies the code that
//! actually runs it. Kept separate so `wpys-shared` stays free of anything
//! that knows how to execute a body.

use std::collections::HashMap;

use wpys_shared::errors::{WpysError, WpysResult};

use crate::process_body::ProcessBody;

#[derive(Default)]
pub struct ProcessBodyRegistry {
    bodies: HashMap<String, ProcessBody>,
}

impl ProcessBodyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, identifier: impl Into<String>, body: ProcessBody) {
        self.bodies.insert(identifier.into(), body);
    }

    pub fn get(&self, identifier: &str) -> WpysResult<&ProcessBody> {
        self.bodies
            .get(identifier)
            .ok_or_else(|| WpysError::not_found(format!("no executable body for process: {identifier}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emitter::Emitter;
    use crate::process_body::BlockingProcessBody;
    use std::sync::Arc;

    struct Noop;
    impl BlockingProcessBody for Noop {
        fn run(&self, _inputs: &[(String, serde_json::Value)], _emitter: Emitter) -> WpysResult<()> {
            Ok(())
        }
    }

    #[test]
    fn register_then_get_round_trips() {
        let mut registry = ProcessBodyRegistry::new();
        registry.register("echo", ProcessBody::Sync(Arc::new(Noop)));
        assert!(registry.get("echo").is_ok());
    }

    #[test]
    fn get_unknown_process_fails() {
        let registry = ProcessBodyRegistry::new();
        let err = registry.get("nope").unwrap_err();
        assert!(matches!(err, WpysError::NotFound(_)));
    }
}
