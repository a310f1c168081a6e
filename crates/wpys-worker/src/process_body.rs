//! # Process Body
//!
//! The four execution shapes a process author can write a body in collapse
//! to two trait shapes at this layer: a blocking body (sync function or
//! generator stream, run on a blocking thread) and an async body (coroutine
//! or async stream, polled on the runtime). The [`ProcessBody`] enum keeps
//! all four tags distinct so the engine can still apply shape-specific
//! cancellation semantics even though the two traits carry the actual code.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use wpys_shared::errors::WpysResult;

use crate::emitter::Emitter;

/// A body that runs to completion on a blocking thread. Used for both
/// `SyncFunction` (single result, cancellation is mark-only) and
/// `GeneratorStream` (many results, expected to poll `emitter.cancelled()`
/// between pulls) shapes — the engine tells the two apart only in how it
/// reacts to cancellation, not in how it calls the body.
pub trait BlockingProcessBody: Send + Sync {
    fn run(&self, inputs: &[(String, serde_json::Value)], emitter: Emitter) -> WpysResult<()>;
}

/// A body driven by the async runtime. Used for both `AsyncCoroutine` and
/// `AsyncStream` shapes; the future is raced against a cancellation signal
/// and dropped outright on cancel, relying on Rust's drop-based cancel
/// safety rather than a cooperative check.
pub trait AsyncProcessBody: Send + Sync {
    fn run<'a>(
        &'a self,
        inputs: &'a [(String, serde_json::Value)],
        emitter: Emitter,
    ) -> Pin<Box<dyn Future<Output = WpysResult<()>> + Send + 'a>>;
}

/// The opaque executable handle behind a process descriptor's execution
/// shape tag.
#[derive(Clone)]
pub enum ProcessBody {
    Sync(Arc<dyn BlockingProcessBody>),
    Stream(Arc<dyn BlockingProcessBody>),
    Async(Arc<dyn AsyncProcessBody>),
    AsyncStream(Arc<dyn AsyncProcessBody>),
}

impl ProcessBody {
    pub fn is_blocking(&self) -> bool {
        matches!(self, ProcessBody::Sync(_) | ProcessBody::Stream(_))
    }
}

impl std::fmt::Debug for ProcessBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let variant = match self {
            ProcessBody::Sync(_) => "Sync",
            ProcessBody::Stream(_) => "Stream",
            ProcessBody::Async(_) => "Async",
            ProcessBody::AsyncStream(_) => "AsyncStream",
        };
        f.debug_tuple(variant).field(&"..").finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emitter::ResultEmission;
    use std::sync::atomic::AtomicBool;
    use tokio::sync::mpsc;

    struct Echo;

    impl BlockingProcessBody for Echo {
        fn run(&self, inputs: &[(String, serde_json::Value)], emitter: Emitter) -> WpysResult<()> {
            emitter.emit_result(ResultEmission {
                output_identifier: None,
                bytes: serde_json::to_vec(&inputs[0].1).unwrap(),
                mime_type: "application/json".to_string(),
            });
            Ok(())
        }
    }

    #[test]
    fn blocking_body_is_classified_correctly() {
        let sync = ProcessBody::Sync(Arc::new(Echo));
        let stream = ProcessBody::Stream(Arc::new(Echo));
        assert!(sync.is_blocking());
        assert!(stream.is_blocking());
    }

    #[test]
    fn blocking_body_emits_through_the_channel() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let emitter = Emitter::new(tx, Arc::new(AtomicBool::new(false)));
        let body = Echo;
        body.run(&[("a".to_string(), serde_json::json!(1))], emitter).unwrap();
        assert!(matches!(rx.try_recv().unwrap(), crate::emitter::Emission::Result(_)));
    }
}
