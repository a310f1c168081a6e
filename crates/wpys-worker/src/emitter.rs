//! # Emitter
//!
//! The channel between a process body and the worker engine: a coroutine-
//! style `yield Status` / `yield Result` protocol re-expressed as a handle a
//! body calls into, rather than a generator the engine pulls from. Sync,
//! generator-stream, async-coroutine and async-stream bodies all converge on
//! the same emission shape the engine drives identically.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

/// Progress info produced by a running process body. `next_poll_in` and
/// `estimated_completion_in` arrive as deltas from "now"; the worker converts
/// them to absolute timestamps before persisting.
#[derive(Debug, Clone, Default)]
pub struct StatusDelta {
    pub percent_completed: Option<u8>,
    pub next_poll_in: Option<Duration>,
    pub estimated_completion_in: Option<Duration>,
}

/// One produced output. `output_identifier` pins it to a declared output;
/// when absent the engine assigns the next undeclared output in order.
#[derive(Debug, Clone)]
pub struct ResultEmission {
    pub output_identifier: Option<String>,
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

#[derive(Debug, Clone)]
pub enum Emission {
    Status(StatusDelta),
    Result(ResultEmission),
}

/// Handle a process body uses to report progress and produced outputs, and
/// to probe whether the job has been cancelled.
#[derive(Clone)]
pub struct Emitter {
    sender: mpsc::UnboundedSender<Emission>,
    cancelled: Arc<AtomicBool>,
}

impl Emitter {
    pub fn new(sender: mpsc::UnboundedSender<Emission>, cancelled: Arc<AtomicBool>) -> Self {
        Self { sender, cancelled }
    }

    pub fn emit_status(&self, delta: StatusDelta) {
        let _ = self.sender.send(Emission::Status(delta));
    }

    pub fn emit_result(&self, result: ResultEmission) {
        let _ = self.sender.send(Emission::Result(result));
    }

    /// Best-effort cancellation probe. Generator-stream bodies check this
    /// between pulls to stop early; sync-function bodies are free to ignore
    /// it, since their cancellation is mark-only.
    pub fn cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}
