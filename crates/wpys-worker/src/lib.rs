//! Adaptive execution engine: picks jobs from a broker, drives whichever of
//! the four process shapes backs them, and persists status and results back
//! through the broker and result backend.

pub mod bodies;
pub mod emitter;
pub mod engine;
pub mod process_body;

pub use bodies::ProcessBodyRegistry;
pub use emitter::{Emission, Emitter, ResultEmission, StatusDelta};
pub use engine::WorkerEngine;
pub use process_body::{AsyncProcessBody, BlockingProcessBody, ProcessBody};
