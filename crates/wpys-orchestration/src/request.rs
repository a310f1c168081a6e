//! # Request Types
//!
//! The Rust analogue of the original's `wps/parsing.py::Request` subclasses:
//! a parsed, validated request ready for the Dispatcher. Decoding an XML or
//! KVP wire envelope into one of these is a transport-layer concern this
//! crate does not implement.

use wpys_shared::parsing::WireInput;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    Sync,
    Async,
}

#[derive(Debug, Clone)]
pub struct ExecuteRequest {
    pub process_id: String,
    pub inputs: Vec<WireInput>,
    /// Requested output identifiers; empty means "all declared outputs".
    pub outputs: Vec<String>,
    pub mode: ExecutionMode,
}

#[derive(Debug, Clone)]
pub enum WpsRequest {
    GetCapabilities,
    DescribeProcess { identifiers: Vec<String> },
    Execute(ExecuteRequest),
    GetStatus { job_id: String },
    Dismiss { job_id: String },
    GetResult { job_id: String, output_identifier: String },
}
