//! A thin, HTTP-free client facade over the Dispatcher, with its own
//! client-facing error type — the shape a CLI or embedding program wants.

pub mod client;
pub mod error;

pub use client::{ExecuteOutcome, WpysClient};
pub use error::{ClientError, ClientResult};
