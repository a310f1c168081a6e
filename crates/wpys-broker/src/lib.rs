//! Durable job store, execution queue, and per-job control channel.

pub mod backend;
pub mod broker;
pub mod queue;
pub mod types;

pub use backend::{BrokerBackend, InMemoryBrokerBackend};
pub use broker::{Broker, BrokerBackendKind};
pub use types::ControlKind;
