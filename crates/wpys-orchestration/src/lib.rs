//! Turns a parsed WPS request into a job and a response, driving the
//! ProcessRegistry and Broker on the caller's behalf.

pub mod dispatcher;
pub mod request;
pub mod response;

pub use dispatcher::Dispatcher;
pub use request::{ExecuteRequest, ExecutionMode, WpsRequest};
pub use response::{JobResultBundle, JobStatusInfo, ResultPayload, ServiceCapabilities, WpsResponse};
