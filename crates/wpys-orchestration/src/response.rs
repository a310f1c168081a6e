//! # Response Types
//!
//! What a Dispatcher operation hands back. Encoding one of these into an XML
//! or JSON wire envelope is the transport layer's job, not this crate's.

use std::collections::BTreeMap;
use std::sync::Arc;

use wpys_shared::errors::WpysError;
use wpys_shared::model::{JobError, JobStatus, ProcessDescriptor, StatusInfo};

#[derive(Debug, Clone)]
pub struct ServiceCapabilities {
    pub service_title: Option<String>,
    pub processes: Vec<Arc<ProcessDescriptor>>,
}

#[derive(Debug, Clone)]
pub struct JobStatusInfo {
    pub job_id: String,
    pub status: JobStatus,
    pub status_info: StatusInfo,
    pub error: Option<JobError>,
}

#[derive(Debug, Clone)]
pub struct ResultPayload {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct JobResultBundle {
    pub job_id: String,
    pub outputs: BTreeMap<String, ResultPayload>,
}

#[derive(Debug, Clone)]
pub enum WpsResponse {
    Capabilities(ServiceCapabilities),
    ProcessDescriptions(Vec<Arc<ProcessDescriptor>>),
    Status(JobStatusInfo),
    Result(JobResultBundle),
    ExceptionReport { message: String, http_status: u16 },
}

impl WpsResponse {
    /// Every internal failure surfaces to a caller as an ExceptionReport
    /// rather than a transport-level error; per the wire contract this
    /// crate's Dispatcher never fails outright, it only ever answers.
    pub(crate) fn exception(err: WpysError) -> Self {
        WpsResponse::ExceptionReport {
            message: err.to_string(),
            http_status: 400,
        }
    }
}
