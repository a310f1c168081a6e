//! # Client Facade
//!
//! A thin, HTTP-free wrapper over [`Dispatcher`] that turns its always-Ok
//! [`WpsResponse`] into typed, fallible results — the shape a CLI or an
//! embedding program wants, as opposed to the wire-shaped response a
//! transport layer would encode.

use std::sync::Arc;

use wpys_orchestration::{Dispatcher, ExecuteRequest, ExecutionMode, JobResultBundle, JobStatusInfo, ServiceCapabilities, WpsRequest, WpsResponse};
use wpys_shared::parsing::WireInput;

use crate::error::{ClientError, ClientResult};

#[derive(Clone)]
pub struct WpysClient {
    dispatcher: Arc<Dispatcher>,
}

impl WpysClient {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self { dispatcher }
    }

    pub async fn get_capabilities(&self) -> ClientResult<ServiceCapabilities> {
        match self.dispatcher.dispatch(WpsRequest::GetCapabilities).await {
            WpsResponse::Capabilities(caps) => Ok(caps),
            other => Err(unexpected(other)),
        }
    }

    pub async fn describe_process(&self, identifiers: Vec<String>) -> ClientResult<Vec<Arc<wpys_shared::model::ProcessDescriptor>>> {
        match self
            .dispatcher
            .dispatch(WpsRequest::DescribeProcess { identifiers })
            .await
        {
            WpsResponse::ProcessDescriptions(descriptors) => Ok(descriptors),
            WpsResponse::ExceptionReport { http_status: status, message } => Err(ClientError::api_error(status, message)),
            other => Err(unexpected(other)),
        }
    }

    pub async fn execute(
        &self,
        process_id: impl Into<String>,
        inputs: Vec<WireInput>,
        outputs: Vec<String>,
        mode: ExecutionMode,
    ) -> ClientResult<ExecuteOutcome> {
        let response = self
            .dispatcher
            .dispatch(WpsRequest::Execute(ExecuteRequest {
                process_id: process_id.into(),
                inputs,
                outputs,
                mode,
            }))
            .await;
        match response {
            WpsResponse::Status(status) => Ok(ExecuteOutcome::Pending(status)),
            WpsResponse::Result(bundle) => Ok(ExecuteOutcome::Complete(bundle)),
            WpsResponse::ExceptionReport { http_status: status, message } => Err(ClientError::api_error(status, message)),
            other => Err(unexpected(other)),
        }
    }

    pub async fn get_status(&self, job_id: impl Into<String>) -> ClientResult<JobStatusInfo> {
        let job_id = job_id.into();
        match self.dispatcher.dispatch(WpsRequest::GetStatus { job_id: job_id.clone() }).await {
            WpsResponse::Status(status) => Ok(status),
            WpsResponse::ExceptionReport { .. } => Err(ClientError::job_not_found(job_id)),
            other => Err(unexpected(other)),
        }
    }

    pub async fn dismiss(&self, job_id: impl Into<String>) -> ClientResult<JobStatusInfo> {
        let job_id = job_id.into();
        match self.dispatcher.dispatch(WpsRequest::Dismiss { job_id: job_id.clone() }).await {
            WpsResponse::Status(status) => Ok(status),
            WpsResponse::ExceptionReport { .. } => Err(ClientError::job_not_found(job_id)),
            other => Err(unexpected(other)),
        }
    }

    pub async fn get_result(&self, job_id: impl Into<String>, output_identifier: impl Into<String>) -> ClientResult<JobResultBundle> {
        match self
            .dispatcher
            .dispatch(WpsRequest::GetResult {
                job_id: job_id.into(),
                output_identifier: output_identifier.into(),
            })
            .await
        {
            WpsResponse::Result(bundle) => Ok(bundle),
            WpsResponse::ExceptionReport { http_status: status, message } => Err(ClientError::api_error(status, message)),
            other => Err(unexpected(other)),
        }
    }
}

/// What `execute` hands back: a terminal Result for a synchronous call that
/// finished, or a Status for an asynchronous call (or a sync call that ended
/// in a non-Succeeded terminal status).
#[derive(Debug, Clone)]
pub enum ExecuteOutcome {
    Pending(JobStatusInfo),
    Complete(JobResultBundle),
}

fn unexpected(response: WpsResponse) -> ClientError {
    ClientError::invalid_input(format!("dispatcher returned an unexpected response: {response:?}"))
}
