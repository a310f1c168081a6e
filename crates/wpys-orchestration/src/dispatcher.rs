//! # Dispatcher
//!
//! Turns a parsed [`WpsRequest`] into a [`WpsResponse`] by driving the
//! Broker and ProcessRegistry, mirroring the way `TaskRequestProcessor`
//! pairs a registry lookup with queue operations behind a single entry
//! point.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::json;
use uuid::Uuid;

use wpys_broker::{Broker, ControlKind};
use wpys_shared::config::ServiceInfo;
use wpys_shared::errors::{WpysError, WpysResult};
use wpys_shared::model::{DataKind, Job, JobStatus, OutputDescriptor};
use wpys_shared::parsing::{parse_literal_input, parse_opaque_input, ParsedValue, ParserTable, WireInput};
use wpys_shared::registry::ProcessRegistry;
use wpys_shared::result_backend::ResultBackend;

use crate::request::{ExecuteRequest, ExecutionMode, WpsRequest};
use crate::response::{JobResultBundle, JobStatusInfo, ResultPayload, ServiceCapabilities, WpsResponse};

pub struct Dispatcher {
    registry: Arc<ProcessRegistry>,
    broker: Broker,
    result_backend: Arc<dyn ResultBackend>,
    parsers: ParserTable,
    service_info: ServiceInfo,
}

impl Dispatcher {
    pub fn new(
        registry: Arc<ProcessRegistry>,
        broker: Broker,
        result_backend: Arc<dyn ResultBackend>,
        service_info: ServiceInfo,
    ) -> Self {
        Self {
            registry,
            broker,
            result_backend,
            parsers: ParserTable::new(),
            service_info,
        }
    }

    pub fn with_parsers(mut self, parsers: ParserTable) -> Self {
        self.parsers = parsers;
        self
    }

    /// Never returns an `Err` to the caller: every internal failure is
    /// rendered as a [`WpsResponse::ExceptionReport`] instead, matching the
    /// wire contract's "HTTP 400 when the Dispatcher returns an
    /// ExceptionReport" rule.
    #[tracing::instrument(skip(self, request))]
    pub async fn dispatch(&self, request: WpsRequest) -> WpsResponse {
        match self.try_dispatch(request).await {
            Ok(response) => response,
            Err(err) => WpsResponse::exception(err),
        }
    }

    async fn try_dispatch(&self, request: WpsRequest) -> WpysResult<WpsResponse> {
        match request {
            WpsRequest::GetCapabilities => self.get_capabilities(),
            WpsRequest::DescribeProcess { identifiers } => self.describe_process(&identifiers),
            WpsRequest::Execute(execute) => self.execute(execute).await,
            WpsRequest::GetStatus { job_id } => self.get_status(&job_id).await,
            WpsRequest::Dismiss { job_id } => self.dismiss(&job_id).await,
            WpsRequest::GetResult { job_id, output_identifier } => {
                self.get_result(&job_id, &output_identifier).await
            }
        }
    }

    fn get_capabilities(&self) -> WpysResult<WpsResponse> {
        Ok(WpsResponse::Capabilities(ServiceCapabilities {
            service_title: self.service_info.title.clone(),
            processes: self.registry.list().to_vec(),
        }))
    }

    fn describe_process(&self, identifiers: &[String]) -> WpysResult<WpsResponse> {
        let descriptors = identifiers
            .iter()
            .map(|id| self.registry.get(id))
            .collect::<WpysResult<Vec<_>>>()?;
        Ok(WpsResponse::ProcessDescriptions(descriptors))
    }

    async fn execute(&self, request: ExecuteRequest) -> WpysResult<WpsResponse> {
        let descriptor = self.registry.get(&request.process_id)?;

        let mut inputs = Vec::with_capacity(request.inputs.len());
        for wire in &request.inputs {
            inputs.push((wire.identifier.clone(), self.canonicalize_input(&descriptor.inputs, wire)?));
        }

        let outputs: Vec<OutputDescriptor> = if request.outputs.is_empty() {
            descriptor.outputs.clone()
        } else {
            descriptor
                .outputs
                .iter()
                .filter(|o| request.outputs.contains(&o.identifier))
                .cloned()
                .collect()
        };

        let job_id = Uuid::new_v4().to_string();
        let job = self
            .broker
            .create_job(job_id.clone(), request.process_id.clone(), inputs, outputs)
            .await?;
        self.broker.enqueue_job(&job_id).await?;

        match request.mode {
            ExecutionMode::Async => Ok(WpsResponse::Status(job_status_info(&job))),
            ExecutionMode::Sync => self.await_terminal_response(&job_id).await,
        }
    }

    fn canonicalize_input(
        &self,
        declared: &[wpys_shared::model::InputDescriptor],
        wire: &WireInput,
    ) -> WpysResult<serde_json::Value> {
        let input_descriptor = declared
            .iter()
            .find(|d| d.identifier == wire.identifier)
            .ok_or_else(|| WpysError::validation_error("identifier", format!("no such input: {}", wire.identifier)))?;

        match &input_descriptor.data_kind {
            DataKind::Literal { .. } => {
                let value = parse_literal_input(input_descriptor, wire, &self.parsers)?;
                Ok(json!(value))
            }
            DataKind::BoundingBox { .. } | DataKind::Complex => match parse_opaque_input(input_descriptor, wire)? {
                ParsedValue::Opaque { bytes, mime_type } => Ok(json!({ "bytes": bytes, "mime_type": mime_type })),
                ParsedValue::Literal(_) => unreachable!("parse_opaque_input never returns Literal"),
            },
        }
    }

    async fn await_terminal_response(&self, job_id: &str) -> WpysResult<WpsResponse> {
        self.broker
            .get_job_notification(
                job_id,
                Some(&[ControlKind::Succeeded, ControlKind::Failed, ControlKind::Dismiss]),
            )
            .await?;
        let job = self.broker.get_job(job_id).await?;
        match job.status {
            JobStatus::Succeeded => Ok(WpsResponse::Result(self.fetch_results(&job, None).await?)),
            JobStatus::Failed => {
                let error = job.error.as_ref();
                Ok(WpsResponse::ExceptionReport {
                    message: error.map(|e| e.message.clone()).unwrap_or_default(),
                    http_status: 400,
                })
            }
            _ => Ok(WpsResponse::Status(job_status_info(&job))),
        }
    }

    async fn get_status(&self, job_id: &str) -> WpysResult<WpsResponse> {
        let job = self.broker.get_job(job_id).await?;
        Ok(WpsResponse::Status(job_status_info(&job)))
    }

    async fn dismiss(&self, job_id: &str) -> WpysResult<WpsResponse> {
        self.broker.dismiss_job(job_id).await?;
        let job = self.broker.get_job(job_id).await?;
        Ok(WpsResponse::Status(job_status_info(&job)))
    }

    async fn get_result(&self, job_id: &str, output_identifier: &str) -> WpysResult<WpsResponse> {
        let job = self.broker.get_job(job_id).await?;
        Ok(WpsResponse::Result(
            self.fetch_results(&job, Some(&[output_identifier.to_string()])).await?,
        ))
    }

    async fn fetch_results(&self, job: &Job, only: Option<&[String]>) -> WpysResult<JobResultBundle> {
        let mut outputs = BTreeMap::new();
        let wanted: Vec<&String> = match only {
            Some(ids) => ids.iter().collect(),
            None => job.results.keys().collect(),
        };
        for identifier in wanted {
            let handle = job
                .results
                .get(identifier)
                .ok_or_else(|| WpysError::not_found(format!("no such result: {identifier}")))?;
            let bytes = self.result_backend.get_job_result(&handle.content_id).await?;
            outputs.insert(
                identifier.clone(),
                ResultPayload {
                    mime_type: handle.mime_type.clone(),
                    bytes,
                },
            );
        }
        Ok(JobResultBundle {
            job_id: job.id.clone(),
            outputs,
        })
    }
}

fn job_status_info(job: &Job) -> JobStatusInfo {
    JobStatusInfo {
        job_id: job.id.clone(),
        status: job.status,
        status_info: job.status_info.clone(),
        error: job.error.clone(),
    }
}
