//! # Worker Engine
//!
//! Drives the per-job main loop: pick a job, mark it running, race its body
//! against a cancel watch appropriate to its shape, and persist the outcome.
//! One `WorkerEngine` instance can be cloned across many `run_forever` tasks
//! to scale out concurrency — every picked job is delivered to exactly one
//! of them by the broker's work-stealing queue.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::mpsc;
use wpys_broker::{Broker, ControlKind};
use wpys_shared::errors::{WpysError, WpysResult};
use wpys_shared::model::{Job, JobError, JobStatus, OutputDescriptor, ResultHandle, StatusInfo};
use wpys_shared::registry::ProcessRegistry;
use wpys_shared::result_backend::ResultBackend;

use crate::bodies::ProcessBodyRegistry;
use crate::emitter::{Emission, Emitter};
use crate::process_body::ProcessBody;

#[derive(Clone)]
pub struct WorkerEngine {
    registry: Arc<ProcessRegistry>,
    bodies: Arc<ProcessBodyRegistry>,
    broker: Broker,
    result_backend: Arc<dyn ResultBackend>,
}

impl WorkerEngine {
    pub fn new(
        registry: Arc<ProcessRegistry>,
        bodies: Arc<ProcessBodyRegistry>,
        broker: Broker,
        result_backend: Arc<dyn ResultBackend>,
    ) -> Self {
        Self {
            registry,
            bodies,
            broker,
            result_backend,
        }
    }

    /// Picks and drives jobs forever. Intended to be spawned as a task; a
    /// single unrecoverable broker error ends the loop and is returned to
    /// the caller to decide whether to restart.
    pub async fn run_forever(&self) -> WpysResult<()> {
        loop {
            self.run_once().await?;
        }
    }

    /// Picks exactly one job and drives it to a terminal outcome.
    #[tracing::instrument(skip(self))]
    pub async fn run_once(&self) -> WpysResult<()> {
        let mut job = self.broker.pick_job().await?;
        // Picking an already-visible process is a programming error in the
        // caller, not something the queue itself can detect.
        self.registry.get(&job.process_id)?;
        let body = self.bodies.get(&job.process_id)?.clone();

        job.status = JobStatus::Running;
        self.broker.update_job(job.clone()).await?;

        let cancelled = Arc::new(AtomicBool::new(false));
        let (tx, rx) = mpsc::unbounded_channel();
        let emitter = Emitter::new(tx, Arc::clone(&cancelled));

        let cancel_watch = {
            let broker = self.broker.clone();
            let job_id = job.id.clone();
            let cancelled = Arc::clone(&cancelled);
            tokio::spawn(async move {
                if broker
                    .get_job_notification(&job_id, Some(&[ControlKind::Dismiss]))
                    .await
                    .is_ok()
                {
                    cancelled.store(true, Ordering::SeqCst);
                }
            })
        };

        let drain = tokio::spawn(Self::drain_emissions(
            self.broker.clone(),
            Arc::clone(&self.result_backend),
            job.id.clone(),
            job.outputs.clone(),
            rx,
        ));

        let outcome = self.run_body(&body, &job, emitter, &cancelled).await;

        cancel_watch.abort();
        let _ = drain.await;

        let mut job = self.broker.get_job(&job.id).await?;
        if cancelled.load(Ordering::SeqCst) {
            job.status = JobStatus::Dismissed;
            job.results.clear();
            self.broker.update_job(job).await?;
            return Ok(());
        }

        match outcome {
            Ok(()) => {
                job.status = JobStatus::Succeeded;
                self.broker.update_job(job).await
            }
            Err(err) => {
                job.status = JobStatus::Failed;
                job.error = Some(JobError {
                    message: err.to_string(),
                    stack_trace: None,
                });
                self.broker.update_job(job).await
            }
        }
    }

    async fn run_body(
        &self,
        body: &ProcessBody,
        job: &Job,
        emitter: Emitter,
        cancelled: &Arc<AtomicBool>,
    ) -> WpysResult<()> {
        match body {
            ProcessBody::Sync(b) | ProcessBody::Stream(b) => {
                // Cannot interrupt a blocking thread: it runs to completion
                // and the result is discarded afterward if dismissed meanwhile.
                let b = Arc::clone(b);
                let inputs = job.inputs.clone();
                tokio::task::spawn_blocking(move || b.run(&inputs, emitter))
                    .await
                    .map_err(|e| WpysError::backend_error(format!("process body thread panicked: {e}")))
                    .and_then(|r| r)
            }
            ProcessBody::Async(b) | ProcessBody::AsyncStream(b) => {
                let fut = b.run(&job.inputs, emitter);
                tokio::select! {
                    biased;
                    _ = Self::wait_cancelled(cancelled) => Err(WpysError::cancelled(job.id.clone())),
                    result = fut => result,
                }
            }
        }
    }

    async fn wait_cancelled(flag: &AtomicBool) {
        while !flag.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    async fn drain_emissions(
        broker: Broker,
        result_backend: Arc<dyn ResultBackend>,
        job_id: String,
        outputs: Vec<OutputDescriptor>,
        mut rx: mpsc::UnboundedReceiver<Emission>,
    ) {
        let mut produced = 0usize;
        while let Some(emission) = rx.recv().await {
            match emission {
                Emission::Status(delta) => {
                    let info = StatusInfo {
                        percent_completed: delta.percent_completed,
                        estimated_completion: delta
                            .estimated_completion_in
                            .and_then(|d| chrono::Duration::from_std(d).ok())
                            .map(|d| Utc::now() + d),
                        next_poll: delta
                            .next_poll_in
                            .and_then(|d| chrono::Duration::from_std(d).ok())
                            .map(|d| Utc::now() + d),
                    };
                    if let Err(err) = broker.update_job_status_info(&job_id, info).await {
                        tracing::warn!(job_id = %job_id, error = %err, "dropping out-of-order status update");
                    }
                }
                Emission::Result(result) => {
                    let output_identifier = result
                        .output_identifier
                        .clone()
                        .or_else(|| outputs.get(produced).map(|o| o.identifier.clone()));
                    let Some(output_identifier) = output_identifier else {
                        tracing::warn!(job_id = %job_id, "discarding result with no matching declared output");
                        continue;
                    };
                    produced += 1;
                    Self::persist_result(&broker, &result_backend, &job_id, output_identifier, result.bytes, result.mime_type)
                        .await;
                }
            }
        }
    }

    async fn persist_result(
        broker: &Broker,
        result_backend: &Arc<dyn ResultBackend>,
        job_id: &str,
        output_identifier: String,
        bytes: Vec<u8>,
        mime_type: String,
    ) {
        let size_bytes = bytes.len() as u64;
        let content_id = match result_backend.put_job_result(job_id, &output_identifier, bytes).await {
            Ok(content_id) => content_id,
            Err(err) => {
                tracing::warn!(job_id = %job_id, error = %err, "result backend rejected output");
                return;
            }
        };
        let mut job = match broker.get_job(job_id).await {
            Ok(job) => job,
            Err(err) => {
                tracing::warn!(job_id = %job_id, error = %err, "job vanished while persisting result");
                return;
            }
        };
        job.results.insert(
            output_identifier,
            ResultHandle {
                content_id,
                mime_type,
                size_bytes,
            },
        );
        if let Err(err) = broker.update_job(job).await {
            tracing::warn!(job_id = %job_id, error = %err, "failed to persist result");
        }
    }
}
